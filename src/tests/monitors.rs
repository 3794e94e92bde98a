use super::*;
use crate::bindings::Command;

const LEFT: Rectangle = SCREEN;
const RIGHT: Rectangle = Rectangle {
    x: 1920,
    y: 0,
    w: 1280,
    h: 1024,
};
const PORTRAIT: Rectangle = Rectangle {
    x: 1920,
    y: 0,
    w: 1080,
    h: 1920,
};

fn root_changed(wm: &mut WindowManager<'_, MockConn>) {
    wm.handle_event(XEvent::ConfigureNotify {
        id: ROOT,
        r: Rectangle::new(0, 0, 3200, 1080),
        is_root: true,
    });
}

#[test]
fn every_output_gets_a_monitor_and_a_bar() {
    let conn = MockConn::new(&[LEFT, RIGHT, LEFT]);
    let wm = new_wm(&conn, test_config());

    assert_eq!(wm.reg.monitors.len(), 2);
    assert_eq!(wm.reg.monitors[1].screen, RIGHT);
    assert_eq!(wm.reg.monitors[1].area, Rectangle::new(1920, 18, 1280, 1006));
    assert_eq!(wm.reg.selmon, 0);
    for m in wm.reg.monitors.iter() {
        assert!(conn.is_mapped(m.barwin));
    }
}

#[test]
fn portrait_outputs_start_in_monocle() {
    let conn = MockConn::new(&[LEFT, PORTRAIT]);
    let wm = new_wm(&conn, test_config());

    assert_eq!(wm.reg.monitors[0].layout(), 0);
    assert_eq!(wm.reg.monitors[1].layout(), 2);
}

#[test]
fn tag_mon_sends_the_selection_to_the_next_monitor() {
    let conn = MockConn::new(&[LEFT, RIGHT]);
    let mut wm = new_wm(&conn, test_config());
    wm.reg.monitors[1].tagset[0] = 0b100;
    let a = open(&conn, &mut wm, 10, "Firefox");

    wm.execute(&Command::TagMon(1));
    let c = wm.reg.get(a).unwrap();
    assert_eq!(c.mon, 1);
    assert_eq!(c.tags, 0b100);
    assert!(c.x >= RIGHT.x);
    assert_eq!(wm.reg.monitors[1].clients, vec![a]);
    assert!(wm.reg.monitors[0].clients.is_empty());
    assert_eq!(wm.reg.sel(), None);
    assert_eq!(conn.focused.get(), ROOT);
}

#[test]
fn focus_mon_moves_focus_across() {
    let conn = MockConn::new(&[LEFT, RIGHT]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    wm.execute(&Command::TagMon(1));

    wm.execute(&Command::FocusMon(1));
    assert_eq!(wm.reg.selmon, 1);
    assert_eq!(wm.reg.sel(), Some(a));
    assert_eq!(conn.focused.get(), 10);

    // wraps around
    wm.execute(&Command::FocusMon(1));
    assert_eq!(wm.reg.selmon, 0);
    assert_eq!(wm.reg.sel(), None);
}

#[test]
fn pointer_motion_selects_the_monitor_under_it() {
    let conn = MockConn::new(&[LEFT, RIGHT]);
    let mut wm = new_wm(&conn, test_config());
    let motion = |x, y| XEvent::MotionNotify {
        id: ROOT,
        rpt: Point::new(x, y),
        time: 0,
    };

    wm.handle_event(motion(10, 10));
    assert_eq!(wm.reg.selmon, 0);
    wm.handle_event(motion(2000, 500));
    assert_eq!(wm.reg.selmon, 1);
    wm.handle_event(motion(2100, 500));
    assert_eq!(wm.reg.selmon, 1);
}

#[test]
fn entering_a_client_on_another_monitor_focuses_it() {
    let conn = MockConn::new(&[LEFT, RIGHT]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    wm.execute(&Command::TagMon(1));
    let b = open(&conn, &mut wm, 11, "Gimp");
    assert_eq!(wm.reg.sel(), Some(b));

    wm.handle_event(XEvent::EnterNotify {
        id: 10,
        normal: true,
        inferior: false,
    });
    assert_eq!(wm.reg.selmon, 1);
    assert_eq!(wm.reg.sel(), Some(a));

    // crossings into a child window are ignored
    wm.handle_event(XEvent::EnterNotify {
        id: 11,
        normal: true,
        inferior: true,
    });
    assert_eq!(wm.reg.selmon, 1);
}

#[test]
fn removed_outputs_hand_their_clients_to_the_first_monitor() {
    let conn = MockConn::new(&[LEFT, RIGHT]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    wm.execute(&Command::TagMon(1));
    wm.execute(&Command::FocusMon(1));
    let (barwin, tabwin) = (wm.reg.monitors[1].barwin, wm.reg.monitors[1].tabwin);

    *conn.outputs.borrow_mut() = vec![LEFT];
    root_changed(&mut wm);

    assert_eq!(wm.reg.monitors.len(), 1);
    assert_eq!(wm.reg.selmon, 0);
    assert_eq!(wm.reg.get(a).unwrap().mon, 0);
    assert_eq!(wm.reg.monitors[0].clients, vec![a]);
    assert_eq!(wm.reg.sel(), Some(a));
    assert!(conn.destroyed.borrow().contains(&barwin));
    assert!(conn.destroyed.borrow().contains(&tabwin));
}

#[test]
fn added_outputs_get_bars() {
    let conn = MockConn::new(&[LEFT]);
    let mut wm = new_wm(&conn, test_config());
    assert_eq!(wm.reg.monitors.len(), 1);

    conn.outputs.borrow_mut().push(RIGHT);
    root_changed(&mut wm);

    assert_eq!(wm.reg.monitors.len(), 2);
    let barwin = wm.reg.monitors[1].barwin;
    assert_ne!(barwin, 0);
    assert_eq!(conn.window(barwin).attrs.geometry.x, RIGHT.x);
}

#[test]
fn no_outputs_falls_back_to_the_whole_screen() {
    let conn = MockConn::new(&[]);
    let wm = new_wm(&conn, test_config());

    assert_eq!(wm.reg.monitors.len(), 1);
    assert_eq!(wm.reg.monitors[0].screen, SCREEN);
}

#[test]
fn fullscreen_clients_follow_their_monitor() {
    let conn = MockConn::new(&[LEFT]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Mpv");
    let (state, fullscreen) = {
        let atoms = conn.atoms();
        (atoms._NET_WM_STATE, atoms._NET_WM_STATE_FULLSCREEN)
    };
    wm.handle_event(XEvent::ClientMessage {
        id: 10,
        dtype: state,
        data: [1, fullscreen, 0, 0, 0],
    });

    let smaller = Rectangle::new(0, 0, 1280, 1024);
    *conn.outputs.borrow_mut() = vec![smaller];
    wm.handle_event(XEvent::ConfigureNotify {
        id: ROOT,
        r: smaller,
        is_root: true,
    });
    assert_eq!(wm.reg.get(a).unwrap().geometry(), smaller);
}
