use super::*;
use crate::bindings::{ButtonBinding, Click, Command};

#[test]
fn first_window_is_mapped_and_focused() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");

    assert!(conn.is_mapped(10));
    assert_eq!(conn.focused.get(), 10);
    assert_eq!(wm.reg.sel(), Some(a));
    assert_eq!(*conn.client_list.borrow(), vec![10]);
    assert_eq!(conn.window(10).wm_state, Some(WmState::Normal));
    assert_eq!(wm.reg.get(a).map(|c| c.tags), Some(1));
}

#[test]
fn new_windows_attach_after_the_selection() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    let b = open(&conn, &mut wm, 11, "Gimp");
    let c = open(&conn, &mut wm, 12, "Zathura");

    assert_eq!(wm.reg.selmon().clients, vec![a, b, c]);
    assert_eq!(wm.reg.selmon().stack, vec![c, b, a]);
    assert_eq!(conn.focused.get(), 12);
    assert_eq!(conn.window(11).border, wm.config.normal.border);
    assert_eq!(conn.window(12).border, wm.config.selected.border);
}

#[test]
fn focus_stack_wraps_in_both_directions() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    let b = open(&conn, &mut wm, 11, "Gimp");

    wm.execute(&Command::FocusStack(1));
    assert_eq!(wm.reg.sel(), Some(a));
    wm.execute(&Command::FocusStack(-1));
    assert_eq!(wm.reg.sel(), Some(b));
    wm.execute(&Command::FocusWin(0));
    assert_eq!(wm.reg.sel(), Some(a));
}

#[test]
fn zoom_swaps_with_the_master() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    let b = open(&conn, &mut wm, 11, "Gimp");

    wm.execute(&Command::Zoom);
    assert_eq!(wm.reg.selmon().clients, vec![b, a]);
    assert_eq!(wm.reg.sel(), Some(b));

    // zooming the master brings the next client up
    wm.execute(&Command::Zoom);
    assert_eq!(wm.reg.selmon().clients, vec![a, b]);
    assert_eq!(wm.reg.sel(), Some(a));
}

#[test]
fn push_moves_within_the_tiled_order() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    let b = open(&conn, &mut wm, 11, "Gimp");
    let c = open(&conn, &mut wm, 12, "Zathura");

    wm.execute(&Command::PushUp);
    assert_eq!(wm.reg.selmon().clients, vec![a, c, b]);
    wm.execute(&Command::PushUp);
    assert_eq!(wm.reg.selmon().clients, vec![c, a, b]);
    wm.execute(&Command::PushUp);
    assert_eq!(wm.reg.selmon().clients, vec![a, b, c]);
    wm.execute(&Command::PushDown);
    assert_eq!(wm.reg.selmon().clients, vec![c, a, b]);
    assert_eq!(wm.reg.sel(), Some(c));
}

#[test]
fn destroyed_windows_are_unmanaged_and_focus_moves_on() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    let b = open(&conn, &mut wm, 11, "Gimp");

    wm.handle_event(XEvent::DestroyNotify { id: 11 });
    assert!(!wm.reg.contains(b));
    assert_eq!(wm.reg.sel(), Some(a));
    assert_eq!(conn.focused.get(), 10);
    assert_eq!(*conn.client_list.borrow(), vec![10]);
}

#[test]
fn unmapped_windows_are_withdrawn() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");

    wm.handle_event(XEvent::UnmapNotify { id: 10, synthetic: false });
    assert!(!wm.reg.contains(a));
    assert_eq!(conn.window(10).wm_state, Some(WmState::Withdrawn));
    assert_eq!(wm.reg.sel(), None);
    assert_eq!(conn.focused.get(), ROOT);
}

#[test]
fn kill_client_asks_the_selection_to_close() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    open(&conn, &mut wm, 10, "Firefox");

    wm.execute(&Command::KillClient);
    assert_eq!(*conn.killed.borrow(), vec![10]);
}

#[test]
fn transients_float_on_their_parents_tags() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    wm.execute(&Command::Tag(0b100));
    wm.execute(&Command::View(0b100));
    assert_eq!(wm.reg.sel(), Some(a));

    conn.add_window(11, "Firefox", Rectangle::new(200, 200, 300, 200));
    conn.windows.borrow_mut().get_mut(&11).unwrap().transient_for = Some(10);
    let t = map(&mut wm, 11);

    let c = wm.reg.get(t).unwrap();
    assert!(c.is_floating);
    assert_eq!(c.tags, 0b100);
}

#[test]
fn dialogs_float() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    conn.add_window(10, "Gimp", Rectangle::new(100, 100, 300, 200));
    let dialog = conn.atoms()._NET_WM_WINDOW_TYPE_DIALOG;
    conn.windows.borrow_mut().get_mut(&10).unwrap().window_type = Some(dialog);

    let d = map(&mut wm, 10);
    assert!(wm.reg.get(d).unwrap().is_floating);
}

#[test]
fn rules_place_windows_on_their_tags() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let p = open(&conn, &mut wm, 10, "Pidgin");

    let c = wm.reg.get(p).unwrap();
    assert_eq!(c.tags, 1 << 5);
    assert!(c.is_left);
    assert_eq!(c.cfact, 0.5);
    assert!(!wm.reg.is_visible(p));
    assert_eq!(wm.reg.sel(), None);
}

#[test]
fn fullscreen_requests_cover_the_monitor() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Mpv");
    let atoms = conn.atoms().clone();

    wm.handle_event(XEvent::ClientMessage {
        id: 10,
        dtype: atoms._NET_WM_STATE,
        data: [1, atoms._NET_WM_STATE_FULLSCREEN, 0, 0, 0],
    });
    let c = wm.reg.get(a).unwrap();
    assert!(c.is_fullscreen);
    assert_eq!(c.geometry(), SCREEN);
    assert_eq!(c.bw, 0);
    assert_eq!(conn.window(10).net_wm_state, Some(atoms._NET_WM_STATE_FULLSCREEN));

    // toggle back out
    wm.handle_event(XEvent::ClientMessage {
        id: 10,
        dtype: atoms._NET_WM_STATE,
        data: [2, atoms._NET_WM_STATE_FULLSCREEN, 0, 0, 0],
    });
    assert!(!wm.reg.get(a).unwrap().is_fullscreen);
    assert_eq!(conn.window(10).net_wm_state, None);
}

#[test]
fn urgency_is_tracked_until_focused() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    open(&conn, &mut wm, 11, "Gimp");

    conn.set_urgency_hint(10, true);
    wm.handle_event(XEvent::PropertyNotify {
        id: 10,
        atom: xcb::ATOM_WM_HINTS,
        is_root: false,
        deleted: false,
    });
    assert!(wm.reg.get(a).unwrap().is_urgent);

    wm.execute(&Command::FocusStack(1));
    assert_eq!(wm.reg.sel(), Some(a));
    assert!(!wm.reg.get(a).unwrap().is_urgent);
    assert_eq!(conn.window(10).wm_hints.map(|h| h.urgent), Some(false));
}

#[test]
fn title_changes_are_picked_up() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");

    conn.windows.borrow_mut().get_mut(&10).unwrap().title = Some("new title".into());
    let atom = conn.atoms()._NET_WM_NAME;
    wm.handle_event(XEvent::PropertyNotify {
        id: 10,
        atom,
        is_root: false,
        deleted: false,
    });
    assert_eq!(wm.reg.get(a).unwrap().name, "new title");
}

#[test]
fn toggle_floating_keeps_the_geometry() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");

    wm.execute(&Command::ToggleFloating);
    assert!(wm.reg.get(a).unwrap().is_floating);
    wm.execute(&Command::ForceTile);
    assert!(!wm.reg.get(a).unwrap().is_floating);
}

#[test]
fn layout_commands_switch_slots() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    open(&conn, &mut wm, 10, "Firefox");
    assert_eq!(wm.reg.selmon().ltsymbol, "=O=");

    // monocle shows the number of visible clients instead of its symbol
    wm.execute(&Command::SetLayout(Some(2)));
    assert_eq!(wm.reg.selmon().ltsymbol, "[1]");
    assert_eq!(wm.reg.selmon().sellt, 1);
    wm.execute(&Command::SetLayout(None));
    assert_eq!(wm.reg.selmon().ltsymbol, "=O=");
    wm.execute(&Command::NextLayout);
    assert_eq!(wm.reg.selmon().ltsymbol, "[]=");
}

#[test]
fn master_and_cfact_adjustments_respect_their_bounds() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");

    wm.execute(&Command::IncNMaster(-5));
    assert_eq!(wm.reg.selmon().nmaster, 0);

    wm.execute(&Command::SetMFact(1.5));
    assert!((wm.reg.selmon().mfact - 0.5).abs() < f32::EPSILON);
    wm.execute(&Command::SetMFact(0.9));
    assert!((wm.reg.selmon().mfact - 0.5).abs() < f32::EPSILON);

    wm.execute(&Command::SetCFact(0.25));
    assert_eq!(wm.reg.get(a).unwrap().cfact, 1.25);
    wm.execute(&Command::SetCFact(5.0));
    assert_eq!(wm.reg.get(a).unwrap().cfact, 1.25);
    wm.execute(&Command::SetCFact(0.0));
    assert_eq!(wm.reg.get(a).unwrap().cfact, 1.0);
}

#[test]
fn quit_ends_the_event_loop() {
    let conn = MockConn::new(&[SCREEN]);
    let mut config = test_config();
    config
        .button_bindings
        .push(ButtonBinding::new(Click::RootWin, 0, 1, Command::Quit));
    let mut wm = new_wm(&conn, config);
    conn.add_window(10, "Firefox", Rectangle::new(100, 100, 400, 300));
    conn.events.borrow_mut().extend(vec![
        XEvent::MapRequest { id: 10, ignore: false },
        XEvent::ButtonPress {
            id: ROOT,
            button: 1,
            state: 0,
            rpt: Point::new(5, 500),
            wpt: Point::new(5, 500),
        },
    ]);

    assert!(wm.run().is_ok());
    assert!(!wm.running);
    // cleanup hands every window back
    assert_eq!(wm.reg.len(), 0);
    assert_eq!(conn.window(10).wm_state, Some(WmState::Withdrawn));
}

#[test]
fn lost_connection_is_an_error() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    open(&conn, &mut wm, 10, "Firefox");

    assert!(wm.run().is_err());
    assert_eq!(wm.reg.len(), 0);
    assert_eq!(conn.focused.get(), ROOT);
}

#[test]
fn dragging_moves_a_floating_window() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    conn.add_window(10, "Gimp", Rectangle::new(100, 100, 400, 300));
    let dialog = conn.atoms()._NET_WM_WINDOW_TYPE_DIALOG;
    conn.windows.borrow_mut().get_mut(&10).unwrap().window_type = Some(dialog);
    let d = map(&mut wm, 10);

    conn.pointer.set(Point::new(500, 500));
    conn.events.borrow_mut().extend(vec![
        XEvent::MotionNotify {
            id: ROOT,
            rpt: Point::new(600, 550),
            time: 100,
        },
        // too soon after the previous one
        XEvent::MotionNotify {
            id: ROOT,
            rpt: Point::new(650, 560),
            time: 105,
        },
        XEvent::ButtonRelease { id: ROOT },
    ]);
    wm.execute(&Command::MoveMouse);

    assert_eq!(wm.reg.get(d).unwrap().geometry(), Rectangle::new(200, 150, 400, 300));
    assert_eq!(conn.window(10).attrs.geometry.x, 200);
    assert!(conn.events.borrow().is_empty());
}

#[test]
fn drags_need_the_pointer() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    wm.execute(&Command::ToggleFloating);
    let before = wm.reg.get(a).unwrap().geometry();

    conn.grab_ok.set(false);
    conn.events.borrow_mut().push_back(XEvent::MotionNotify {
        id: ROOT,
        rpt: Point::new(900, 900),
        time: 100,
    });
    wm.execute(&Command::ResizeMouse);
    assert_eq!(wm.reg.get(a).unwrap().geometry(), before);
}

fn open_dialog(conn: &MockConn, wm: &mut WindowManager<'_, MockConn>, win: Window) -> ClientId {
    conn.add_window(win, "Gimp", Rectangle::new(100, 100, 400, 300));
    let dialog = conn.atoms()._NET_WM_WINDOW_TYPE_DIALOG;
    conn.windows.borrow_mut().get_mut(&win).unwrap().window_type = Some(dialog);
    map(wm, win)
}

#[test]
fn a_release_pulled_in_while_mapping_ends_the_drag() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let d = open_dialog(&conn, &mut wm, 10);
    conn.add_window(11, "Firefox", Rectangle::new(0, 0, 400, 300));
    let name = conn.atoms()._NET_WM_NAME;
    let later = XEvent::PropertyNotify {
        id: 11,
        atom: name,
        is_root: false,
        deleted: false,
    };

    conn.pointer.set(Point::new(500, 500));
    // managing the new window restacks, which drains the rest of the queue
    conn.after_grab.borrow_mut().extend(vec![
        XEvent::MapRequest { id: 11, ignore: false },
        XEvent::MotionNotify {
            id: ROOT,
            rpt: Point::new(600, 550),
            time: 100,
        },
        XEvent::ButtonRelease { id: ROOT },
        later.clone(),
    ]);
    wm.execute(&Command::MoveMouse);

    assert!(wm.reg.win_to_client(11).is_some());
    assert_eq!(wm.reg.get(d).unwrap().geometry(), Rectangle::new(200, 150, 400, 300));
    assert_eq!(wm.deferred, vec![later]);
}

#[test]
fn motion_is_throttled_and_other_events_wait_for_the_drag() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let d = open_dialog(&conn, &mut wm, 10);
    let name = conn.atoms()._NET_WM_NAME;
    let property = XEvent::PropertyNotify {
        id: 10,
        atom: name,
        is_root: false,
        deleted: false,
    };
    let motion = |x, y, time| XEvent::MotionNotify {
        id: ROOT,
        rpt: Point::new(x, y),
        time,
    };

    conn.pointer.set(Point::new(500, 500));
    conn.after_grab.borrow_mut().extend(vec![
        motion(600, 550, 100),
        property.clone(),
        motion(900, 900, 110),
        motion(650, 560, 120),
        XEvent::ButtonRelease { id: ROOT },
        motion(700, 700, 200),
    ]);
    wm.execute(&Command::MoveMouse);

    // the motion at 110 came too soon and was skipped
    assert_eq!(wm.reg.get(d).unwrap().geometry(), Rectangle::new(250, 160, 400, 300));
    assert_eq!(wm.deferred, vec![property, motion(700, 700, 200)]);
}

#[test]
fn dragging_a_tiled_window_past_the_snap_distance_floats_it() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    let (x, y) = {
        let c = wm.reg.get(a).unwrap();
        assert!(!c.is_floating);
        (c.x, c.y)
    };

    conn.pointer.set(Point::new(500, 500));
    conn.after_grab.borrow_mut().extend(vec![
        // within the snap distance nothing happens
        XEvent::MotionNotify {
            id: ROOT,
            rpt: Point::new(510, 510),
            time: 100,
        },
        XEvent::ButtonRelease { id: ROOT },
    ]);
    wm.execute(&Command::MoveMouse);
    assert!(!wm.reg.get(a).unwrap().is_floating);

    conn.after_grab.borrow_mut().extend(vec![
        XEvent::MotionNotify {
            id: ROOT,
            rpt: Point::new(600, 600),
            time: 100,
        },
        XEvent::ButtonRelease { id: ROOT },
    ]);
    wm.execute(&Command::MoveMouse);
    let c = wm.reg.get(a).unwrap();
    assert!(c.is_floating);
    assert_eq!((c.x, c.y), (x + 100, y + 100));
}
