use super::*;
use crate::{bindings::Command, client::Swallow};

const TERM_WIN: Window = 20;
const CHILD_WIN: Window = 21;

fn spawn(conn: &MockConn, wm: &mut WindowManager<'_, MockConn>, win: Window, class: &str, pid: u32) -> ClientId {
    conn.add_window(win, class, Rectangle::new(100, 100, 400, 300));
    conn.set_pid(win, pid);
    map(wm, win)
}

/// The client a swallowing terminal is hiding. Mapping the child hands its
/// window to the terminal, so the child's id has to come from the link.
fn swallowed(wm: &WindowManager<'_, MockConn>, t: ClientId) -> ClientId {
    match wm.reg.get(t).map(|term| term.swallow) {
        Some(Swallow::Active { child, .. }) => child,
        other => panic!("terminal is not swallowing: {:?}", other),
    }
}

/// A terminal (pid 100) that started a program (pid 200, via a shell with pid 150)
fn session(conn: &MockConn) -> WindowManager<'_, MockConn> {
    let mut wm = new_wm(conn, test_config());
    wm.set_process_table(Box::new(MockProcs(vec![(200, 150), (150, 100), (100, 1)])));
    wm
}

#[test]
fn terminal_swallows_its_child() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = session(&conn);
    let t = spawn(&conn, &mut wm, TERM_WIN, "st-256color", 100);
    // the child's window now belongs to the terminal's record
    assert_eq!(spawn(&conn, &mut wm, CHILD_WIN, "Zathura", 200), t);
    let c = swallowed(&wm, t);
    assert_ne!(c, t);

    let term = wm.reg.get(t).unwrap();
    assert_eq!(term.win, CHILD_WIN);
    assert_eq!(term.name, "Zathura window");
    assert_eq!(
        term.swallow,
        Swallow::Active {
            child: c,
            hidden: TERM_WIN
        }
    );
    assert_eq!(wm.reg.get(c).unwrap().win, TERM_WIN);

    assert!(!conn.is_mapped(TERM_WIN));
    assert_eq!(conn.window(TERM_WIN).wm_state, Some(WmState::Withdrawn));
    assert!(conn.is_mapped(CHILD_WIN));
    assert_eq!(wm.reg.selmon().clients, vec![t]);
    assert_eq!(*conn.client_list.borrow(), vec![CHILD_WIN]);
    assert_eq!(wm.reg.sel(), Some(t));
    assert_eq!(conn.focused.get(), CHILD_WIN);
}

#[test]
fn closing_the_child_gives_the_terminal_back() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = session(&conn);
    let t = spawn(&conn, &mut wm, TERM_WIN, "st-256color", 100);
    spawn(&conn, &mut wm, CHILD_WIN, "Zathura", 200);

    wm.handle_event(XEvent::DestroyNotify { id: CHILD_WIN });
    let term = wm.reg.get(t).unwrap();
    assert_eq!(term.win, TERM_WIN);
    assert_eq!(term.swallow, Swallow::None);
    assert_eq!(term.name, "st-256color window");
    assert_eq!(wm.reg.len(), 1);
    assert!(conn.is_mapped(TERM_WIN));
    assert_eq!(conn.window(TERM_WIN).wm_state, Some(WmState::Normal));
    assert_eq!(*conn.client_list.borrow(), vec![TERM_WIN]);
}

#[test]
fn the_terminal_comes_back_as_it_was() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = session(&conn);
    let t = spawn(&conn, &mut wm, TERM_WIN, "st-256color", 100);
    let geometry = wm.reg.get(t).unwrap().geometry();
    let on_screen = conn.window(TERM_WIN).attrs.geometry;
    assert_eq!(conn.window(TERM_WIN).wm_state, Some(WmState::Normal));

    spawn(&conn, &mut wm, CHILD_WIN, "Zathura", 200);
    assert_eq!(conn.window(CHILD_WIN).attrs.geometry, on_screen);
    wm.handle_event(XEvent::DestroyNotify { id: CHILD_WIN });

    assert_eq!(wm.reg.get(t).unwrap().geometry(), geometry);
    assert_eq!(conn.window(TERM_WIN).attrs.geometry, on_screen);
    assert_eq!(conn.window(TERM_WIN).wm_state, Some(WmState::Normal));
    assert_eq!(wm.reg.sel(), Some(t));
}

#[test]
fn unrelated_and_refused_windows_are_not_swallowed() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = session(&conn);
    let t = spawn(&conn, &mut wm, TERM_WIN, "st-256color", 100);

    // not started from the terminal
    let other = spawn(&conn, &mut wm, 30, "Firefox", 300);
    // started from it, but ruled out
    conn.add_window(31, "Xev", Rectangle::new(100, 100, 200, 200));
    conn.set_pid(31, 200);
    conn.windows.borrow_mut().get_mut(&31).unwrap().title = Some("Event Tester".into());
    let tester = map(&mut wm, 31);

    assert_eq!(wm.reg.get(t).unwrap().swallowed_child(), None);
    assert_eq!(wm.reg.get(t).unwrap().win, TERM_WIN);
    assert!(wm.reg.selmon().clients.contains(&other));
    assert!(wm.reg.selmon().clients.contains(&tester));
    assert_eq!(conn.client_list.borrow().len(), 3);
}

#[test]
fn a_second_terminal_is_not_swallowed() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = session(&conn);
    let t = spawn(&conn, &mut wm, TERM_WIN, "st-256color", 100);
    spawn(&conn, &mut wm, CHILD_WIN, "st-256color", 200);

    assert_eq!(wm.reg.get(t).unwrap().swallowed_child(), None);
    assert_eq!(wm.reg.selmon().clients.len(), 2);
}

#[test]
fn toggle_swallow_splits_and_rejoins() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = session(&conn);
    let t = spawn(&conn, &mut wm, TERM_WIN, "st-256color", 100);
    spawn(&conn, &mut wm, CHILD_WIN, "Zathura", 200);
    let c = swallowed(&wm, t);

    wm.execute(&Command::ToggleSwallow);
    assert_eq!(wm.reg.get(t).unwrap().win, TERM_WIN);
    assert_eq!(wm.reg.get(t).unwrap().swallow, Swallow::Suspended { child: c });
    assert_eq!(wm.reg.get(c).unwrap().win, CHILD_WIN);
    assert!(conn.is_mapped(TERM_WIN));
    assert!(conn.is_mapped(CHILD_WIN));
    assert_eq!(wm.reg.selmon().clients, vec![c, t]);
    assert_eq!(wm.reg.sel(), Some(c));

    wm.focus(Some(t));
    wm.execute(&Command::ToggleSwallow);
    assert_eq!(wm.reg.get(t).unwrap().win, CHILD_WIN);
    assert!(!conn.is_mapped(TERM_WIN));
    assert_eq!(wm.reg.selmon().clients, vec![t]);
    assert_eq!(*conn.client_list.borrow(), vec![CHILD_WIN]);
}

#[test]
fn a_stale_suspended_swallow_is_forgotten() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = session(&conn);
    let t = spawn(&conn, &mut wm, TERM_WIN, "st-256color", 100);
    spawn(&conn, &mut wm, CHILD_WIN, "Zathura", 200);

    wm.execute(&Command::ToggleSwallow);
    wm.handle_event(XEvent::DestroyNotify { id: CHILD_WIN });
    wm.focus(Some(t));
    wm.execute(&Command::ToggleSwallow);

    assert_eq!(wm.reg.get(t).unwrap().swallow, Swallow::None);
    assert_eq!(wm.reg.get(t).unwrap().win, TERM_WIN);
    assert_eq!(wm.reg.len(), 1);
}

#[test]
fn losing_the_hidden_terminal_keeps_the_child() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = session(&conn);
    let t = spawn(&conn, &mut wm, TERM_WIN, "st-256color", 100);
    spawn(&conn, &mut wm, CHILD_WIN, "Zathura", 200);
    let barwin = wm.reg.selmon().barwin;
    conn.bars.borrow_mut().clear();

    wm.handle_event(XEvent::DestroyNotify { id: TERM_WIN });
    // the monitor is arranged again
    assert!(conn.bars.borrow().contains_key(&barwin));
    let shown = wm.reg.get(t).unwrap();
    assert_eq!(shown.win, CHILD_WIN);
    assert_eq!(shown.swallow, Swallow::None);
    assert_eq!(wm.reg.len(), 1);
    assert_eq!(*conn.client_list.borrow(), vec![CHILD_WIN]);
}

#[test]
fn cleanup_restores_swallowed_terminals() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = session(&conn);
    spawn(&conn, &mut wm, TERM_WIN, "st-256color", 100);
    spawn(&conn, &mut wm, CHILD_WIN, "Zathura", 200);

    assert!(wm.run().is_err());
    assert!(wm.reg.is_empty());
    assert_eq!(conn.window(TERM_WIN).wm_state, Some(WmState::Withdrawn));
}
