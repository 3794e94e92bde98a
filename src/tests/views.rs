use super::*;
use crate::bindings::Command;

fn release_combo(wm: &mut WindowManager<'_, MockConn>) {
    wm.handle_event(XEvent::KeyRelease {
        code: XcbKey::new(xcb::MOD_MASK_1 as u16, 10),
    });
    assert!(!wm.combo);
}

#[test]
fn view_flips_between_two_slots() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");

    wm.execute(&Command::View(0b100));
    assert_eq!(wm.reg.selmon().tagset(), 0b100);
    assert_eq!(wm.reg.selmon().seltags, 1);
    assert_eq!(wm.reg.sel(), None);

    // viewing what is already shown does nothing
    wm.execute(&Command::View(0b100));
    assert_eq!(wm.reg.selmon().seltags, 1);

    // an empty mask goes back to the previous view
    wm.execute(&Command::View(0));
    assert_eq!(wm.reg.selmon().tagset(), 1);
    assert_eq!(wm.reg.sel(), Some(a));
}

#[test]
fn toggle_view_never_empties_the_view() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    open(&conn, &mut wm, 10, "Firefox");

    wm.execute(&Command::ToggleView(0b10));
    assert_eq!(wm.reg.selmon().tagset(), 0b11);
    wm.execute(&Command::ToggleView(0b11));
    assert_eq!(wm.reg.selmon().tagset(), 0b11);
    wm.execute(&Command::ToggleView(0b1));
    assert_eq!(wm.reg.selmon().tagset(), 0b10);
}

#[test]
fn tag_moves_the_selection_out_of_view() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");

    wm.execute(&Command::Tag(0));
    assert_eq!(wm.reg.get(a).unwrap().tags, 1);

    wm.execute(&Command::Tag(0b100));
    assert_eq!(wm.reg.get(a).unwrap().tags, 0b100);
    assert!(!wm.reg.is_visible(a));
    assert_eq!(wm.reg.sel(), None);
    assert_eq!(conn.focused.get(), ROOT);
}

#[test]
fn toggle_tag_keeps_at_least_one_tag() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");

    wm.execute(&Command::ToggleTag(0b10));
    assert_eq!(wm.reg.get(a).unwrap().tags, 0b11);
    wm.execute(&Command::ToggleTag(0b11));
    assert_eq!(wm.reg.get(a).unwrap().tags, 0b11);
    wm.execute(&Command::ToggleTag(0b1));
    assert_eq!(wm.reg.get(a).unwrap().tags, 0b10);
}

#[test]
fn tags_outside_the_configured_set_are_masked() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");

    wm.execute(&Command::Tag(!0));
    assert_eq!(wm.reg.get(a).unwrap().tags, 0x1ff);
    wm.execute(&Command::View(!0));
    assert_eq!(wm.reg.selmon().tagset(), 0x1ff);
}

#[test]
fn combo_view_adds_tags_while_held() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());

    wm.execute(&Command::ComboView(1));
    assert_eq!(wm.reg.selmon().tagset(), 0b10);
    assert!(wm.combo);
    wm.execute(&Command::ComboView(3));
    assert_eq!(wm.reg.selmon().tagset(), 0b1010);
    release_combo(&mut wm);

    // pressing the create tag again shows it alone
    wm.execute(&Command::ComboView(1));
    assert_eq!(wm.reg.selmon().tagset(), 0b10);
}

#[test]
fn combo_view_restores_what_a_tag_was_shown_with() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());

    wm.execute(&Command::ComboView(1));
    wm.execute(&Command::ComboView(2));
    assert_eq!(wm.reg.selmon().tagset(), 0b110);
    release_combo(&mut wm);

    wm.execute(&Command::ComboView(0));
    assert_eq!(wm.reg.selmon().tagset(), 0b1);
    release_combo(&mut wm);

    wm.execute(&Command::ComboView(1));
    assert_eq!(wm.reg.selmon().tagset(), 0b110);
    assert_eq!(wm.reg.selmon().createtag[wm.reg.selmon().seltags], 1);
}

#[test]
fn combo_view_back_returns_to_the_previous_view() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");

    wm.execute(&Command::ComboView(2));
    assert_eq!(wm.reg.selmon().tagset(), 0b100);
    assert_eq!(wm.reg.sel(), None);
    release_combo(&mut wm);

    wm.execute(&Command::ComboView(-1));
    assert_eq!(wm.reg.selmon().tagset(), 0b1);
    assert_eq!(wm.reg.sel(), Some(a));
    release_combo(&mut wm);

    // and forth again
    wm.execute(&Command::ComboView(-1));
    assert_eq!(wm.reg.selmon().tagset(), 0b100);
}

#[test]
fn new_windows_open_on_the_create_tag() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());

    wm.execute(&Command::ComboView(1));
    wm.execute(&Command::ComboView(2));
    release_combo(&mut wm);
    let a = open(&conn, &mut wm, 10, "Firefox");
    assert_eq!(wm.reg.get(a).unwrap().tags, 0b10);
    assert_eq!(wm.reg.sel(), Some(a));
}

#[test]
fn combo_tag_collects_tags_while_held() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    wm.execute(&Command::ToggleView(0b10));

    wm.execute(&Command::ComboTag(0b10));
    assert_eq!(wm.reg.get(a).unwrap().tags, 0b10);
    wm.execute(&Command::ComboTag(0b1));
    assert_eq!(wm.reg.get(a).unwrap().tags, 0b11);
    release_combo(&mut wm);

    wm.execute(&Command::ComboTag(0b1));
    assert_eq!(wm.reg.get(a).unwrap().tags, 0b1);
}

#[test]
fn activating_a_hidden_window_brings_its_tags_into_view() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    let a = open(&conn, &mut wm, 10, "Firefox");
    wm.execute(&Command::View(0b1000));
    assert_eq!(wm.reg.sel(), None);

    let active = conn.atoms()._NET_ACTIVE_WINDOW;
    wm.handle_event(XEvent::ClientMessage {
        id: 10,
        dtype: active,
        data: [1, 0, 0, 0, 0],
    });
    assert_eq!(wm.reg.selmon().tagset(), 0b1);
    assert_eq!(wm.reg.sel(), Some(a));
    assert_eq!(conn.focused.get(), 10);
}

#[test]
fn hidden_clients_are_moved_off_screen() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    open(&conn, &mut wm, 10, "Firefox");
    let x = conn.window(10).attrs.geometry.x;
    assert!(x >= 0);

    wm.execute(&Command::View(0b10));
    assert!(conn.window(10).attrs.geometry.x < 0);
    wm.execute(&Command::View(0b1));
    assert_eq!(conn.window(10).attrs.geometry.x, x);
}

#[test]
fn bar_shows_occupied_and_viewed_tags() {
    let conn = MockConn::new(&[SCREEN]);
    let mut wm = new_wm(&conn, test_config());
    open(&conn, &mut wm, 10, "Firefox");
    wm.execute(&Command::ToggleTag(0b100));

    let barwin = wm.reg.selmon().barwin;
    let content = conn.bars.borrow().get(&barwin).cloned();
    assert!(content.is_some());
    assert_eq!(wm.bar_content(0), content.unwrap());
}
