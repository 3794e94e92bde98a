//! Session level tests driving a [WindowManager] against an in-memory X server.
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
};

use anyhow::Result;
use xcb::{Atom, Window};

use crate::{
    bar::{BarContent, Draw, Tab},
    bindings::KeymapTable,
    client::ClientId,
    config::Config,
    geometry::SizeHints,
    process::ProcessTable,
    wm::WindowManager,
    xconnection::{
        ClassHint, CursorKind, InternedAtoms, Point, Rectangle, WindowAttributes, WindowChanges,
        WmHints, WmState, XConn, XEvent, XcbKey,
    },
};

mod manage;
mod monitors;
mod swallow;
mod views;

pub const ROOT: Window = 1;
pub const SCREEN: Rectangle = Rectangle {
    x: 0,
    y: 0,
    w: 1920,
    h: 1080,
};

/// Initialise logging once so test failures come with the session's debug output.
pub fn setup_logger() {
    let _ = simplelog::TestLogger::init(simplelog::LevelFilter::Debug, simplelog::Config::default());
}

/// A top level window as the mock server knows it
#[derive(Debug, Clone, Default)]
pub struct MockWindow {
    pub attrs: WindowAttributes,
    pub class: Option<ClassHint>,
    pub title: Option<String>,
    pub pid: u32,
    pub transient_for: Option<Window>,
    pub net_wm_state: Option<Atom>,
    pub window_type: Option<Atom>,
    pub wm_hints: Option<WmHints>,
    pub xembed_flags: Option<u32>,
    pub mapped: bool,
    pub wm_state: Option<WmState>,
    pub border: u32,
}

/// Records what the window manager asked of the server
pub struct MockConn {
    atoms: InternedAtoms,
    pub outputs: RefCell<Vec<Rectangle>>,
    pub windows: RefCell<HashMap<Window, MockWindow>>,
    pub events: RefCell<VecDeque<XEvent>>,
    pub focused: Cell<Window>,
    pub client_list: RefCell<Vec<Window>>,
    pub pointer: Cell<Point>,
    pub grab_ok: Cell<bool>,
    /// Events that only reach the queue once the pointer is grabbed
    pub after_grab: RefCell<Vec<XEvent>>,
    pub tray_owned_elsewhere: Cell<bool>,
    pub killed: RefCell<Vec<Window>>,
    pub destroyed: RefCell<Vec<Window>>,
    pub messages: RefCell<Vec<(Window, Atom, [u32; 5])>>,
    pub bars: RefCell<HashMap<Window, BarContent>>,
    next_id: Cell<Window>,
}

impl MockConn {
    pub fn new(outputs: &[Rectangle]) -> MockConn {
        let mut next = 100;
        MockConn {
            atoms: InternedAtoms::from_fn(|_| {
                next += 1;
                next
            }),
            outputs: RefCell::new(outputs.to_vec()),
            windows: RefCell::new(HashMap::new()),
            events: RefCell::new(VecDeque::new()),
            focused: Cell::new(ROOT),
            client_list: RefCell::new(Vec::new()),
            pointer: Cell::new(Point::new(0, 0)),
            grab_ok: Cell::new(true),
            after_grab: RefCell::new(Vec::new()),
            tray_owned_elsewhere: Cell::new(false),
            killed: RefCell::new(Vec::new()),
            destroyed: RefCell::new(Vec::new()),
            messages: RefCell::new(Vec::new()),
            bars: RefCell::new(HashMap::new()),
            next_id: Cell::new(1000),
        }
    }

    /// Register a plain application window with the given class and geometry.
    pub fn add_window(&self, win: Window, class: &str, r: Rectangle) {
        self.windows.borrow_mut().insert(
            win,
            MockWindow {
                attrs: WindowAttributes {
                    override_redirect: false,
                    viewable: false,
                    geometry: r,
                    border_width: 0,
                },
                class: Some(ClassHint {
                    instance: class.to_lowercase(),
                    class: class.to_string(),
                }),
                title: Some(format!("{} window", class)),
                ..MockWindow::default()
            },
        );
    }

    pub fn set_pid(&self, win: Window, pid: u32) {
        if let Some(w) = self.windows.borrow_mut().get_mut(&win) {
            w.pid = pid;
        }
    }

    pub fn window(&self, win: Window) -> MockWindow {
        self.windows.borrow().get(&win).cloned().unwrap_or_default()
    }

    pub fn is_mapped(&self, win: Window) -> bool {
        self.window(win).mapped
    }

    fn with_window(&self, win: Window, f: impl FnOnce(&mut MockWindow)) {
        if let Some(w) = self.windows.borrow_mut().get_mut(&win) {
            f(w);
        }
    }

    fn fresh_id(&self) -> Window {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.windows.borrow_mut().insert(id, MockWindow::default());
        id
    }
}

impl XConn for MockConn {
    fn register_wm(&self) -> Result<()> {
        Ok(())
    }

    fn root(&self) -> Window {
        ROOT
    }

    fn atoms(&self) -> &InternedAtoms {
        &self.atoms
    }

    fn screen_size(&self) -> (i32, i32) {
        (SCREEN.w, SCREEN.h)
    }

    fn flush(&self) -> bool {
        true
    }

    fn wait_for_event(&self) -> Option<XEvent> {
        self.events.borrow_mut().pop_front()
    }

    fn poll_for_event(&self) -> Option<XEvent> {
        self.events.borrow_mut().pop_front()
    }

    fn current_outputs(&self) -> Vec<Rectangle> {
        self.outputs.borrow().clone()
    }

    fn query_tree(&self) -> Vec<Window> {
        let mut wins: Vec<Window> = self.windows.borrow().keys().copied().collect();
        wins.sort_unstable();
        wins
    }

    fn window_attributes(&self, win: Window) -> Option<WindowAttributes> {
        self.windows.borrow().get(&win).map(|w| w.attrs)
    }

    fn wm_state(&self, win: Window) -> Option<WmState> {
        self.windows.borrow().get(&win).and_then(|w| w.wm_state)
    }

    fn transient_for(&self, win: Window) -> Option<Window> {
        self.windows.borrow().get(&win).and_then(|w| w.transient_for)
    }

    fn wm_class(&self, win: Window) -> Option<ClassHint> {
        self.windows.borrow().get(&win).and_then(|w| w.class.clone())
    }

    fn text_property(&self, win: Window, atom: Atom) -> Option<String> {
        if atom != self.atoms._NET_WM_NAME {
            return None;
        }
        self.windows.borrow().get(&win).and_then(|w| w.title.clone())
    }

    fn size_hints(&self, _win: Window) -> Option<SizeHints> {
        None
    }

    fn wm_hints(&self, win: Window) -> Option<WmHints> {
        self.windows.borrow().get(&win).and_then(|w| w.wm_hints)
    }

    fn set_urgency_hint(&self, win: Window, urgent: bool) {
        self.with_window(win, |w| {
            let mut hints = w.wm_hints.unwrap_or_default();
            hints.urgent = urgent;
            w.wm_hints = Some(hints);
        });
    }

    fn window_pid(&self, win: Window) -> u32 {
        self.windows.borrow().get(&win).map_or(0, |w| w.pid)
    }

    fn atom_property(&self, win: Window, prop: Atom) -> Option<Atom> {
        let wins = self.windows.borrow();
        let w = wins.get(&win)?;
        if prop == self.atoms._NET_WM_STATE {
            w.net_wm_state
        } else if prop == self.atoms._NET_WM_WINDOW_TYPE {
            w.window_type
        } else {
            None
        }
    }

    fn xembed_flags(&self, win: Window) -> Option<u32> {
        self.windows.borrow().get(&win).and_then(|w| w.xembed_flags)
    }

    fn supports_protocol(&self, _win: Window, _protocol: Atom) -> bool {
        false
    }

    fn configure_window(&self, win: Window, changes: &WindowChanges) {
        self.with_window(win, |w| {
            let g = &mut w.attrs.geometry;
            g.x = changes.x.unwrap_or(g.x);
            g.y = changes.y.unwrap_or(g.y);
            g.w = changes.w.unwrap_or(g.w);
            g.h = changes.h.unwrap_or(g.h);
            w.attrs.border_width = changes.border_width.unwrap_or(w.attrs.border_width);
        });
    }

    fn send_configure_notify(&self, _win: Window, _r: &Rectangle, _border_width: i32) {}

    fn send_client_message(&self, win: Window, dtype: Atom, data: [u32; 5], _mask: u32) {
        self.messages.borrow_mut().push((win, dtype, data));
    }

    fn set_border_color(&self, win: Window, color: u32) {
        self.with_window(win, |w| w.border = color);
    }

    fn map_window(&self, win: Window) {
        self.with_window(win, |w| {
            w.mapped = true;
            w.attrs.viewable = true;
        });
    }

    fn unmap_window(&self, win: Window) {
        self.with_window(win, |w| {
            w.mapped = false;
            w.attrs.viewable = false;
        });
    }

    fn set_input_focus(&self, win: Window) {
        self.focused.set(win);
    }

    fn focus_root(&self) {
        self.focused.set(ROOT);
    }

    fn set_wm_state(&self, win: Window, state: WmState) {
        self.with_window(win, |w| w.wm_state = Some(state));
    }

    fn set_opacity(&self, _win: Window, _opacity: f64) {}

    fn set_fullscreen_state(&self, win: Window, fullscreen: bool) {
        let atom = self.atoms._NET_WM_STATE_FULLSCREEN;
        self.with_window(win, |w| w.net_wm_state = if fullscreen { Some(atom) } else { None });
    }

    fn set_client_list(&self, wins: &[Window]) {
        *self.client_list.borrow_mut() = wins.to_vec();
    }

    fn set_supported(&self, _atoms: &[Atom]) {}

    fn set_cardinal_property(&self, _win: Window, _prop: Atom, _value: u32) {}

    fn select_client_events(&self, _win: Window) {}

    fn select_tray_icon_events(&self, _win: Window) {}

    fn numlock_mask(&self) -> u16 {
        xcb::MOD_MASK_2 as u16
    }

    fn grab_keys(&self, _keys: &[XcbKey], _numlock: u16) {}

    fn grab_buttons(&self, _win: Window, _buttons: &[(u8, u16)], _numlock: u16, _focused: bool) {}

    fn grab_pointer(&self, _cursor: CursorKind) -> bool {
        if !self.grab_ok.get() {
            return false;
        }
        let late = std::mem::take(&mut *self.after_grab.borrow_mut());
        self.events.borrow_mut().extend(late);
        true
    }

    fn ungrab_pointer(&self) {}

    fn query_pointer(&self) -> Option<Point> {
        Some(self.pointer.get())
    }

    fn warp_pointer(&self, _win: Window, _x: i32, _y: i32) {}

    fn signal_delete_window(&self, win: Window) {
        self.killed.borrow_mut().push(win);
    }

    fn create_bar_window(&self, r: &Rectangle) -> Window {
        let id = self.fresh_id();
        self.with_window(id, |w| {
            w.attrs.geometry = *r;
            w.attrs.override_redirect = true;
            w.mapped = true;
        });
        id
    }

    fn create_tray_window(&self, r: &Rectangle, _background: u32) -> Window {
        let id = self.fresh_id();
        self.with_window(id, |w| {
            w.attrs.geometry = *r;
            w.attrs.override_redirect = true;
        });
        id
    }

    fn destroy_window(&self, win: Window) {
        self.windows.borrow_mut().remove(&win);
        self.destroyed.borrow_mut().push(win);
    }

    fn reparent_window(&self, _win: Window, _parent: Window, _x: i32, _y: i32) {}

    fn add_to_save_set(&self, _win: Window) {}

    fn set_background(&self, _win: Window, _pixel: u32) {}

    fn claim_selection(&self, _owner: Window, _selection: Atom) -> bool {
        !self.tray_owned_elsewhere.get()
    }

    fn cleanup(&self) {
        self.focused.set(ROOT);
    }
}

impl Draw for MockConn {
    fn bar_height(&self) -> i32 {
        18
    }

    fn text_width(&self, text: &str) -> i32 {
        text.chars().count() as i32 * 6 + 12
    }

    fn draw_bar(&self, win: Window, content: &BarContent) {
        self.bars.borrow_mut().insert(win, content.clone());
    }

    fn draw_tabs(&self, _win: Window, _width: i32, _tabs: &[Tab]) {}
}

/// A process tree given as (pid, parent) pairs
pub struct MockProcs(pub Vec<(u32, u32)>);

impl ProcessTable for MockProcs {
    fn parent_of(&self, pid: u32) -> u32 {
        self.0.iter().find(|(p, _)| *p == pid).map_or(0, |&(_, parent)| parent)
    }
}

/// The default configuration without a tray, which most tests don't care about.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.show_systray = false;
    config
}

pub fn new_wm(conn: &MockConn, config: Config) -> WindowManager<'_, MockConn> {
    setup_logger();
    match WindowManager::new(conn, config, &KeymapTable::new()) {
        Ok(wm) => wm,
        Err(e) => panic!("unable to start the window manager: {}", e),
    }
}

/// Ask the session to manage a window the mock server already knows about.
pub fn map(wm: &mut WindowManager<'_, MockConn>, win: Window) -> ClientId {
    wm.handle_event(XEvent::MapRequest { id: win, ignore: false });
    match wm.reg.win_to_client(win) {
        Some(id) => id,
        None => panic!("window {} was not managed", win),
    }
}

pub fn open(conn: &MockConn, wm: &mut WindowManager<'_, MockConn>, win: Window, class: &str) -> ClientId {
    conn.add_window(win, class, Rectangle::new(100, 100, 400, 300));
    map(wm, win)
}
