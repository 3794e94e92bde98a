//! Handlers for the X events we act on, plus managing and unmanaging windows.
use xcb::Window;

use crate::{
    bar::{tab_at, Draw},
    bindings::{Click, Command},
    client::{Client, ClientId, Swallow},
    monitor::Monitor,
    rule::{apply_rules, TagContext, BROKEN},
    systray::{SYSTEM_TRAY_REQUEST_DOCK, XEMBED_WINDOW_ACTIVATE},
    tag::tag_bit,
    wm::WindowManager,
    xconnection::{
        Point, Rectangle, StackMode, WindowAttributes, WindowChanges, WmState, XConn, XcbKey,
    },
};

// _NET_WM_STATE actions
const NET_WM_STATE_ADD: u32 = 1;
const NET_WM_STATE_TOGGLE: u32 = 2;

impl<'a, X: XConn + Draw> WindowManager<'a, X> {
    /**
     * Start managing a new top level window.
     *
     * The window is classified (inheriting tags and monitor from a managed
     * transient parent), kept inside its monitor, attached next to the focused
     * client and mapped. A window started from a terminal is swallowed by it.
     */
    pub(crate) fn manage(&mut self, win: Window, attrs: &WindowAttributes) {
        if self.reg.win_to_client(win).is_some() {
            return;
        }
        let mut c = Client::new(win, attrs.geometry, self.config.border_px, self.reg.selmon);
        c.old_bw = attrs.border_width;
        c.pid = self.conn.window_pid(win);
        c.name = self.window_title(win);

        let trans = self.conn.transient_for(win);
        let parent = trans.and_then(|t| self.reg.win_to_client(t)).and_then(|t| self.reg.get(t));
        let mut term = None;
        match parent {
            Some(t) => {
                c.mon = t.mon;
                c.tags = t.tags;
            }
            None => {
                self.classify(&mut c);
                term = self.term_for_pid(c.pid, c.is_terminal);
            }
        }
        debug!("managing window {} '{}' on monitor {} tags {:#b}", win, c.name, c.mon, c.tags);

        let bh = self.bh;
        let mon = c.mon;
        let m = &mut self.reg.monitors[mon];
        if c.is_keyboard {
            c.y = m.screen.y + m.screen.h - c.h;
            m.screen.h -= c.height();
        } else {
            if c.x + c.width() > m.screen.x + m.screen.w {
                c.x = m.screen.x + m.screen.w - c.width();
            }
            if c.y + c.height() > m.screen.y + m.screen.h {
                c.y = m.screen.y + m.screen.h - c.height();
            }
            c.x = c.x.max(m.screen.x);
            // only move the client down when its centre would cover the bar
            let centre = c.x + c.w / 2;
            let covers_bar = m.by == m.screen.y && centre >= m.area.x && centre < m.area.x + m.area.w;
            c.y = c.y.max(if covers_bar { m.screen.y + bh } else { m.screen.y });
        }
        let keyboard = c.is_keyboard;
        let id = self.reg.insert(c);
        if keyboard {
            self.update_bar_pos(mon);
        }

        self.update_window_type(id);
        let border_px = self.config.border_px;
        let bw = match self.reg.get(id) {
            Some(c) if c.is_floating => {
                if c.is_fullscreen || c.is_keyboard {
                    0
                } else {
                    border_px
                }
            }
            Some(c) => {
                let shares = self.reg.monitors[mon]
                    .clients
                    .iter()
                    .filter_map(|&t| self.reg.get(t))
                    .any(|t| !t.is_floating && t.tags & c.tags != 0);
                if shares {
                    border_px
                } else {
                    0
                }
            }
            None => return,
        };
        if let Some(c) = self.reg.get_mut(id) {
            c.bw = bw;
        }

        self.conn.configure_window(win, &WindowChanges::border(bw));
        self.conn.set_border_color(win, self.config.normal.border);
        if let Some(c) = self.reg.get(id) {
            self.conn.send_configure_notify(win, &c.geometry(), c.bw);
        }
        self.update_size_hints(id);
        self.update_wm_hints(id);
        self.conn.select_client_events(win);
        self.conn.grab_buttons(win, &self.bindings.client_buttons(), self.numlock, false);

        let (x, y, floating) = match self.reg.get_mut(id) {
            Some(c) => {
                if !c.is_floating {
                    c.is_floating = trans.is_some() || c.is_fixed;
                    c.old_state = c.is_floating;
                }
                (c.x, c.y, c.is_floating)
            }
            None => return,
        };
        if floating {
            self.conn.configure_window(win, &WindowChanges::stack(None, StackMode::Above));
        }

        self.reg.attach_aside(id);
        self.reg.attach_stack(id);
        self.update_client_list();
        // some windows need to be moved before they are mapped
        self.conn.configure_window(win, &WindowChanges::position(x + 2 * self.screen.w, y));
        self.conn.set_wm_state(win, WmState::Normal);

        if !keyboard {
            if mon == self.reg.selmon {
                if let Some(sel) = self.reg.sel() {
                    self.unfocus(sel, false);
                }
            }
            self.reg.monitors[mon].sel = Some(id);
        }
        self.arrange(Some(mon));
        self.conn.map_window(win);
        if let Some(t) = term {
            self.swallow(t, id);
        }
        self.focus(None);
    }

    /// Apply the rule table to a new client.
    fn classify(&self, c: &mut Client) {
        let class = self.conn.wm_class(c.win);
        let (cls, inst) = match &class {
            Some(h) => (Some(h.class.as_str()), Some(h.instance.as_str())),
            None => (None, None),
        };
        let ctx = |m: &Monitor| TagContext {
            all_tags: self.tags.mask(),
            create_tag: tag_bit(m.createtag[m.seltags]),
            tagset: m.tagset(),
            num_monitors: self.reg.monitors.len(),
        };

        let mut cl = apply_rules(&self.config.rules, cls, inst, &c.name, &ctx(&self.reg.monitors[c.mon]));
        if let Some(mon) = cl.monitor {
            if mon != c.mon {
                // the fallback tags come from the monitor the client ends up on
                cl = apply_rules(&self.config.rules, cls, inst, &c.name, &ctx(&self.reg.monitors[mon]));
            }
            c.mon = mon;
        }

        c.tags = cl.tags;
        c.is_floating = cl.floating;
        c.is_terminal = cl.terminal;
        c.is_left = cl.left;
        c.no_swallow = cl.no_swallow;
        c.is_keyboard = cl.keyboard;
        c.opacity = cl.opacity;
        if let Some(f) = cl.cfact {
            c.cfact = f;
        }
        if let Some(opacity) = c.opacity {
            self.conn.set_opacity(c.win, opacity);
        }
    }

    /**
     * Stop managing a client.
     *
     * A client showing a swallowed window gets its terminal back instead. When
     * the window still exists its border and WM_STATE are restored.
     */
    pub(crate) fn unmanage(&mut self, id: ClientId, destroyed: bool) {
        let (win, mon, old_bw, keyboard, swallow) = match self.reg.get(id) {
            Some(c) => (c.win, c.mon, c.old_bw, c.is_keyboard, c.swallow),
            None => return,
        };
        if let Swallow::Active { .. } = swallow {
            self.unswallow(id);
            return;
        }
        debug!("unmanaging window {}", win);

        self.reg.remove(id);
        if !destroyed {
            self.conn.configure_window(win, &WindowChanges::border(old_bw));
            self.conn.grab_buttons(win, &[], self.numlock, true);
            self.conn.set_wm_state(win, WmState::Withdrawn);
        }
        if keyboard {
            // give the monitor its full height back
            self.update_geometry();
        }
        self.arrange(Some(mon));
        self.focus(None);
        self.update_client_list();
    }

    pub(crate) fn window_title(&self, win: Window) -> String {
        let atoms = self.conn.atoms();
        self.conn
            .text_property(win, atoms._NET_WM_NAME)
            .or_else(|| self.conn.text_property(win, xcb::ATOM_WM_NAME))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| BROKEN.to_string())
    }

    pub(crate) fn update_title(&mut self, id: ClientId) {
        let win = match self.reg.get(id) {
            Some(c) => c.win,
            None => return,
        };
        let name = self.window_title(win);
        if let Some(c) = self.reg.get_mut(id) {
            c.name = name;
        }
    }

    fn update_size_hints(&mut self, id: ClientId) {
        let win = match self.reg.get(id) {
            Some(c) => c.win,
            None => return,
        };
        let hints = self.conn.size_hints(win).unwrap_or_default();
        if let Some(c) = self.reg.get_mut(id) {
            c.hints = hints;
            c.is_fixed = hints.is_fixed();
        }
    }

    fn update_wm_hints(&mut self, id: ClientId) {
        let win = match self.reg.get(id) {
            Some(c) => c.win,
            None => return,
        };
        let hints = match self.conn.wm_hints(win) {
            Some(h) => h,
            None => return,
        };
        let focused = self.reg.sel() == Some(id);
        if focused && hints.urgent {
            self.conn.set_urgency_hint(win, false);
        }
        if let Some(c) = self.reg.get_mut(id) {
            if !focused {
                c.is_urgent = hints.urgent;
            }
            c.never_focus = hints.input == Some(false);
        }
    }

    /// Fullscreen and dialog windows as announced through EWMH.
    fn update_window_type(&mut self, id: ClientId) {
        let atoms = self.conn.atoms();
        let (win, outer, screen) = match self.reg.get(id) {
            Some(c) => (c.win, c.outer(), self.reg.monitors[c.mon].screen),
            None => return,
        };
        let state = self.conn.atom_property(win, atoms._NET_WM_STATE);
        let wtype = self.conn.atom_property(win, atoms._NET_WM_WINDOW_TYPE);

        if state == Some(atoms._NET_WM_STATE_FULLSCREEN) || (outer.w == screen.w && outer.h == screen.h) {
            self.set_fullscreen(id, true);
        }
        if wtype == Some(atoms._NET_WM_WINDOW_TYPE_DIALOG) {
            if let Some(c) = self.reg.get_mut(id) {
                c.is_floating = true;
            }
        }
    }

    pub(crate) fn handle_button_press(&mut self, id: Window, button: u8, state: u16, _rpt: Point, wpt: Point) {
        let mon = self.win_to_mon(id);
        if mon != self.reg.selmon {
            if let Some(sel) = self.reg.sel() {
                self.unfocus(sel, true);
            }
            self.reg.selmon = mon;
            self.focus(None);
        }

        let mut click = Click::RootWin;
        let mut arg = 0;
        let (barwin, tabwin) = {
            let m = self.reg.selmon();
            (m.barwin, m.tabwin)
        };
        if id != 0 && id == barwin {
            if let Some((c, a)) = self.bar_content(mon).click_at(wpt.x) {
                click = c;
                arg = a;
            }
        } else if id != 0 && id == tabwin {
            match tab_at(&self.reg.selmon().tab_widths, wpt.x) {
                Some(i) => {
                    click = Click::TabBar;
                    arg = i as u32;
                }
                None => return,
            }
        } else if let Some(c) = self.reg.win_to_client(id) {
            self.focus(Some(c));
            self.restack(self.reg.selmon, false);
            click = Click::ClientWin;
        }

        let commands: Vec<Command> = self
            .bindings
            .button_commands(click, button, state, self.numlock)
            .into_iter()
            .map(|cmd| match click {
                Click::TagBar | Click::TabBar => cmd.with_click_arg(arg),
                _ => cmd.clone(),
            })
            .collect();
        for cmd in commands {
            self.execute(&cmd);
        }
    }

    pub(crate) fn handle_client_message(&mut self, id: Window, dtype: xcb::Atom, data: [u32; 5]) {
        let atoms = self.conn.atoms();

        if let Some(tray) = self.systray.as_mut() {
            if id == tray.win && dtype == atoms._NET_SYSTEM_TRAY_OPCODE {
                if data[1] == SYSTEM_TRAY_REQUEST_DOCK && tray.dock(self.conn, data[2], self.bh, self.config.normal.bg) {
                    let mon = self.systray_mon();
                    self.resize_bar_win(mon);
                    self.update_systray();
                }
                return;
            }
        }

        let c = match self.reg.win_to_client(id) {
            Some(c) => c,
            None => return,
        };
        if dtype == atoms._NET_WM_STATE {
            if data[1] == atoms._NET_WM_STATE_FULLSCREEN || data[2] == atoms._NET_WM_STATE_FULLSCREEN {
                let is_fs = self.reg.get(c).map_or(false, |c| c.is_fullscreen);
                let fs = data[0] == NET_WM_STATE_ADD || (data[0] == NET_WM_STATE_TOGGLE && !is_fs);
                self.set_fullscreen(c, fs);
            }
        } else if dtype == atoms._NET_ACTIVE_WINDOW {
            if !self.reg.is_visible(c) {
                if let Some((mon, tags)) = self.reg.get(c).map(|c| (c.mon, c.tags)) {
                    let m = &mut self.reg.monitors[mon];
                    m.seltags ^= 1;
                    m.tagset[m.seltags] = tags;
                    self.arrange(Some(mon));
                }
            }
            self.focus(Some(c));
        }
    }

    pub(crate) fn handle_configure_request(&mut self, id: Window, changes: WindowChanges) {
        let cid = match self.reg.win_to_client(id) {
            Some(c) if self.reg.get(c).map_or(false, |c| !c.is_keyboard) => c,
            Some(_) => return,
            None => {
                self.conn.configure_window(id, &changes);
                return;
            }
        };

        let arranges = self.layout_kind(self.reg.selmon).arranges();
        let (mon, floating) = match self.reg.get(cid) {
            Some(c) => (c.mon, c.is_floating),
            None => return,
        };
        let m = self.reg.monitors[mon].screen;
        let visible = self.reg.is_visible(cid);
        let c = match self.reg.get_mut(cid) {
            Some(c) => c,
            None => return,
        };

        if let Some(bw) = changes.border_width {
            c.bw = bw;
        } else if floating || !arranges {
            if let Some(x) = changes.x {
                c.old.x = c.x;
                c.x = m.x + x;
            }
            if let Some(y) = changes.y {
                c.old.y = c.y;
                c.y = m.y + y;
            }
            if let Some(w) = changes.w {
                c.old.w = c.w;
                c.w = w;
            }
            if let Some(h) = changes.h {
                c.old.h = c.h;
                c.h = h;
            }
            if c.x + c.w > m.x + m.w && floating {
                c.x = m.x + (m.w / 2 - c.width() / 2);
            }
            if c.y + c.h > m.y + m.h && floating {
                c.y = m.y + (m.h / 2 - c.height() / 2);
            }
            let (win, r, bw) = (c.win, c.geometry(), c.bw);
            let moved_only = (changes.x.is_some() || changes.y.is_some()) && changes.w.is_none() && changes.h.is_none();
            if moved_only {
                self.conn.send_configure_notify(win, &r, bw);
            }
            if visible {
                let mut wc = WindowChanges::geometry(&r, bw);
                wc.border_width = None;
                self.conn.configure_window(win, &wc);
            }
        } else {
            let (win, r, bw) = (c.win, c.geometry(), c.bw);
            self.conn.send_configure_notify(win, &r, bw);
        }
    }

    pub(crate) fn handle_configure_notify(&mut self, _id: Window, r: Rectangle, is_root: bool) {
        if !is_root {
            return;
        }
        let dirty = self.screen.w != r.w || self.screen.h != r.h;
        self.screen = Rectangle::new(0, 0, r.w, r.h);
        if self.update_geometry() || dirty {
            self.update_bars();
            for mon in 0..self.reg.monitors.len() {
                let screen = self.reg.monitors[mon].screen;
                let fullscreen: Vec<ClientId> = self.reg.monitors[mon]
                    .clients
                    .iter()
                    .copied()
                    .filter(|&id| self.reg.get(id).map_or(false, |c| c.is_fullscreen))
                    .collect();
                for id in fullscreen {
                    self.resize_client(id, screen);
                }
                self.resize_bar_win(mon);
            }
            self.focus(None);
            self.arrange(None);
        }
    }

    pub(crate) fn handle_destroy_notify(&mut self, id: Window) {
        if let Some(c) = self.reg.win_to_client(id) {
            self.unmanage(c, true);
        } else if let Some(p) = self.reg.swallowing_client(id) {
            self.drop_hidden(p);
        } else if self.systray.as_mut().map_or(false, |t| t.remove(id)) {
            debug!("tray icon {} destroyed", id);
            let mon = self.systray_mon();
            self.resize_bar_win(mon);
            self.update_systray();
        }
    }

    pub(crate) fn handle_enter_notify(&mut self, id: Window, normal: bool, inferior: bool) {
        if (!normal || inferior) && id != self.conn.root() {
            return;
        }
        let c = self.reg.win_to_client(id);
        if c.and_then(|c| self.reg.get(c)).map_or(false, |c| c.is_keyboard) {
            return;
        }
        let mon = match c.and_then(|c| self.reg.get(c)) {
            Some(cl) => cl.mon,
            None => self.win_to_mon(id),
        };
        if mon != self.reg.selmon {
            if let Some(sel) = self.reg.sel() {
                self.unfocus(sel, true);
            }
            self.reg.selmon = mon;
        } else if c.is_none() || c == self.reg.sel() {
            return;
        }
        self.focus(c);
    }

    pub(crate) fn handle_expose(&mut self, id: Window, count: u16) {
        if count != 0 {
            return;
        }
        let mon = self.win_to_mon(id);
        self.draw_bar(mon);
        self.draw_tabs(mon);
        if mon == self.reg.selmon {
            self.update_systray();
        }
    }

    /// Some clients grab focus on their own: give it back to the selection.
    pub(crate) fn handle_focus_in(&mut self, id: Window) {
        if let Some(sel) = self.reg.sel() {
            if self.reg.get(sel).map_or(false, |c| c.win != id) {
                self.set_focus(sel);
            }
        }
    }

    pub(crate) fn handle_key_press(&mut self, code: XcbKey) {
        if let Some(cmd) = self.bindings.key_command(&code, self.numlock).cloned() {
            self.execute(&cmd);
        }
    }

    pub(crate) fn handle_mapping_notify(&mut self, keyboard: bool) {
        if keyboard {
            self.grab_keys();
        }
    }

    pub(crate) fn handle_map_request(&mut self, id: Window, ignore: bool) {
        if let Some(tray) = self.systray.as_ref() {
            if tray.find(id).is_some() {
                tray.send_xembed(self.conn, id, XEMBED_WINDOW_ACTIVATE);
                let mon = self.systray_mon();
                self.resize_bar_win(mon);
                self.update_systray();
                return;
            }
        }
        if ignore {
            return;
        }
        match self.conn.window_attributes(id) {
            Some(attrs) if !attrs.override_redirect => {
                if self.reg.win_to_client(id).is_none() {
                    self.manage(id, &attrs);
                }
            }
            _ => (),
        }
    }

    /// Track the pointer across monitors on the root window.
    pub(crate) fn handle_motion_notify(&mut self, id: Window, rpt: Point) {
        if id != self.conn.root() {
            return;
        }
        let mon = self.reg.rect_to_mon(&Rectangle::new(rpt.x, rpt.y, 1, 1));
        if self.motion_mon.is_some() && self.motion_mon != Some(mon) {
            if let Some(sel) = self.reg.sel() {
                self.unfocus(sel, true);
            }
            self.reg.selmon = mon;
            self.focus(None);
        }
        self.motion_mon = Some(mon);
    }

    pub(crate) fn handle_property_notify(&mut self, id: Window, atom: xcb::Atom, is_root: bool, deleted: bool) {
        let atoms = self.conn.atoms();

        if let Some(tray) = self.systray.as_mut() {
            if let Some(i) = tray.find(id) {
                if atom == xcb::ATOM_WM_NORMAL_HINTS {
                    let (w, h) = (tray.icons[i].w, tray.icons[i].h);
                    let hints = self.conn.size_hints(id);
                    tray.resize_icon(id, w, h, self.bh, hints);
                } else {
                    tray.update_icon_state(self.conn, id);
                }
                let mon = self.systray_mon();
                self.resize_bar_win(mon);
                self.update_systray();
                return;
            }
        }

        if is_root && atom == xcb::ATOM_WM_NAME {
            self.update_status();
            return;
        }
        if deleted {
            return;
        }
        let c = match self.reg.win_to_client(id) {
            Some(c) => c,
            None => return,
        };
        let mon = self.reg.get(c).map_or(self.reg.selmon, |c| c.mon);

        match atom {
            xcb::ATOM_WM_TRANSIENT_FOR => {
                let floating = self.reg.get(c).map_or(true, |c| c.is_floating);
                let parent = self.conn.transient_for(id).and_then(|t| self.reg.win_to_client(t));
                if !floating && parent.is_some() {
                    if let Some(cl) = self.reg.get_mut(c) {
                        cl.is_floating = true;
                    }
                    self.arrange(Some(mon));
                }
            }
            xcb::ATOM_WM_NORMAL_HINTS => self.update_size_hints(c),
            xcb::ATOM_WM_HINTS => {
                self.update_wm_hints(c);
                self.draw_bars();
                self.draw_tabs(mon);
            }
            _ => (),
        }

        if atom == xcb::ATOM_WM_NAME || atom == atoms._NET_WM_NAME {
            self.update_title(c);
            if self.reg.monitors[mon].sel == Some(c) {
                self.draw_bar(mon);
            }
            self.draw_tabs(mon);
        }
        if atom == atoms._NET_WM_WINDOW_TYPE {
            self.update_window_type(c);
        }
    }

    pub(crate) fn handle_resize_request(&mut self, id: Window, w: i32, h: i32) {
        let bh = self.bh;
        if self.systray.as_mut().map_or(false, |t| t.resize_icon(id, w, h, bh, None)) {
            let mon = self.systray_mon();
            self.resize_bar_win(mon);
            self.update_systray();
        }
    }

    pub(crate) fn handle_unmap_notify(&mut self, id: Window, synthetic: bool) {
        if let Some(c) = self.reg.win_to_client(id) {
            if synthetic {
                self.conn.set_wm_state(id, WmState::Withdrawn);
            } else {
                self.unmanage(c, false);
            }
            return;
        }

        // icons we hid ourselves stay docked
        let mapped = self
            .systray
            .as_ref()
            .and_then(|t| t.icons.iter().find(|i| i.win == id))
            .map_or(false, |i| i.mapped);
        if mapped {
            if let Some(tray) = self.systray.as_mut() {
                tray.remove(id);
            }
            let mon = self.systray_mon();
            self.resize_bar_win(mon);
            self.update_systray();
        }
    }
}
