//! The window manager session: construction, the event loop and the bar helpers.
use std::collections::VecDeque;

use anyhow::{anyhow, Context, Result};
use xcb::Window;

use crate::{
    bar::{fit_tab_widths, build_tabs, BarContent, BarInputs, Draw},
    bindings::{Bindings, KeymapTable},
    config::Config,
    layout::{ArrangeParams, LayoutKind},
    monitor::TabMode,
    process::{ProcFs, ProcessTable},
    registry::Registry,
    systray::{systray_to_mon, Systray},
    tag::TagNames,
    xconnection::{is_ignorable_error, Rectangle, WindowChanges, WmState, XConn, XEvent},
};

/**
 * All state of a running window manager.
 *
 * The session is split over several modules as `impl` blocks: focus and
 * stacking live in `focus.rs`, event handlers in `events.rs`, user commands in
 * `commands.rs`, pointer drags in `mouse.rs` and swallowing in `swallow.rs`.
 */
pub struct WindowManager<'a, X: XConn + Draw> {
    pub(crate) conn: &'a X,
    pub(crate) config: Config,
    pub(crate) reg: Registry,
    pub(crate) tags: TagNames,
    pub(crate) bindings: Bindings,
    pub(crate) numlock: u16,
    pub(crate) systray: Option<Systray>,
    pub(crate) status: String,
    /// Bar height
    pub(crate) bh: i32,
    /// The whole X screen
    pub(crate) screen: Rectangle,
    /// Set while a combo key is held down
    pub(crate) combo: bool,
    pub(crate) running: bool,
    /// Events put aside during a pointer grab or a restack, handled before reading new ones
    pub(crate) deferred: VecDeque<XEvent>,
    /// Monitor the pointer was last seen on
    pub(crate) motion_mon: Option<usize>,
    pub(crate) procs: Box<dyn ProcessTable>,
}

impl<'a, X: XConn + Draw> WindowManager<'a, X> {
    /**
     * Take over the display: claim the root window, set up monitors and bars,
     * dock the tray and manage every window that is already mapped.
     */
    pub fn new(conn: &'a X, config: Config, keymap: &KeymapTable) -> Result<WindowManager<'a, X>> {
        conn.register_wm()
            .context("another window manager is already running")?;

        let tags = TagNames::new(config.tags.iter().cloned());
        if config.layouts.is_empty() {
            return Err(anyhow!("the layout table is empty"));
        }
        let (sw, sh) = conn.screen_size();
        let bindings = Bindings::new(keymap, &config.key_bindings, &config.button_bindings);

        let mut wm = WindowManager {
            conn,
            bh: conn.bar_height(),
            screen: Rectangle::new(0, 0, sw, sh),
            numlock: conn.numlock_mask(),
            tags,
            bindings,
            config,
            reg: Registry::new(),
            systray: None,
            status: String::new(),
            combo: false,
            running: false,
            deferred: VecDeque::new(),
            motion_mon: None,
            procs: Box::new(ProcFs),
        };

        wm.update_geometry();
        wm.update_bars();
        wm.update_status();
        if wm.config.show_systray {
            wm.init_systray();
        }

        let atoms = conn.atoms();
        conn.set_supported(&atoms.supported());
        conn.set_client_list(&[]);
        wm.grab_keys();
        wm.focus(None);
        wm.scan();
        conn.flush();

        Ok(wm)
    }

    /// Replace the process table used for swallowing.
    pub fn set_process_table(&mut self, procs: Box<dyn ProcessTable>) {
        self.procs = procs;
    }

    /// Run the main event loop until a Quit command or the server goes away.
    pub fn run(&mut self) -> Result<()> {
        self.running = true;
        info!("entering the main event loop");
        while self.running {
            let event = match self.deferred.pop_front() {
                Some(e) => e,
                None => match self.conn.wait_for_event() {
                    Some(e) => e,
                    None => {
                        self.cleanup();
                        return Err(anyhow!("lost connection to the X server"));
                    }
                },
            };
            self.handle_event(event);
        }
        self.cleanup();
        Ok(())
    }

    /// Dispatch a single event to its handler.
    pub fn handle_event(&mut self, event: XEvent) {
        debug!("got XEvent: {:?}", event);
        match event {
            XEvent::ButtonPress {
                id,
                button,
                state,
                rpt,
                wpt,
            } => self.handle_button_press(id, button, state, rpt, wpt),
            XEvent::ButtonRelease { .. } | XEvent::KeyRelease { .. } => self.combo = false,
            XEvent::ClientMessage { id, dtype, data } => self.handle_client_message(id, dtype, data),
            XEvent::ConfigureRequest { id, changes } => self.handle_configure_request(id, changes),
            XEvent::ConfigureNotify { id, r, is_root } => self.handle_configure_notify(id, r, is_root),
            XEvent::DestroyNotify { id } => self.handle_destroy_notify(id),
            XEvent::EnterNotify { id, normal, inferior } => self.handle_enter_notify(id, normal, inferior),
            XEvent::Expose { id, count } => self.handle_expose(id, count),
            XEvent::FocusIn { id } => self.handle_focus_in(id),
            XEvent::KeyPress { code } => self.handle_key_press(code),
            XEvent::MappingNotify { keyboard } => self.handle_mapping_notify(keyboard),
            XEvent::MapRequest { id, ignore } => self.handle_map_request(id, ignore),
            XEvent::MotionNotify { id, rpt, .. } => self.handle_motion_notify(id, rpt),
            XEvent::PropertyNotify {
                id,
                atom,
                is_root,
                deleted,
            } => self.handle_property_notify(id, atom, is_root, deleted),
            XEvent::ResizeRequest { id, w, h } => self.handle_resize_request(id, w, h),
            XEvent::UnmapNotify { id, synthetic } => self.handle_unmap_notify(id, synthetic),
            XEvent::Error {
                request,
                code,
                resource,
            } => {
                if !is_ignorable_error(request, code) {
                    error!(
                        "X error: request code={}, error code={}, resource={}",
                        request, code, resource
                    );
                }
            }
        }
        self.conn.flush();
    }

    /// Unmanage everything and hand the display back.
    fn cleanup(&mut self) {
        let all = self.tags.mask();
        for m in self.reg.monitors.iter_mut() {
            m.tagset[m.seltags] = all;
        }
        // unmanaging a swallowing client first restores its own window, so
        // keep going until every stack is empty
        for i in 0..self.reg.monitors.len() {
            while let Some(id) = self.reg.monitors.get(i).and_then(|m| m.stack.first().copied()) {
                self.unmanage(id, false);
            }
        }

        for m in self.reg.monitors.iter() {
            for &w in [m.barwin, m.tabwin].iter().filter(|&&w| w != 0) {
                self.conn.destroy_window(w);
            }
        }
        if let Some(tray) = self.systray.take() {
            self.conn.unmap_window(tray.win);
            self.conn.destroy_window(tray.win);
        }
        self.conn.cleanup();
        self.conn.flush();
    }

    /// Manage windows that existed before we started, transients last.
    fn scan(&mut self) {
        let wins = self.conn.query_tree();
        let mut transients = Vec::new();

        for win in wins {
            let attrs = match self.conn.window_attributes(win) {
                Some(a) if !a.override_redirect => a,
                _ => continue,
            };
            if self.conn.transient_for(win).is_some() {
                transients.push((win, attrs));
                continue;
            }
            if attrs.viewable || self.conn.wm_state(win) == Some(WmState::Iconic) {
                self.manage(win, &attrs);
            }
        }

        for (win, attrs) in transients {
            if attrs.viewable || self.conn.wm_state(win) == Some(WmState::Iconic) {
                self.manage(win, &attrs);
            }
        }
    }

    pub(crate) fn grab_keys(&mut self) {
        self.numlock = self.conn.numlock_mask();
        self.conn.grab_keys(&self.bindings.keys(), self.numlock);
    }

    pub(crate) fn layout_kind(&self, mon: usize) -> LayoutKind {
        self.reg
            .monitors
            .get(mon)
            .and_then(|m| self.config.layouts.get(m.layout()))
            .map_or(LayoutKind::Floating, |l| l.kind)
    }

    pub(crate) fn layout_params(&self) -> ArrangeParams {
        ArrangeParams {
            gap: self.config.gap_px,
            min_dim: self.bh,
            resize_hints: self.config.resize_hints,
            left_min_width: self.config.left_column_min_width,
            left_min_clients: self.config.left_column_min_clients,
        }
    }

    /// Whether a monitor currently reserves space for its tab bar.
    pub(crate) fn show_tabs(&self, mon: usize) -> bool {
        match self.reg.monitors.get(mon).map(|m| m.tab_mode) {
            Some(TabMode::Always) => true,
            Some(TabMode::Auto) => {
                self.layout_kind(mon) == LayoutKind::Monocle && self.reg.visible(mon).len() > 1
            }
            _ => false,
        }
    }

    pub(crate) fn update_bar_pos(&mut self, mon: usize) {
        let tabs = self.show_tabs(mon);
        let bh = self.bh;
        if let Some(m) = self.reg.monitors.get_mut(mon) {
            m.update_bar_pos(bh, tabs);
        }
    }

    /// Monitor a window belongs to; the root window means the one under the pointer.
    pub(crate) fn win_to_mon(&self, win: Window) -> usize {
        if win == self.conn.root() {
            if let Some(p) = self.conn.query_pointer() {
                return self.reg.rect_to_mon(&Rectangle::new(p.x, p.y, 1, 1));
            }
        }
        if win != 0 {
            if let Some(i) = self
                .reg
                .monitors
                .iter()
                .position(|m| m.barwin == win || m.tabwin == win)
            {
                return i;
            }
        }
        self.reg
            .win_to_client(win)
            .and_then(|id| self.reg.get(id))
            .map_or(self.reg.selmon, |c| c.mon)
    }

    /**
     * Reconcile the monitors against the current outputs.
     *
     * Returns whether anything changed. A selected monitor that turned from
     * landscape to portrait (or back) switches to the matching layout.
     */
    pub(crate) fn update_geometry(&mut self) -> bool {
        let was_portrait = self.reg.monitors.get(self.reg.selmon).map(|m| m.is_portrait());
        let before = self.reg.monitors.len();
        let outputs = self.conn.current_outputs();
        let result = self.reg.reconcile_outputs(&outputs, self.screen, &self.config);

        for w in result.removed_windows {
            self.conn.destroy_window(w);
        }
        if !result.dirty {
            return false;
        }

        for i in before..self.reg.monitors.len() {
            let portrait = self.reg.monitors[i].is_portrait();
            let lt = self.config.orientation_layout(portrait);
            let m = &mut self.reg.monitors[i];
            m.lt[m.sellt] = lt;
        }
        if let Some(p) = self.conn.query_pointer() {
            self.reg.selmon = self.reg.rect_to_mon(&Rectangle::new(p.x, p.y, 1, 1));
        }
        for i in 0..self.reg.monitors.len() {
            self.update_bar_pos(i);
        }

        let portrait = self.reg.selmon().is_portrait();
        if was_portrait.map_or(false, |p| p != portrait) {
            info!("monitor {} is now {}", self.reg.selmon, if portrait { "portrait" } else { "landscape" });
            let lt = self.config.orientation_layout(portrait);
            self.set_layout(Some(lt));
        }
        true
    }

    /// Create bar and tab windows for monitors that lack them.
    pub(crate) fn update_bars(&mut self) {
        let bh = self.bh;
        for i in 0..self.reg.monitors.len() {
            let (area, by, ty) = {
                let m = &self.reg.monitors[i];
                (m.area, m.by, m.ty)
            };
            if self.reg.monitors[i].barwin == 0 {
                let w = self.bar_width(i);
                let win = self.conn.create_bar_window(&Rectangle::new(area.x, by, w, bh));
                self.reg.monitors[i].barwin = win;
                debug!("created bar window {} for monitor {}", win, i);
            }
            if self.reg.monitors[i].tabwin == 0 {
                let win = self.conn.create_bar_window(&Rectangle::new(area.x, ty, area.w.max(1), bh));
                self.reg.monitors[i].tabwin = win;
            }
        }
    }

    /// Bar width of a monitor: the tray takes the right end of the tray monitor's bar.
    fn bar_width(&self, mon: usize) -> i32 {
        let w = self.reg.monitors[mon].area.w;
        match &self.systray {
            Some(tray) if self.config.show_systray && mon == self.systray_mon() => (w - tray.width()).max(1),
            _ => w.max(1),
        }
    }

    pub(crate) fn resize_bar_win(&mut self, mon: usize) {
        let m = match self.reg.monitors.get(mon) {
            Some(m) if m.barwin != 0 => m,
            _ => return,
        };
        let r = Rectangle::new(m.area.x, m.by, self.bar_width(mon), self.bh);
        self.conn.configure_window(m.barwin, &WindowChanges::geometry(&r, 0));
    }

    pub(crate) fn systray_mon(&self) -> usize {
        systray_to_mon(
            self.reg.monitors.len(),
            self.reg.selmon,
            self.config.systray_pinning,
            self.config.systray_pinning_fail_first,
        )
    }

    fn init_systray(&mut self) {
        let mon = self.systray_mon();
        let r = match self.reg.monitors.get(mon) {
            Some(m) => Rectangle::new(m.area.x + m.area.w - 1, m.by, 1, self.bh),
            None => return,
        };
        self.systray = Systray::new(self.conn, &r, self.config.normal.bg, self.config.systray_spacing);
        self.update_systray();
    }

    /// Lay out the tray icons and move the tray next to the bar of its monitor.
    pub(crate) fn update_systray(&mut self) {
        if !self.config.show_systray {
            return;
        }
        let mon = self.systray_mon();
        let (screen, by, barwin) = match self.reg.monitors.get(mon) {
            Some(m) => (m.area, m.by, m.barwin),
            None => return,
        };
        let bh = self.bh;
        if let Some(tray) = self.systray.as_mut() {
            tray.layout(self.conn, &screen, by, bh, barwin);
        }
        self.resize_bar_win(mon);
    }

    /// What the bar of a monitor should show right now.
    pub(crate) fn bar_content(&self, mon: usize) -> BarContent {
        let m = &self.reg.monitors[mon];
        let mut occupied = 0;
        let mut urgent = 0;
        for c in m.clients.iter().filter_map(|&id| self.reg.get(id)) {
            occupied |= c.tags;
            if c.is_urgent {
                urgent |= c.tags;
            }
        }
        let sel = m.sel.and_then(|id| self.reg.get(id));
        let inputs = BarInputs {
            tags: self.tags.names(),
            tagset: m.tagset(),
            occupied,
            urgent,
            sel_tags: sel.map_or(0, |c| c.tags),
            symbol: &m.ltsymbol,
            title: sel.map(|c| c.name.as_str()),
            title_floating: sel.map_or(false, |c| c.is_floating),
            status: &self.status,
            is_selmon: mon == self.reg.selmon,
            width: self.bar_width(mon),
        };
        BarContent::build(&inputs, |s| self.conn.text_width(s))
    }

    pub(crate) fn draw_bar(&self, mon: usize) {
        match self.reg.monitors.get(mon) {
            Some(m) if m.show_bar && m.barwin != 0 => self.conn.draw_bar(m.barwin, &self.bar_content(mon)),
            _ => (),
        }
    }

    pub(crate) fn draw_bars(&mut self) {
        for i in 0..self.reg.monitors.len() {
            self.draw_bar(i);
        }
        self.update_systray();
    }

    /// Redraw the tab bar, remembering the tab widths for click lookups.
    pub(crate) fn draw_tabs(&mut self, mon: usize) {
        if mon >= self.reg.monitors.len() || !self.show_tabs(mon) {
            return;
        }
        let visible = self.reg.visible(mon);
        let sel = self.reg.monitors[mon].sel;
        let titles: Vec<(String, bool)> = visible
            .iter()
            .filter_map(|&id| self.reg.get(id).map(|c| (c.name.clone(), Some(id) == sel)))
            .collect();
        let natural: Vec<i32> = titles.iter().map(|(t, _)| self.conn.text_width(t)).collect();

        let m = &mut self.reg.monitors[mon];
        m.tab_widths = fit_tab_widths(&natural, m.area.w);
        let tabs = build_tabs(titles, &m.tab_widths);
        if m.tabwin != 0 {
            self.conn.draw_tabs(m.tabwin, m.area.w, &tabs);
        }
    }

    /// Re-read the status text from the root window name.
    pub(crate) fn update_status(&mut self) {
        let atom = xcb::ATOM_WM_NAME;
        self.status = self
            .conn
            .text_property(self.conn.root(), atom)
            .unwrap_or_else(|| format!("combowm-{}", env!("CARGO_PKG_VERSION")));
        let selmon = self.reg.selmon;
        if selmon < self.reg.monitors.len() {
            self.draw_bar(selmon);
        }
    }

    pub(crate) fn update_client_list(&self) {
        self.conn.set_client_list(&self.reg.managed_windows());
    }
}
