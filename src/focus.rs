//! Focus, stacking and the arrange pass.
use crate::{
    bar::Draw,
    client::ClientId,
    geometry::{self, Bounds},
    layout::{adjust_borders, ArrangeCtx},
    wm::WindowManager,
    xconnection::{
        Rectangle, StackMode, WindowChanges, XConn, XEvent, CURRENT_TIME, NO_EVENT_MASK,
    },
};

impl<'a, X: XConn + Draw> WindowManager<'a, X> {
    /**
     * Focus a client, or the most recently focused visible client of the
     * selected monitor when `target` is None or hidden.
     *
     * Keyboard panels never take focus. Focusing a client on another monitor
     * makes that monitor the selected one.
     */
    pub(crate) fn focus(&mut self, target: Option<ClientId>) {
        if let Some(c) = target.and_then(|id| self.reg.get(id)) {
            if c.is_keyboard {
                return;
            }
        }

        let target = target
            .filter(|&id| self.reg.is_visible(id))
            .or_else(|| {
                let selmon = self.reg.selmon;
                self.reg.selmon().stack.iter().copied().find(|&id| {
                    self.reg.is_visible(id) && self.reg.get(id).map_or(false, |c| !c.is_keyboard && c.mon == selmon)
                })
            });

        let prev = self.reg.sel();
        if let Some(p) = prev {
            if Some(p) != target {
                self.unfocus(p, false);
            }
        }

        match target {
            Some(id) => {
                let mon = self.reg.get(id).map_or(self.reg.selmon, |c| c.mon);
                if mon != self.reg.selmon {
                    self.reg.selmon = mon;
                }
                if self.reg.get(id).map_or(false, |c| c.is_urgent) {
                    self.set_urgent(id, false);
                }
                self.reg.detach_stack(id);
                self.reg.attach_stack(id);

                let buttons = self.bindings.client_buttons();
                if let Some(c) = self.reg.get(id) {
                    self.conn.grab_buttons(c.win, &buttons, self.numlock, true);
                    self.conn.set_border_color(c.win, self.config.selected.border);
                    if c.opacity.is_some() {
                        self.conn.set_opacity(c.win, 1.0);
                    }
                }
                self.set_focus(id);
                self.lower_tiled_except(id);
            }
            None => self.conn.focus_root(),
        }

        self.reg.selmon_mut().sel = target;
        self.draw_bars();
        let selmon = self.reg.selmon;
        self.draw_tabs(selmon);
    }

    /// Visual and input focus leave a client.
    pub(crate) fn unfocus(&mut self, id: ClientId, to_root: bool) {
        let buttons = self.bindings.client_buttons();
        if let Some(c) = self.reg.get(id) {
            self.conn.grab_buttons(c.win, &buttons, self.numlock, false);
            self.conn.set_border_color(c.win, self.config.normal.border);
            if let Some(opacity) = c.opacity {
                if !c.is_fullscreen {
                    self.conn.set_opacity(c.win, opacity);
                }
            }
        }
        if to_root {
            self.conn.focus_root();
        }
    }

    /// Hand input focus to a client, through WM_TAKE_FOCUS when it asks for that.
    pub(crate) fn set_focus(&self, id: ClientId) {
        let c = match self.reg.get(id) {
            Some(c) => c,
            None => return,
        };
        if !c.never_focus {
            self.conn.set_input_focus(c.win);
        }
        let atoms = self.conn.atoms();
        if self.conn.supports_protocol(c.win, atoms.WM_TAKE_FOCUS) {
            self.conn.send_client_message(
                c.win,
                atoms.WM_PROTOCOLS,
                [atoms.WM_TAKE_FOCUS, CURRENT_TIME, 0, 0, 0],
                NO_EVENT_MASK,
            );
        }
    }

    pub(crate) fn set_urgent(&mut self, id: ClientId, urgent: bool) {
        if let Some(c) = self.reg.get_mut(id) {
            c.is_urgent = urgent;
            self.conn.set_urgency_hint(c.win, urgent);
        }
    }

    /// Push every other tiled client of the focused one's monitor to the bottom.
    fn lower_tiled_except(&self, id: ClientId) {
        let mon = match self.reg.get(id) {
            Some(c) => c.mon,
            None => return,
        };
        for other in self.reg.tiled(mon).into_iter().filter(|&o| o != id) {
            if let Some(c) = self.reg.get(other) {
                self.conn.configure_window(c.win, &WindowChanges::stack(None, StackMode::Below));
            }
        }
    }

    /**
     * Fix the Z-order of a monitor: the selection on top if it floats, tiled
     * clients under the bar in focus order. Pending EnterNotify events caused
     * by the restack are dropped so the pointer does not steal focus.
     */
    pub(crate) fn restack(&mut self, mon: usize, warp: bool) {
        if mon >= self.reg.monitors.len() {
            return;
        }
        self.draw_bar(mon);
        self.draw_tabs(mon);

        let m = &self.reg.monitors[mon];
        let sel = match m.sel {
            Some(sel) => sel,
            None => return,
        };
        let arranges = self.layout_kind(mon).arranges();
        if let Some(c) = self.reg.get(sel) {
            if c.is_floating || !arranges {
                self.conn.configure_window(c.win, &WindowChanges::stack(None, StackMode::Above));
            }
        }

        if arranges {
            let mut sibling = if m.barwin != 0 { Some(m.barwin) } else { None };
            for &id in m.stack.iter() {
                let c = match self.reg.get(id) {
                    Some(c) if c.is_tiled() && self.reg.is_visible(id) => c,
                    _ => continue,
                };
                self.conn.configure_window(c.win, &WindowChanges::stack(sibling, StackMode::Below));
                sibling = Some(c.win);
            }
        }

        self.conn.flush();
        while let Some(e) = self.conn.poll_for_event() {
            if let XEvent::EnterNotify { .. } = e {
                continue;
            }
            self.deferred.push_back(e);
        }

        if warp && mon == self.reg.selmon && self.reg.is_visible(sel) {
            self.warp(Some(sel));
        }
    }

    /// Move the pointer to the centre of a client, or of the selected monitor.
    pub(crate) fn warp(&self, target: Option<ClientId>) {
        let c = match target.and_then(|id| self.reg.get(id)) {
            Some(c) => c,
            None => {
                let a = self.reg.selmon().area;
                self.conn.warp_pointer(self.conn.root(), a.x + a.w / 2, a.y + a.h / 2);
                return;
            }
        };
        let p = match self.conn.query_pointer() {
            Some(p) => p,
            None => return,
        };

        let inside = p.x > c.x - c.bw && p.y > c.y - c.bw && p.x < c.x + c.w + c.bw * 2 && p.y < c.y + c.h + c.bw * 2;
        let m = &self.reg.monitors[c.mon];
        let on_bar = p.y > m.by && p.y < m.by + self.bh;
        if inside || on_bar {
            return;
        }
        self.conn.warp_pointer(c.win, c.w / 2, c.h / 2);
    }

    /**
     * Re-run layouts: one monitor (then restack it), or every monitor.
     */
    pub(crate) fn arrange(&mut self, mon: Option<usize>) {
        let targets: Vec<usize> = match mon {
            Some(m) if m < self.reg.monitors.len() => vec![m],
            Some(_) => return,
            None => (0..self.reg.monitors.len()).collect(),
        };

        for &m in targets.iter() {
            let kind = self.layout_kind(m);
            for id in adjust_borders(&mut self.reg, m, kind, self.config.border_px) {
                if let Some(c) = self.reg.get(id) {
                    self.conn.configure_window(c.win, &WindowChanges::border(c.bw));
                }
            }
            self.show_hide(m);
        }
        for &m in targets.iter() {
            self.arrange_mon(m);
        }
        if let Some(m) = mon {
            self.restack(m, true);
        }
    }

    fn arrange_mon(&mut self, mon: usize) {
        self.update_bar_pos(mon);
        let (tabwin, area, ty) = {
            let m = &self.reg.monitors[mon];
            (m.tabwin, m.area, m.ty)
        };
        if tabwin != 0 {
            let r = Rectangle::new(area.x, ty, area.w.max(1), self.bh);
            self.conn.configure_window(tabwin, &WindowChanges::geometry(&r, 0));
        }

        let lt = self.reg.monitors[mon].layout();
        let (symbol, kind) = match self.config.layouts.get(lt) {
            Some(l) => (l.symbol.clone(), l.kind),
            None => return,
        };
        self.reg.monitors[mon].ltsymbol = symbol;
        if !kind.arranges() {
            return;
        }

        let params = self.layout_params();
        let mut ctx = ArrangeCtx::new(&mut self.reg, mon, params);
        kind.arrange(&mut ctx);
        let arranged = ctx.finish();

        if let Some(symbol) = arranged.symbol {
            self.reg.monitors[mon].ltsymbol = symbol;
        }
        for id in arranged.changed {
            self.configure_client(id);
        }
    }

    /// Push a client's recorded geometry to the server and tell the client about it.
    pub(crate) fn configure_client(&self, id: ClientId) {
        if let Some(c) = self.reg.get(id) {
            let r = c.geometry();
            self.conn.configure_window(c.win, &WindowChanges::geometry(&r, c.bw));
            self.conn.send_configure_notify(c.win, &r, c.bw);
        }
    }

    /**
     * Move visible clients into place and hidden ones off screen, walking the
     * focus history: visible clients top down, hidden ones bottom up.
     */
    fn show_hide(&mut self, mon: usize) {
        let stack = self.reg.monitors[mon].stack.clone();
        let arranges = self.layout_kind(mon).arranges();

        for &id in stack.iter() {
            if !self.reg.is_visible(id) {
                continue;
            }
            let (win, r, free) = match self.reg.get(id) {
                Some(c) => (c.win, c.geometry(), (c.is_floating || !arranges) && !c.is_fullscreen),
                None => continue,
            };
            self.conn.configure_window(win, &WindowChanges::position(r.x, r.y));
            if free {
                self.resize(id, r, false);
            }
        }

        for &id in stack.iter().rev() {
            if self.reg.is_visible(id) {
                continue;
            }
            if let Some(c) = self.reg.get(id) {
                self.conn.configure_window(c.win, &WindowChanges::position(-2 * c.width(), c.y));
            }
        }
    }

    /// Resize a client, subject to its size hints and the monitor bounds.
    pub(crate) fn resize(&mut self, id: ClientId, r: Rectangle, interact: bool) {
        let arranges = self.layout_kind(self.reg.get(id).map_or(self.reg.selmon, |c| c.mon)).arranges();
        let c = match self.reg.get(id) {
            Some(c) => c,
            None => return,
        };
        let m = &self.reg.monitors[c.mon];
        let bounds = Bounds {
            area: m.area,
            screen: self.screen,
            min_dim: self.bh,
        };
        let mut req = r;
        let honor = self.config.resize_hints || c.is_floating || !arranges;
        if geometry::apply_size_hints(&c.hints, &c.geometry(), c.bw, &mut req, interact, &bounds, honor) {
            self.resize_client(id, req);
        }
    }

    /// Set a client's geometry as is.
    pub(crate) fn resize_client(&mut self, id: ClientId, r: Rectangle) {
        match self.reg.get_mut(id) {
            Some(c) if !c.is_keyboard => c.set_geometry(&r),
            _ => return,
        }
        self.configure_client(id);
    }

    /**
     * Enter or leave fullscreen. Entering drops the border and covers the
     * whole monitor; leaving restores the previous geometry and floating state.
     */
    pub(crate) fn set_fullscreen(&mut self, id: ClientId, fullscreen: bool) {
        let (win, mon, is_fs) = match self.reg.get(id) {
            Some(c) => (c.win, c.mon, c.is_fullscreen),
            None => return,
        };
        if fullscreen == is_fs {
            return;
        }
        self.conn.set_fullscreen_state(win, fullscreen);

        if fullscreen {
            let screen = self.reg.monitors[mon].screen;
            if let Some(c) = self.reg.get_mut(id) {
                c.is_fullscreen = true;
                c.old_state = c.is_floating;
                c.old_bw = c.bw;
                c.bw = 0;
                c.is_floating = true;
            }
            self.resize_client(id, screen);
            self.conn.configure_window(win, &WindowChanges::stack(None, StackMode::Above));
        } else {
            let old = match self.reg.get_mut(id) {
                Some(c) => {
                    c.is_fullscreen = false;
                    c.is_floating = c.old_state;
                    c.bw = c.old_bw;
                    c.old
                }
                None => return,
            };
            self.resize_client(id, old);
            self.arrange(Some(mon));
        }
    }
}
