//! Moving and resizing floating clients with the pointer.
use std::collections::VecDeque;

use crate::{
    bar::Draw,
    client::ClientId,
    wm::WindowManager,
    xconnection::{CursorKind, Point, Rectangle, XConn, XEvent},
};

/// Minimum time between two handled motion events, in milliseconds
const MOTION_INTERVAL: u32 = 1000 / 60;

/// What a pointer drag does with the pointer position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    Move,
    Resize,
}

impl<'a, X: XConn + Draw> WindowManager<'a, X> {
    pub(crate) fn move_mouse(&mut self) {
        self.drag(Drag::Move);
    }

    pub(crate) fn resize_mouse(&mut self) {
        self.drag(Drag::Resize);
    }

    /// The client a drag applies to: the selection, unless it is fullscreen.
    fn drag_target(&self) -> Option<ClientId> {
        let sel = self.reg.sel()?;
        match self.reg.get(sel) {
            Some(c) if !c.is_fullscreen => Some(sel),
            _ => None,
        }
    }

    /**
     * Run a pointer grab until the button is released.
     *
     * Requests that must not wait (configure, expose and map) are handled
     * while dragging, everything else is queued for the main loop. When the
     * client ends up on another monitor it is sent there.
     */
    fn drag(&mut self, kind: Drag) {
        let id = match self.drag_target() {
            Some(id) => id,
            None => return,
        };
        self.restack(self.reg.selmon, false);

        let cursor = match kind {
            Drag::Move => CursorKind::Move,
            Drag::Resize => CursorKind::Resize,
        };
        if !self.conn.grab_pointer(cursor) {
            debug!("unable to grab the pointer");
            return;
        }
        let origin = match self.reg.get(id) {
            Some(c) => Point::new(c.x, c.y),
            None => return,
        };
        let start = match kind {
            Drag::Move => match self.conn.query_pointer() {
                Some(p) => p,
                None => {
                    self.conn.ungrab_pointer();
                    return;
                }
            },
            Drag::Resize => {
                self.warp_to_corner(id);
                origin
            }
        };

        // restacking may already have pulled our motion events off the connection
        let mut pending = std::mem::take(&mut self.deferred);
        let mut postponed = VecDeque::new();
        let mut last_time = 0;
        loop {
            let event = match pending.pop_front().or_else(|| self.conn.wait_for_event()) {
                Some(e) => e,
                None => break,
            };
            match event {
                XEvent::ConfigureRequest { .. } | XEvent::Expose { .. } | XEvent::MapRequest { .. } => {
                    self.handle_event(event);
                    // a nested restack drains the connection, release included
                    pending.extend(self.deferred.drain(..));
                }
                XEvent::MotionNotify { rpt, time, .. } => {
                    if time.wrapping_sub(last_time) <= MOTION_INTERVAL {
                        continue;
                    }
                    last_time = time;
                    match kind {
                        Drag::Move => self.drag_move(id, origin, start, rpt),
                        Drag::Resize => self.drag_resize(id, origin, rpt),
                    }
                    self.conn.flush();
                    pending.extend(self.deferred.drain(..));
                }
                XEvent::ButtonRelease { .. } => break,
                other => postponed.push_back(other),
            }
        }

        if kind == Drag::Resize {
            self.warp_to_corner(id);
        }
        self.conn.ungrab_pointer();
        self.combo = false;
        postponed.extend(pending);
        postponed.extend(self.deferred.drain(..));
        self.deferred = postponed;
        self.drop_enter_events();

        if let Some(mon) = self.client_mon(id) {
            if mon != self.reg.selmon {
                self.send_mon(id, mon);
                self.reg.selmon = mon;
                self.focus(None);
            }
        }
    }

    fn drag_move(&mut self, id: ClientId, origin: Point, start: Point, p: Point) {
        let (w, h, x, y, floating) = match self.reg.get(id) {
            Some(c) => (c.width(), c.height(), c.x, c.y, c.is_floating),
            None => return,
        };
        let area = self.reg.selmon().area;
        let snap = self.config.snap;
        let mut nx = origin.x + (p.x - start.x);
        let mut ny = origin.y + (p.y - start.y);

        if (area.x - nx).abs() < snap {
            nx = area.x;
        } else if ((area.x + area.w) - (nx + w)).abs() < snap {
            nx = area.x + area.w - w;
        }
        if (area.y - ny).abs() < snap {
            ny = area.y;
        } else if ((area.y + area.h) - (ny + h)).abs() < snap {
            ny = area.y + area.h - h;
        }

        let arranges = self.layout_kind(self.reg.selmon).arranges();
        if !floating && arranges && ((nx - x).abs() > snap || (ny - y).abs() > snap) {
            self.toggle_floating();
        }
        let floating = self.reg.get(id).map_or(false, |c| c.is_floating);
        if !arranges || floating {
            if let Some(c) = self.reg.get(id) {
                let r = Rectangle::new(nx, ny, c.w, c.h);
                self.resize(id, r, true);
            }
        }
    }

    fn drag_resize(&mut self, id: ClientId, origin: Point, p: Point) {
        let (bw, w, h, floating, cmon) = match self.reg.get(id) {
            Some(c) => (c.bw, c.w, c.h, c.is_floating, c.mon),
            None => return,
        };
        let nw = (p.x - origin.x - 2 * bw + 1).max(1);
        let nh = (p.y - origin.y - 2 * bw + 1).max(1);
        let snap = self.config.snap;
        let arranges = self.layout_kind(self.reg.selmon).arranges();

        let base = self.reg.monitors[cmon].area;
        let sel = self.reg.selmon().area;
        let inside = base.x + nw >= sel.x
            && base.x + nw <= sel.x + sel.w
            && base.y + nh >= sel.y
            && base.y + nh <= sel.y + sel.h;
        if inside && !floating && arranges && ((nw - w).abs() > snap || (nh - h).abs() > snap) {
            self.toggle_floating();
        }
        let floating = self.reg.get(id).map_or(false, |c| c.is_floating);
        if !arranges || floating {
            if let Some(c) = self.reg.get(id) {
                let r = Rectangle::new(c.x, c.y, nw, nh);
                self.resize(id, r, true);
            }
        }
    }

    fn warp_to_corner(&self, id: ClientId) {
        if let Some(c) = self.reg.get(id) {
            self.conn.warp_pointer(c.win, c.w + c.bw - 1, c.h + c.bw - 1);
        }
    }

    /// Crossing events caused by the drag itself would steal focus.
    fn drop_enter_events(&mut self) {
        self.conn.flush();
        while let Some(event) = self.conn.poll_for_event() {
            match event {
                XEvent::EnterNotify { .. } => (),
                other => self.deferred.push_back(other),
            }
        }
    }
}

