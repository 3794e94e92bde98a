//! The freedesktop system tray: docking icons through XEMBED and laying them out.
use xcb::Window;

use crate::{
    geometry::SizeHints,
    xconnection::{Rectangle, StackMode, WindowChanges, WmState, XConn, CURRENT_TIME, STRUCTURE_NOTIFY_MASK},
};

/// _NET_SYSTEM_TRAY_OPCODE request to dock an icon
pub const SYSTEM_TRAY_REQUEST_DOCK: u32 = 0;

// XEMBED messages
pub const XEMBED_EMBEDDED_NOTIFY: u32 = 0;
pub const XEMBED_WINDOW_ACTIVATE: u32 = 1;
pub const XEMBED_WINDOW_DEACTIVATE: u32 = 2;
pub const XEMBED_FOCUS_IN: u32 = 4;
pub const XEMBED_MODALITY_ON: u32 = 10;

/// _XEMBED_INFO flag asking for the icon to be shown
pub const XEMBED_MAPPED: u32 = 1 << 0;
pub const XEMBED_EMBEDDED_VERSION: u32 = 0;

/// A docked icon window
#[derive(Debug, Clone, PartialEq)]
pub struct TrayIcon {
    pub win: Window,
    pub x: i32,
    pub w: i32,
    pub h: i32,
    pub hints: SizeHints,
    pub mapped: bool,
}

/**
 * Size of an icon inside a bar of height `bh`: as tall as the bar, keeping
 * the aspect ratio, squeezed back down if its size hints refuse that.
 */
pub fn icon_geometry(w: i32, h: i32, bh: i32, hints: &SizeHints) -> (i32, i32) {
    let iw = if w == h || h <= 0 {
        bh
    } else if h == bh {
        w
    } else {
        (bh as f32 * (w as f32 / h as f32)) as i32
    };
    let (mut iw, mut ih) = hints.constrain(iw.max(1), bh);

    if ih > bh {
        iw = if iw == ih {
            bh
        } else {
            (bh as f32 * (iw as f32 / ih as f32)) as i32
        };
        ih = bh;
    }
    (iw.max(1), ih.max(1))
}

/// Which monitor shows the tray: the selected one, or a pinned index with a fallback.
pub fn systray_to_mon(num_monitors: usize, selmon: usize, pinning: usize, fail_first: bool) -> usize {
    if pinning == 0 || num_monitors == 0 {
        return selmon;
    }
    if num_monitors < pinning {
        if fail_first {
            0
        } else {
            num_monitors - 1
        }
    } else {
        pinning - 1
    }
}

#[derive(Debug)]
pub struct Systray {
    pub win: Window,
    /// Most recently docked first
    pub icons: Vec<TrayIcon>,
    spacing: i32,
}

impl Systray {
    /**
     * Create the tray window and take the _NET_SYSTEM_TRAY_S0 selection.
     *
     * Returns None when another tray already owns the selection; the caller
     * runs without a tray for the rest of the session.
     */
    pub fn new<X: XConn>(conn: &X, r: &Rectangle, background: u32, spacing: i32) -> Option<Systray> {
        let atoms = conn.atoms();
        let win = conn.create_tray_window(r, background);
        conn.set_cardinal_property(
            win,
            atoms._NET_SYSTEM_TRAY_ORIENTATION,
            atoms._NET_SYSTEM_TRAY_ORIENTATION_HORZ,
        );
        if !conn.claim_selection(win, atoms._NET_SYSTEM_TRAY_S0) {
            warn!("unable to obtain system tray");
            conn.destroy_window(win);
            return None;
        }
        conn.send_client_message(
            conn.root(),
            atoms.MANAGER,
            [CURRENT_TIME, atoms._NET_SYSTEM_TRAY_S0, win, 0, 0],
            STRUCTURE_NOTIFY_MASK,
        );
        info!("system tray created as window {}", win);

        Some(Systray {
            win,
            icons: Vec::new(),
            spacing,
        })
    }

    pub fn find(&self, win: Window) -> Option<usize> {
        self.icons.iter().position(|i| i.win == win)
    }

    /// Width of the tray window: spacing around every shown icon, 1 when empty
    pub fn width(&self) -> i32 {
        let w: i32 = self.icons.iter().filter(|i| i.mapped).map(|i| i.w + self.spacing).sum();
        if w > 0 {
            w + self.spacing
        } else {
            1
        }
    }

    pub fn send_xembed<X: XConn>(&self, conn: &X, icon: Window, message: u32) {
        conn.send_client_message(
            icon,
            conn.atoms()._XEMBED,
            [CURRENT_TIME, message, 0, self.win, XEMBED_EMBEDDED_VERSION],
            STRUCTURE_NOTIFY_MASK,
        );
    }

    /// Embed a window that asked to dock. Windows that are gone or already docked are ignored.
    pub fn dock<X: XConn>(&mut self, conn: &X, icon: Window, bh: i32, background: u32) -> bool {
        if icon == 0 || self.find(icon).is_some() {
            return false;
        }
        let attrs = match conn.window_attributes(icon) {
            Some(a) => a,
            None => return false,
        };
        let hints = conn.size_hints(icon).unwrap_or_default();
        let (w, h) = icon_geometry(attrs.geometry.w, attrs.geometry.h, bh, &hints);
        debug!("docking tray icon {} at {}x{}", icon, w, h);

        conn.add_to_save_set(icon);
        conn.select_tray_icon_events(icon);
        conn.reparent_window(icon, self.win, 0, 0);
        conn.set_background(icon, background);
        for &msg in [
            XEMBED_EMBEDDED_NOTIFY,
            XEMBED_FOCUS_IN,
            XEMBED_WINDOW_ACTIVATE,
            XEMBED_MODALITY_ON,
        ]
        .iter()
        {
            self.send_xembed(conn, icon, msg);
        }
        self.icons.insert(
            0,
            TrayIcon {
                win: icon,
                x: 0,
                w,
                h,
                hints,
                mapped: true,
            },
        );
        conn.set_wm_state(icon, WmState::Normal);
        true
    }

    pub fn remove(&mut self, win: Window) -> bool {
        let before = self.icons.len();
        self.icons.retain(|i| i.win != win);
        self.icons.len() != before
    }

    /// Recompute an icon's size after it asked for a new one or changed its hints.
    pub fn resize_icon(&mut self, win: Window, w: i32, h: i32, bh: i32, hints: Option<SizeHints>) -> bool {
        match self.icons.iter_mut().find(|i| i.win == win) {
            Some(icon) => {
                if let Some(hints) = hints {
                    icon.hints = hints;
                }
                let (w, h) = icon_geometry(w, h, bh, &icon.hints);
                icon.w = w;
                icon.h = h;
                true
            }
            None => false,
        }
    }

    /// Show or hide an icon following the mapped flag of its _XEMBED_INFO.
    pub fn update_icon_state<X: XConn>(&mut self, conn: &X, win: Window) -> bool {
        let idx = match self.find(win) {
            Some(i) => i,
            None => return false,
        };
        let flags = match conn.xembed_flags(win) {
            Some(f) => f,
            None => return false,
        };
        let wants_map = flags & XEMBED_MAPPED != 0;
        if wants_map == self.icons[idx].mapped {
            return false;
        }

        self.icons[idx].mapped = wants_map;
        let code = if wants_map {
            conn.map_window(win);
            conn.set_wm_state(win, WmState::Normal);
            XEMBED_WINDOW_ACTIVATE
        } else {
            conn.unmap_window(win);
            conn.set_wm_state(win, WmState::Iconic);
            XEMBED_WINDOW_DEACTIVATE
        };
        self.send_xembed(conn, win, code);
        true
    }

    /**
     * Place the icons left to right and move the tray window to the right end
     * of the bar row at `bar_y` on `screen`, just above the bar window.
     */
    pub fn layout<X: XConn>(&mut self, conn: &X, screen: &Rectangle, bar_y: i32, bh: i32, barwin: Window) {
        let mut x = 0;
        for icon in self.icons.iter_mut().filter(|i| i.mapped) {
            x += self.spacing;
            icon.x = x;
            conn.configure_window(icon.win, &WindowChanges::geometry(&Rectangle::new(x, 0, icon.w, icon.h), 0));
            conn.map_window(icon.win);
            x += icon.w;
        }

        let w = self.width();
        let r = Rectangle::new(screen.x + screen.w - w, bar_y, w, bh);
        let mut changes = WindowChanges::geometry(&r, 0);
        if barwin != 0 {
            changes.sibling = Some(barwin);
            changes.stack_mode = Some(StackMode::Above);
        }
        conn.configure_window(self.win, &changes);
        conn.map_window(self.win);
    }
}
