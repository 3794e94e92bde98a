use xcb::Window;

use crate::{geometry::SizeHints, tag::TagMask, xconnection::Rectangle};

/// Stable handle of a managed client inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub usize);

/// How a client relates to a window it swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swallow {
    None,
    /// Showing `child`'s window while our own window is kept `hidden`
    Active { child: ClientId, hidden: Window },
    /// Split back apart by the user, remembered so it can be swallowed again
    Suspended { child: ClientId },
}

impl Default for Swallow {
    fn default() -> Swallow {
        Swallow::None
    }
}

/**
 * Meta-data around a client window that we are handling.
 *
 * Primarily state flags and information used when determining which clients
 * to show for a given monitor and how they are tiled.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    /// The window currently shown for this client
    pub win: Window,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub old: Rectangle,
    pub bw: i32,
    pub old_bw: i32,
    pub hints: SizeHints,
    pub tags: TagMask,
    pub cfact: f32,
    /// Index of the owning monitor
    pub mon: usize,
    pub pid: u32,
    /// Opacity while unfocused
    pub opacity: Option<f64>,
    pub is_fixed: bool,
    pub is_floating: bool,
    pub is_urgent: bool,
    pub never_focus: bool,
    pub old_state: bool,
    pub is_fullscreen: bool,
    pub is_terminal: bool,
    pub no_swallow: bool,
    pub is_keyboard: bool,
    /// Prefers the left column in multi-column layouts
    pub is_left: bool,
    pub swallow: Swallow,
}

impl Client {
    /// Track a new client window on a specific monitor
    pub fn new(win: Window, geometry: Rectangle, bw: i32, mon: usize) -> Client {
        Client {
            win,
            name: String::new(),
            x: geometry.x,
            y: geometry.y,
            w: geometry.w,
            h: geometry.h,
            old: geometry,
            bw,
            old_bw: bw,
            hints: SizeHints::default(),
            tags: 0,
            cfact: 1.0,
            mon,
            pid: 0,
            opacity: None,
            is_fixed: false,
            is_floating: false,
            is_urgent: false,
            never_focus: false,
            old_state: false,
            is_fullscreen: false,
            is_terminal: false,
            no_swallow: false,
            is_keyboard: false,
            is_left: false,
            swallow: Swallow::None,
        }
    }

    /// Content geometry, excluding the border
    pub fn geometry(&self) -> Rectangle {
        Rectangle::new(self.x, self.y, self.w, self.h)
    }

    /// Geometry including the border on both sides
    pub fn outer(&self) -> Rectangle {
        Rectangle::new(self.x, self.y, self.width(), self.height())
    }

    pub fn width(&self) -> i32 {
        self.w + 2 * self.bw
    }

    pub fn height(&self) -> i32 {
        self.h + 2 * self.bw
    }

    /// Record a new content geometry, keeping the previous one around
    pub fn set_geometry(&mut self, r: &Rectangle) {
        self.old = self.geometry();
        self.x = r.x;
        self.y = r.y;
        self.w = r.w;
        self.h = r.h;
    }

    pub fn is_visible_on(&self, tagset: TagMask) -> bool {
        self.is_keyboard || self.tags & tagset != 0
    }

    /// Floating or fullscreen clients are left alone by layouts
    pub fn is_tiled(&self) -> bool {
        !self.is_floating && !self.is_fullscreen
    }

    pub fn swallowed_child(&self) -> Option<ClientId> {
        match self.swallow {
            Swallow::Active { child, .. } => Some(child),
            _ => None,
        }
    }
}
