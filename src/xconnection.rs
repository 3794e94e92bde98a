//! Types shared between the window manager core and the X server connection,
//! along with the [XConn] trait describing everything the core needs from it.
use anyhow::Result;

use xcb::{Atom, Window};

use crate::geometry::SizeHints;

/// Value used for timestamps in client messages.
pub const CURRENT_TIME: u32 = 0;
/// Event mask used when a client message should reach structure listeners.
pub const STRUCTURE_NOTIFY_MASK: u32 = xcb::EVENT_MASK_STRUCTURE_NOTIFY;
/// Event mask used when a client message should only reach its target.
pub const NO_EVENT_MASK: u32 = xcb::EVENT_MASK_NO_EVENT;

// X protocol error codes
const BAD_WINDOW: u8 = 3;
const BAD_MATCH: u8 = 8;
const BAD_DRAWABLE: u8 = 9;
const BAD_ACCESS: u8 = 10;

// X protocol request codes
const X_CONFIGURE_WINDOW: u8 = 12;
const X_GRAB_BUTTON: u8 = 28;
const X_GRAB_KEY: u8 = 33;
const X_SET_INPUT_FOCUS: u8 = 42;
const X_COPY_AREA: u8 = 62;
const X_POLY_SEGMENT: u8 = 66;
const X_POLY_FILL_RECTANGLE: u8 = 70;
const X_POLY_TEXT8: u8 = 74;

macro_rules! atoms {
    ( $( $name:ident ),+ ) => {
        #[allow(non_snake_case)]
        #[derive(Debug, Clone)]
        pub struct InternedAtoms {
            $(
                pub $name: Atom
            ),*
        }

        impl InternedAtoms {
            pub fn new(conn: &xcb::Connection) -> Result<InternedAtoms> {
                Ok(InternedAtoms {
                    $(
                        $name: xcb::intern_atom(conn, false, stringify!($name)).get_reply()?.atom()
                    ),*
                })
            }

            /// Build the atom table from a naming function instead of a live server.
            pub fn from_fn(mut f: impl FnMut(&str) -> Atom) -> InternedAtoms {
                InternedAtoms {
                    $(
                        $name: f(stringify!($name))
                    ),*
                }
            }
        }
    };
    // Allow trailing comma:
    ( $( $name:ident ),+ , ) => (atoms!($( $name ),+);)
}

// Intern atoms that are not built-in in the core protocol
atoms!(
    WM_PROTOCOLS,
    WM_DELETE_WINDOW,
    WM_STATE,
    WM_TAKE_FOCUS,
    UTF8_STRING,
    MANAGER,
    _NET_ACTIVE_WINDOW,
    _NET_SUPPORTED,
    _NET_WM_NAME,
    _NET_WM_STATE,
    _NET_WM_STATE_FULLSCREEN,
    _NET_WM_WINDOW_TYPE,
    _NET_WM_WINDOW_TYPE_DIALOG,
    _NET_WM_WINDOW_OPACITY,
    _NET_WM_PID,
    _NET_CLIENT_LIST,
    _NET_SYSTEM_TRAY_S0,
    _NET_SYSTEM_TRAY_OPCODE,
    _NET_SYSTEM_TRAY_ORIENTATION,
    _NET_SYSTEM_TRAY_ORIENTATION_HORZ,
    _XEMBED,
    _XEMBED_INFO,
);

impl InternedAtoms {
    /// The EWMH atoms advertised in _NET_SUPPORTED.
    pub fn supported(&self) -> Vec<Atom> {
        vec![
            self._NET_ACTIVE_WINDOW,
            self._NET_SUPPORTED,
            self._NET_WM_NAME,
            self._NET_WM_STATE,
            self._NET_WM_STATE_FULLSCREEN,
            self._NET_WM_WINDOW_TYPE,
            self._NET_WM_WINDOW_TYPE_DIALOG,
            self._NET_CLIENT_LIST,
            self._NET_SYSTEM_TRAY_OPCODE,
            self._NET_SYSTEM_TRAY_ORIENTATION,
        ]
    }
}

/// An X key-code along with a modifier mask
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct XcbKey {
    /// Modifier key bit mask
    pub mod_mask: u16,
    /// X key code
    pub code: xcb::Keycode,
}

impl XcbKey {
    pub fn new(mod_mask: u16, code: xcb::Keycode) -> XcbKey {
        XcbKey { mod_mask, code }
    }
}

/// An x,y coordinate pair
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Point {
    /// An absolute x coordinate relative to the root window
    pub x: i32,
    /// An absolute y coordinate relative to the root window
    pub y: i32,
}

impl Point {
    /// Create a new Point.
    pub fn new(x: i32, y: i32) -> Point {
        Point { x, y }
    }
}

/// An X window / screen position: top left corner + extent
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rectangle {
    /// Create a new Rectangle.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Rectangle {
        Rectangle { x, y, w, h }
    }

    /// Destructure this Rectangle into its component values (x, y, w, h).
    pub fn values(&self) -> (i32, i32, i32, i32) {
        (self.x, self.y, self.w, self.h)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }

    /// Area shared by two rectangles, zero when they do not overlap.
    pub fn intersection_area(&self, other: &Rectangle) -> i32 {
        let w = (self.x + self.w).min(other.x + other.w) - self.x.max(other.x);
        let h = (self.y + self.h).min(other.y + other.h) - self.y.max(other.y);
        w.max(0) * h.max(0)
    }

    pub fn overlaps(&self, other: &Rectangle) -> bool {
        self.intersection_area(other) > 0
    }
}

/// Z-order placement relative to a sibling (or the whole stack).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMode {
    Above,
    Below,
}

/// A partial ConfigureWindow request: only the fields that are set get sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowChanges {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub w: Option<i32>,
    pub h: Option<i32>,
    pub border_width: Option<i32>,
    pub sibling: Option<Window>,
    pub stack_mode: Option<StackMode>,
}

impl WindowChanges {
    /// Move and resize, setting the border width at the same time.
    pub fn geometry(r: &Rectangle, border_width: i32) -> WindowChanges {
        WindowChanges {
            x: Some(r.x),
            y: Some(r.y),
            w: Some(r.w),
            h: Some(r.h),
            border_width: Some(border_width),
            ..WindowChanges::default()
        }
    }

    pub fn position(x: i32, y: i32) -> WindowChanges {
        WindowChanges {
            x: Some(x),
            y: Some(y),
            ..WindowChanges::default()
        }
    }

    pub fn border(border_width: i32) -> WindowChanges {
        WindowChanges {
            border_width: Some(border_width),
            ..WindowChanges::default()
        }
    }

    pub fn stack(sibling: Option<Window>, mode: StackMode) -> WindowChanges {
        WindowChanges {
            sibling,
            stack_mode: Some(mode),
            ..WindowChanges::default()
        }
    }
}

/// The ICCCM WM_STATE values we write back to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmState {
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

impl WmState {
    pub fn from_raw(raw: u32) -> Option<WmState> {
        match raw {
            0 => Some(WmState::Withdrawn),
            1 => Some(WmState::Normal),
            3 => Some(WmState::Iconic),
            _ => None,
        }
    }
}

/// Window attributes and geometry as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowAttributes {
    pub override_redirect: bool,
    pub viewable: bool,
    pub geometry: Rectangle,
    pub border_width: i32,
}

/// The parts of WM_HINTS the window manager cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WmHints {
    pub urgent: bool,
    /// The InputHint, when the client set one
    pub input: Option<bool>,
}

/// WM_CLASS split into its two components
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassHint {
    pub instance: String,
    pub class: String,
}

/// Pointer shape to show while a pointer grab is held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    Normal,
    Move,
    Resize,
}

/**
 * Wrapper around the low level XCB event types that require casting to work with.
 * Not all event fields are extracted so check the XCB documentation and update
 * accordingly if you need access to something that isn't currently passed through
 * to the WindowManager event loop.
 *
 * https://tronche.com/gui/x/xlib/events/types.html
 */
#[derive(Debug, Clone, PartialEq)]
pub enum XEvent {
    /// xcb docs: https://www.mankier.com/3/xcb_button_press_event_t
    ButtonPress {
        id: Window,
        button: u8,
        state: u16,
        /// Absolute coordinate of the event
        rpt: Point,
        /// Coordinate of the event relative to top-left of the window itself
        wpt: Point,
    },

    ButtonRelease {
        id: Window,
    },

    MotionNotify {
        id: Window,
        rpt: Point,
        time: u32,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_key_press_event_t
    KeyPress {
        /// The X11 key code that was received along with any modifiers that were held
        code: XcbKey,
    },

    KeyRelease {
        code: XcbKey,
    },

    /// https://www.mankier.com/3/xcb_client_message_event_t
    ClientMessage {
        id: Window,
        /// The message type atom
        dtype: Atom,
        /// 32-bit formatted payload
        data: [u32; 5],
    },

    /// xcb docs: https://www.mankier.com/3/xcb_configure_request_event_t
    ConfigureRequest {
        id: Window,
        /// Only the fields present in the request's value mask are set
        changes: WindowChanges,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_configure_notify_event_t
    ConfigureNotify {
        id: Window,
        /// The new window size
        r: Rectangle,
        /// Is this window the root window?
        is_root: bool,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_destroy_notify_event_t
    DestroyNotify {
        /// The ID of the window being destroyed
        id: Window,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_enter_notify_event_t
    EnterNotify {
        id: Window,
        /// NotifyNormal crossing mode
        normal: bool,
        /// NotifyInferior crossing detail
        inferior: bool,
    },

    Expose {
        id: Window,
        count: u16,
    },

    FocusIn {
        id: Window,
    },

    MappingNotify {
        /// The keyboard mapping (rather than modifiers or pointer) changed
        keyboard: bool,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_map_request_event_t
    MapRequest {
        /// The ID of the window that wants to be mapped
        id: Window,
        /// Whether or not the WindowManager should handle this window.
        ignore: bool,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_property_notify_event_t
    PropertyNotify {
        /// The ID of the window that had a property changed
        id: Window,
        /// The property that changed
        atom: Atom,
        /// Is this window the root window?
        is_root: bool,
        /// The property was deleted rather than changed
        deleted: bool,
    },

    ResizeRequest {
        id: Window,
        w: i32,
        h: i32,
    },

    UnmapNotify {
        id: Window,
        /// Generated by a SendEvent request rather than the server
        synthetic: bool,
    },

    /// An asynchronous protocol error
    Error {
        request: u8,
        code: u8,
        resource: u32,
    },
}

/// Errors caused by racing against clients that go away under us.
pub fn is_ignorable_error(request: u8, code: u8) -> bool {
    code == BAD_WINDOW
        || (code == BAD_MATCH && (request == X_SET_INPUT_FOCUS || request == X_CONFIGURE_WINDOW))
        || (code == BAD_DRAWABLE
            && (request == X_POLY_TEXT8
                || request == X_POLY_FILL_RECTANGLE
                || request == X_POLY_SEGMENT
                || request == X_COPY_AREA))
        || (code == BAD_ACCESS && (request == X_GRAB_BUTTON || request == X_GRAB_KEY))
}

/**
 * Everything the window manager needs from the X server.
 *
 * Requests are fire-and-forget: anything that can fail because a client went
 * away returns a default (`None`, `false`, an empty Vec) instead of an error.
 */
pub trait XConn {
    /// Claim SubstructureRedirect on the root window, failing if another WM holds it
    fn register_wm(&self) -> Result<()>;
    fn root(&self) -> Window;
    fn atoms(&self) -> &InternedAtoms;
    /// Size of the whole X screen in pixels
    fn screen_size(&self) -> (i32, i32);
    fn flush(&self) -> bool;
    /// Block until the next event arrives
    fn wait_for_event(&self) -> Option<XEvent>;
    /// Return an already queued event, if any, without blocking
    fn poll_for_event(&self) -> Option<XEvent>;
    /// Geometry of every active output
    fn current_outputs(&self) -> Vec<Rectangle>;

    fn query_tree(&self) -> Vec<Window>;
    fn window_attributes(&self, win: Window) -> Option<WindowAttributes>;
    fn wm_state(&self, win: Window) -> Option<WmState>;
    fn transient_for(&self, win: Window) -> Option<Window>;
    fn wm_class(&self, win: Window) -> Option<ClassHint>;
    fn text_property(&self, win: Window, atom: Atom) -> Option<String>;
    fn size_hints(&self, win: Window) -> Option<SizeHints>;
    fn wm_hints(&self, win: Window) -> Option<WmHints>;
    fn set_urgency_hint(&self, win: Window, urgent: bool);
    /// _NET_WM_PID, or 0 when unknown
    fn window_pid(&self, win: Window) -> u32;
    fn atom_property(&self, win: Window, prop: Atom) -> Option<Atom>;
    /// The flags word of _XEMBED_INFO
    fn xembed_flags(&self, win: Window) -> Option<u32>;
    fn supports_protocol(&self, win: Window, protocol: Atom) -> bool;

    fn configure_window(&self, win: Window, changes: &WindowChanges);
    /// Tell a client its geometry without actually changing it
    fn send_configure_notify(&self, win: Window, r: &Rectangle, border_width: i32);
    fn send_client_message(&self, win: Window, dtype: Atom, data: [u32; 5], mask: u32);
    fn set_border_color(&self, win: Window, color: u32);
    fn map_window(&self, win: Window);
    fn unmap_window(&self, win: Window);
    /// Give input focus to a window and mark it as _NET_ACTIVE_WINDOW
    fn set_input_focus(&self, win: Window);
    /// Return focus to the root window and clear _NET_ACTIVE_WINDOW
    fn focus_root(&self);
    fn set_wm_state(&self, win: Window, state: WmState);
    fn set_opacity(&self, win: Window, opacity: f64);
    fn set_fullscreen_state(&self, win: Window, fullscreen: bool);
    fn set_client_list(&self, wins: &[Window]);
    fn set_supported(&self, atoms: &[Atom]);
    fn set_cardinal_property(&self, win: Window, prop: Atom, value: u32);
    fn select_client_events(&self, win: Window);
    fn select_tray_icon_events(&self, win: Window);

    fn numlock_mask(&self) -> u16;
    fn grab_keys(&self, keys: &[XcbKey], numlock: u16);
    /// Grab `buttons` (button, modifiers) on a client, plus every button when unfocused
    fn grab_buttons(&self, win: Window, buttons: &[(u8, u16)], numlock: u16, focused: bool);
    fn grab_pointer(&self, cursor: CursorKind) -> bool;
    fn ungrab_pointer(&self);
    fn query_pointer(&self) -> Option<Point>;
    fn warp_pointer(&self, win: Window, x: i32, y: i32);

    /// Close a window politely through WM_DELETE_WINDOW, or kill its client
    fn signal_delete_window(&self, win: Window);
    fn create_bar_window(&self, r: &Rectangle) -> Window;
    fn create_tray_window(&self, r: &Rectangle, background: u32) -> Window;
    fn destroy_window(&self, win: Window);
    fn reparent_window(&self, win: Window, parent: Window, x: i32, y: i32);
    fn add_to_save_set(&self, win: Window);
    fn set_background(&self, win: Window, pixel: u32);
    /// Take ownership of a selection, returning whether we really own it afterwards
    fn claim_selection(&self, owner: Window, selection: Atom) -> bool;

    /// Release grabs and focus on shutdown
    fn cleanup(&self);
}
