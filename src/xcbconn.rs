//! The [XConn] and [Draw] implementation talking to a real X server through xcb.
use std::cell::Cell;

use anyhow::{anyhow, Context, Result};

use xcb::{randr, xinerama, Atom, Window};
use xcb_util::{ewmh, icccm, keysyms::KeySymbols};

use crate::{
    bar::{BarContent, Draw, SegmentKind, Tab},
    config::ColorScheme,
    geometry::SizeHints,
    xconnection::{
        ClassHint, CursorKind, InternedAtoms, Point, Rectangle, StackMode, WindowAttributes,
        WindowChanges, WmHints, WmState, XConn, XEvent, XcbKey,
    },
};

// Mask out the most significant bit, which indicates if it's a send_event
const XCB_RESPONSE_TYPE_MASK: u8 = 0x7F;
const SEND_EVENT_BIT: u8 = 0x80;
const GRAB_MODE_ASYNC: u8 = xcb::GRAB_MODE_ASYNC as u8;
const ROOT_EVENT_MASK: u32 = xcb::EVENT_MASK_SUBSTRUCTURE_REDIRECT
    | xcb::EVENT_MASK_SUBSTRUCTURE_NOTIFY
    | xcb::EVENT_MASK_BUTTON_PRESS
    | xcb::EVENT_MASK_POINTER_MOTION
    | xcb::EVENT_MASK_ENTER_WINDOW
    | xcb::EVENT_MASK_LEAVE_WINDOW
    | xcb::EVENT_MASK_STRUCTURE_NOTIFY
    | xcb::EVENT_MASK_PROPERTY_CHANGE;
const CLIENT_EVENT_MASK: u32 = xcb::EVENT_MASK_ENTER_WINDOW
    | xcb::EVENT_MASK_FOCUS_CHANGE
    | xcb::EVENT_MASK_PROPERTY_CHANGE
    | xcb::EVENT_MASK_STRUCTURE_NOTIFY;
const TRAY_ICON_EVENT_MASK: u32 =
    xcb::EVENT_MASK_STRUCTURE_NOTIFY | xcb::EVENT_MASK_PROPERTY_CHANGE | xcb::EVENT_MASK_RESIZE_REDIRECT;
const BAR_EVENT_MASK: u32 = xcb::EVENT_MASK_BUTTON_PRESS | xcb::EVENT_MASK_EXPOSURE;
const BUTTON_MASK: u16 = (xcb::EVENT_MASK_BUTTON_PRESS | xcb::EVENT_MASK_BUTTON_RELEASE) as u16;
const DRAG_MASK: u16 = BUTTON_MASK | xcb::EVENT_MASK_POINTER_MOTION as u16;
const INPUT_FOCUS_POINTER_ROOT: u8 = xcb::INPUT_FOCUS_POINTER_ROOT as u8;
const PROP_MODE_REPLACE: u8 = xcb::PROP_MODE_REPLACE as u8;

const CONFIG_WINDOW_X: u16 = xcb::CONFIG_WINDOW_X as u16;
const CONFIG_WINDOW_Y: u16 = xcb::CONFIG_WINDOW_Y as u16;
const CONFIG_WINDOW_WIDTH: u16 = xcb::CONFIG_WINDOW_WIDTH as u16;
const CONFIG_WINDOW_HEIGHT: u16 = xcb::CONFIG_WINDOW_HEIGHT as u16;
const CONFIG_WINDOW_BORDER_WIDTH: u16 = xcb::CONFIG_WINDOW_BORDER_WIDTH as u16;
const CONFIG_WINDOW_SIBLING: u16 = xcb::CONFIG_WINDOW_SIBLING as u16;
const CONFIG_WINDOW_STACK_MODE: u16 = xcb::CONFIG_WINDOW_STACK_MODE as u16;

// ICCCM WM_HINTS flags
const INPUT_HINT: u32 = 1;
const URGENCY_HINT: u32 = 1 << 8;
const WM_HINTS_WORDS: u32 = 9;
const WM_SIZE_HINTS_WORDS: u32 = 18;

const XK_NUM_LOCK: u32 = 0xff7f;

// Glyphs of the standard cursor font
const XC_LEFT_PTR: u16 = 68;
const XC_FLEUR: u16 = 52;
const XC_SIZING: u16 = 120;

/// A loaded core font and the metrics needed to measure text without a round trip
struct Font {
    id: xcb::Font,
    ascent: i32,
    descent: i32,
    min_char: u16,
    widths: Vec<i32>,
    default_width: i32,
}

impl Font {
    fn open(conn: &xcb::Connection, names: &[String]) -> Result<Font> {
        let fallback = ["fixed".to_string()];
        for name in names.iter().chain(fallback.iter()) {
            let id = conn.generate_id();
            if xcb::open_font_checked(conn, id, name).request_check().is_err() {
                warn!("unable to load font '{}'", name);
                continue;
            }
            let reply = match xcb::query_font(conn, id).get_reply() {
                Ok(r) => r,
                Err(_) => {
                    xcb::close_font(conn, id);
                    continue;
                }
            };
            debug!("loaded font '{}'", name);
            return Ok(Font {
                id,
                ascent: reply.font_ascent() as i32,
                descent: reply.font_descent() as i32,
                min_char: reply.min_char_or_byte2(),
                widths: reply.char_infos().map(|ci| ci.character_width() as i32).collect(),
                default_width: reply.max_bounds().character_width() as i32,
            });
        }
        Err(anyhow!("no usable font in {:?}", names))
    }

    fn height(&self) -> i32 {
        self.ascent + self.descent
    }

    fn char_width(&self, c: char) -> i32 {
        (c as u32)
            .checked_sub(self.min_char as u32)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|&w| w > 0)
            .unwrap_or(self.default_width)
    }

    fn width(&self, text: &str) -> i32 {
        text.chars().map(|c| self.char_width(c)).sum()
    }
}

/// Core fonts only speak Latin-1; anything else is drawn as '?'.
fn latin1(text: &str) -> String {
    text.chars().map(|c| if (c as u32) < 0x100 { c } else { '?' }).collect()
}

/// Handles communication with an X server via xcb
pub struct XcbConnection {
    conn: ewmh::Connection,
    preferred_screen: i32,
    root: Window,
    root_visual: xcb::Visualid,
    depth: u8,
    screen_size: (i32, i32),
    atoms: InternedAtoms,
    check_win: Cell<Window>,
    font: Font,
    gc: xcb::Gcontext,
    cursors: [xcb::Cursor; 3],
    normal: ColorScheme,
    selected: ColorScheme,
}

impl XcbConnection {
    /// Connect to the display named by $DISPLAY and load the drawing resources.
    pub fn new(fonts: &[String], normal: ColorScheme, selected: ColorScheme) -> Result<XcbConnection> {
        let (conn, preferred_screen) =
            xcb::Connection::connect(None).context("Unable to connect to the X server")?;
        let conn = ewmh::Connection::connect(conn).map_err(|(e, _)| e)?;

        let (root, root_visual, depth, screen_size) = {
            let screen = conn
                .get_setup()
                .roots()
                .nth(preferred_screen as usize)
                .context("Unable to get the root window of the preferred screen")?;
            (
                screen.root(),
                screen.root_visual(),
                screen.root_depth(),
                (screen.width_in_pixels() as i32, screen.height_in_pixels() as i32),
            )
        };

        let atoms = InternedAtoms::new(&conn).context("Failed to intern atoms")?;
        let font = Font::open(&conn, fonts)?;

        let gc = conn.generate_id();
        xcb::create_gc(
            &conn,
            gc,
            root,
            &[
                (xcb::GC_FOREGROUND, normal.fg),
                (xcb::GC_BACKGROUND, normal.bg),
                (xcb::GC_LINE_WIDTH, 1),
                (xcb::GC_FONT, font.id),
            ],
        );

        let cursor_font = conn.generate_id();
        xcb::open_font(&conn, cursor_font, "cursor");
        let mut cursors = [0; 3];
        for (cursor, glyph) in cursors.iter_mut().zip([XC_LEFT_PTR, XC_FLEUR, XC_SIZING].iter()) {
            *cursor = conn.generate_id();
            // xcb docs: https://www.mankier.com/3/xcb_create_glyph_cursor
            xcb::create_glyph_cursor(
                &conn,
                *cursor,
                cursor_font,
                cursor_font,
                *glyph,
                *glyph + 1,
                0,
                0,
                0,
                0xffff,
                0xffff,
                0xffff,
            );
        }
        xcb::close_font(&conn, cursor_font);

        Ok(XcbConnection {
            conn,
            preferred_screen,
            root,
            root_visual,
            depth,
            screen_size,
            atoms,
            check_win: Cell::new(xcb::NONE),
            font,
            gc,
            cursors,
            normal,
            selected,
        })
    }

    fn cursor(&self, kind: CursorKind) -> xcb::Cursor {
        match kind {
            CursorKind::Normal => self.cursors[0],
            CursorKind::Move => self.cursors[1],
            CursorKind::Resize => self.cursors[2],
        }
    }

    /// Raw 32 bit values of a window property, None when it is unset.
    fn property_u32s(&self, win: Window, prop: Atom, type_: Atom, len: u32) -> Option<Vec<u32>> {
        // xcb docs: https://www.mankier.com/3/xcb_get_property
        let reply = xcb::get_property(&self.conn, false, win, prop, type_, 0, len)
            .get_reply()
            .ok()?;
        if reply.value_len() == 0 || reply.format() != 32 {
            None
        } else {
            Some(reply.value::<u32>().to_vec())
        }
    }

    fn first_u32(&self, win: Window, prop: Atom, type_: Atom) -> Option<u32> {
        self.property_u32s(win, prop, type_, 1)
            .and_then(|v| v.first().copied())
    }

    fn change_u32s(&self, win: Window, prop: Atom, type_: Atom, data: &[u32]) {
        xcb::change_property(&self.conn, PROP_MODE_REPLACE, win, prop, type_, 32, data);
    }

    fn set_event_mask(&self, win: Window, mask: u32) {
        xcb::change_window_attributes(&self.conn, win, &[(xcb::CW_EVENT_MASK, mask)]);
    }

    fn wm_protocols(&self, win: Window) -> Vec<Atom> {
        icccm::get_wm_protocols(&self.conn, win, self.atoms.WM_PROTOCOLS)
            .get_reply()
            .map(|r| r.atoms().to_vec())
            .unwrap_or_default()
    }

    /// The modifier combinations a binding must be grabbed with so lock keys don't break it.
    fn lock_variants(numlock: u16) -> [u16; 4] {
        let lock = xcb::MOD_MASK_LOCK as u16;
        [0, lock, numlock, numlock | lock]
    }

    fn set_foreground(&self, color: u32) {
        xcb::change_gc(&self.conn, self.gc, &[(xcb::GC_FOREGROUND, color)]);
    }

    fn fill(&self, drawable: xcb::Drawable, color: u32, x: i32, y: i32, w: i32, h: i32, filled: bool) {
        self.set_foreground(color);
        let r = xcb::Rectangle::new(x as i16, y as i16, w.max(0) as u16, h.max(0) as u16);
        if filled {
            xcb::poly_fill_rectangle(&self.conn, drawable, self.gc, &[r]);
        } else {
            xcb::poly_rectangle(&self.conn, drawable, self.gc, &[r]);
        }
    }

    /// Fill a cell and draw `text` left aligned inside it, cut to fit.
    fn text_cell(&self, drawable: xcb::Drawable, scheme: (u32, u32), x: i32, w: i32, h: i32, text: &str) {
        let (fg, bg) = scheme;
        self.fill(drawable, bg, x, 0, w, h, true);
        let pad = self.font.height() / 2;
        let room = w - 2 * pad;
        if room <= 0 || text.is_empty() {
            return;
        }
        let mut text = latin1(text);
        while !text.is_empty() && self.font.width(&text) > room {
            text.pop();
        }
        text.truncate(255);
        if text.is_empty() {
            return;
        }
        let y = (h - self.font.height()) / 2 + self.font.ascent;
        xcb::change_gc(
            &self.conn,
            self.gc,
            &[(xcb::GC_FOREGROUND, fg), (xcb::GC_BACKGROUND, bg)],
        );
        xcb::image_text_8(&self.conn, drawable, self.gc, (x + pad) as i16, y as i16, &text);
    }

    /// Draw into an off screen pixmap and copy it over in one go.
    fn with_pixmap(&self, win: Window, w: i32, h: i32, draw: impl FnOnce(xcb::Pixmap)) {
        if w <= 0 || h <= 0 {
            return;
        }
        let pixmap = self.conn.generate_id();
        xcb::create_pixmap(&self.conn, self.depth, pixmap, win, w as u16, h as u16);
        draw(pixmap);
        xcb::copy_area(&self.conn, pixmap, win, self.gc, 0, 0, 0, 0, w as u16, h as u16);
        xcb::free_pixmap(&self.conn, pixmap);
        self.conn.flush();
    }

    fn translate(&self, event: xcb::GenericEvent) -> Option<XEvent> {
        let raw_type = event.response_type();
        let etype = raw_type & XCB_RESPONSE_TYPE_MASK;

        match etype {
            0 => {
                let e: &xcb::GenericError = unsafe { xcb::cast_event(&event) };
                let (request, code, resource) =
                    unsafe { ((*e.ptr).major_code, (*e.ptr).error_code, (*e.ptr).resource_id) };
                Some(XEvent::Error {
                    request,
                    code,
                    resource,
                })
            }

            xcb::BUTTON_PRESS => {
                let e: &xcb::ButtonPressEvent = unsafe { xcb::cast_event(&event) };
                // buttons grabbed on unfocused clients are replayed to them
                xcb::allow_events(&self.conn, xcb::ALLOW_REPLAY_POINTER as u8, xcb::CURRENT_TIME);
                Some(XEvent::ButtonPress {
                    id: e.event(),
                    button: e.detail(),
                    state: e.state(),
                    rpt: Point::new(e.root_x() as i32, e.root_y() as i32),
                    wpt: Point::new(e.event_x() as i32, e.event_y() as i32),
                })
            }

            xcb::BUTTON_RELEASE => {
                let e: &xcb::ButtonReleaseEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::ButtonRelease { id: e.event() })
            }

            xcb::MOTION_NOTIFY => {
                let e: &xcb::MotionNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::MotionNotify {
                    id: e.event(),
                    rpt: Point::new(e.root_x() as i32, e.root_y() as i32),
                    time: e.time(),
                })
            }

            xcb::KEY_PRESS => {
                let e: &xcb::KeyPressEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::KeyPress {
                    code: XcbKey::new(e.state(), e.detail()),
                })
            }

            xcb::KEY_RELEASE => {
                let e: &xcb::KeyReleaseEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::KeyRelease {
                    code: XcbKey::new(e.state(), e.detail()),
                })
            }

            xcb::CLIENT_MESSAGE => {
                let e: &xcb::ClientMessageEvent = unsafe { xcb::cast_event(&event) };
                let mut data = [0; 5];
                if e.format() == 32 {
                    data.copy_from_slice(&e.data().data32()[..5]);
                }
                Some(XEvent::ClientMessage {
                    id: e.window(),
                    dtype: e.type_(),
                    data,
                })
            }

            xcb::CONFIGURE_REQUEST => {
                let e: &xcb::ConfigureRequestEvent = unsafe { xcb::cast_event(&event) };
                let mask = e.value_mask();
                let has = |bit: u16| mask & bit != 0;
                let changes = WindowChanges {
                    x: if has(CONFIG_WINDOW_X) { Some(e.x() as i32) } else { None },
                    y: if has(CONFIG_WINDOW_Y) { Some(e.y() as i32) } else { None },
                    w: if has(CONFIG_WINDOW_WIDTH) { Some(e.width() as i32) } else { None },
                    h: if has(CONFIG_WINDOW_HEIGHT) { Some(e.height() as i32) } else { None },
                    border_width: if has(CONFIG_WINDOW_BORDER_WIDTH) {
                        Some(e.border_width() as i32)
                    } else {
                        None
                    },
                    sibling: if has(CONFIG_WINDOW_SIBLING) { Some(e.sibling()) } else { None },
                    stack_mode: if has(CONFIG_WINDOW_STACK_MODE) {
                        match e.stack_mode() as u32 {
                            xcb::STACK_MODE_ABOVE => Some(StackMode::Above),
                            xcb::STACK_MODE_BELOW => Some(StackMode::Below),
                            _ => None,
                        }
                    } else {
                        None
                    },
                };
                Some(XEvent::ConfigureRequest {
                    id: e.window(),
                    changes,
                })
            }

            xcb::CONFIGURE_NOTIFY => {
                let e: &xcb::ConfigureNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::ConfigureNotify {
                    id: e.window(),
                    r: Rectangle::new(e.x() as i32, e.y() as i32, e.width() as i32, e.height() as i32),
                    is_root: e.window() == self.root,
                })
            }

            xcb::DESTROY_NOTIFY => {
                let e: &xcb::DestroyNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::DestroyNotify { id: e.window() })
            }

            xcb::ENTER_NOTIFY => {
                let e: &xcb::EnterNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::EnterNotify {
                    id: e.event(),
                    normal: e.mode() as u32 == xcb::NOTIFY_MODE_NORMAL,
                    inferior: e.detail() as u32 == xcb::NOTIFY_DETAIL_INFERIOR,
                })
            }

            xcb::EXPOSE => {
                let e: &xcb::ExposeEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::Expose {
                    id: e.window(),
                    count: e.count(),
                })
            }

            xcb::FOCUS_IN => {
                let e: &xcb::FocusInEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::FocusIn { id: e.event() })
            }

            xcb::MAPPING_NOTIFY => {
                let e: &xcb::MappingNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::MappingNotify {
                    keyboard: e.request() as u32 == xcb::MAPPING_KEYBOARD,
                })
            }

            xcb::MAP_REQUEST => {
                let e: &xcb::MapRequestEvent = unsafe { xcb::cast_event(&event) };
                let id = e.window();
                xcb::get_window_attributes(&self.conn, id)
                    .get_reply()
                    .ok()
                    .map(|r| XEvent::MapRequest {
                        id,
                        ignore: r.override_redirect(),
                    })
            }

            xcb::PROPERTY_NOTIFY => {
                let e: &xcb::PropertyNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::PropertyNotify {
                    id: e.window(),
                    atom: e.atom(),
                    is_root: e.window() == self.root,
                    deleted: e.state() as u32 == xcb::PROPERTY_DELETE,
                })
            }

            xcb::RESIZE_REQUEST => {
                let e: &xcb::ResizeRequestEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::ResizeRequest {
                    id: e.window(),
                    w: e.width() as i32,
                    h: e.height() as i32,
                })
            }

            xcb::UNMAP_NOTIFY => {
                let e: &xcb::UnmapNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::UnmapNotify {
                    id: e.window(),
                    synthetic: raw_type & SEND_EVENT_BIT != 0,
                })
            }

            // NOTE: ignoring other event types
            _ => None,
        }
    }
}

impl XConn for XcbConnection {
    fn register_wm(&self) -> Result<()> {
        // https://jichu4n.com/posts/how-x-window-managers-work-and-how-to-write-one-part-i/#substructure-redirection
        xcb::change_window_attributes_checked(
            &self.conn,
            self.root,
            &[
                (xcb::CW_EVENT_MASK, ROOT_EVENT_MASK),
                (xcb::CW_CURSOR, self.cursor(CursorKind::Normal)),
            ],
        )
        .request_check()
        .context("Could not register SUBSTRUCTURE_NOTIFY/REDIRECT")?;

        let check_win = self.conn.generate_id();
        xcb::create_window(
            &self.conn,
            xcb::COPY_FROM_PARENT as u8,
            check_win,
            self.root,
            0,
            0,
            1,
            1,
            0,
            xcb::WINDOW_CLASS_INPUT_ONLY as u16,
            xcb::COPY_FROM_PARENT,
            &[],
        );
        ewmh::set_supporting_wm_check(&self.conn, check_win, check_win);
        ewmh::set_supporting_wm_check(&self.conn, self.root, check_win);
        ewmh::set_wm_name(&self.conn, check_win, "combowm");
        self.check_win.set(check_win);
        Ok(())
    }

    fn root(&self) -> Window {
        self.root
    }

    fn atoms(&self) -> &InternedAtoms {
        &self.atoms
    }

    fn screen_size(&self) -> (i32, i32) {
        self.screen_size
    }

    fn flush(&self) -> bool {
        self.conn.flush()
    }

    fn wait_for_event(&self) -> Option<XEvent> {
        loop {
            let event = self.conn.wait_for_event()?;
            if let Some(e) = self.translate(event) {
                return Some(e);
            }
        }
    }

    fn poll_for_event(&self) -> Option<XEvent> {
        loop {
            let event = self.conn.poll_for_event()?;
            if let Some(e) = self.translate(event) {
                return Some(e);
            }
        }
    }

    fn current_outputs(&self) -> Vec<Rectangle> {
        let crtcs: Vec<Rectangle> = match randr::get_screen_resources(&self.conn, self.root).get_reply() {
            Ok(resources) => resources
                .crtcs()
                .iter()
                .flat_map(|c| randr::get_crtc_info(&self.conn, *c, 0).get_reply())
                .map(|c| Rectangle::new(c.x() as i32, c.y() as i32, c.width() as i32, c.height() as i32))
                .filter(|r| r.w > 0 && r.h > 0)
                .collect(),
            Err(_) => Vec::new(),
        };
        if !crtcs.is_empty() {
            return crtcs;
        }

        match xinerama::query_screens(&self.conn).get_reply() {
            Ok(screens) => screens
                .screen_info()
                .map(|s| Rectangle::new(s.x_org() as i32, s.y_org() as i32, s.width() as i32, s.height() as i32))
                .collect(),
            Err(_) => {
                debug!("neither randr nor xinerama report outputs");
                Vec::new()
            }
        }
    }

    fn query_tree(&self) -> Vec<Window> {
        xcb::query_tree(&self.conn, self.root)
            .get_reply()
            .map(|r| r.children().to_vec())
            .unwrap_or_default()
    }

    fn window_attributes(&self, win: Window) -> Option<WindowAttributes> {
        let attrs = xcb::get_window_attributes(&self.conn, win);
        let geom = xcb::get_geometry(&self.conn, win);
        let attrs = attrs.get_reply().ok()?;
        let geom = geom.get_reply().ok()?;
        Some(WindowAttributes {
            override_redirect: attrs.override_redirect(),
            viewable: attrs.map_state() as u32 == xcb::MAP_STATE_VIEWABLE,
            geometry: Rectangle::new(
                geom.x() as i32,
                geom.y() as i32,
                geom.width() as i32,
                geom.height() as i32,
            ),
            border_width: geom.border_width() as i32,
        })
    }

    fn wm_state(&self, win: Window) -> Option<WmState> {
        self.first_u32(win, self.atoms.WM_STATE, self.atoms.WM_STATE)
            .and_then(WmState::from_raw)
    }

    fn transient_for(&self, win: Window) -> Option<Window> {
        self.first_u32(win, xcb::ATOM_WM_TRANSIENT_FOR, xcb::ATOM_WINDOW)
            .filter(|&w| w != xcb::NONE)
    }

    fn wm_class(&self, win: Window) -> Option<ClassHint> {
        icccm::get_wm_class(&self.conn, win)
            .get_reply()
            .ok()
            .map(|r| ClassHint {
                instance: r.instance().to_string(),
                class: r.class().to_string(),
            })
    }

    fn text_property(&self, win: Window, atom: Atom) -> Option<String> {
        icccm::get_text_property(&self.conn, win, atom)
            .get_reply()
            .ok()
            .map(|r| r.name().to_string())
            .filter(|s| !s.is_empty())
    }

    fn size_hints(&self, win: Window) -> Option<SizeHints> {
        self.property_u32s(
            win,
            xcb::ATOM_WM_NORMAL_HINTS,
            xcb::ATOM_WM_SIZE_HINTS,
            WM_SIZE_HINTS_WORDS,
        )
        .map(|raw| SizeHints::from_raw(&raw))
    }

    fn wm_hints(&self, win: Window) -> Option<WmHints> {
        let raw = self.property_u32s(win, xcb::ATOM_WM_HINTS, xcb::ATOM_WM_HINTS, WM_HINTS_WORDS)?;
        let flags = raw.first().copied().unwrap_or(0);
        Some(WmHints {
            urgent: flags & URGENCY_HINT != 0,
            input: if flags & INPUT_HINT != 0 {
                raw.get(1).map(|&v| v != 0)
            } else {
                None
            },
        })
    }

    fn set_urgency_hint(&self, win: Window, urgent: bool) {
        let mut raw = match self.property_u32s(win, xcb::ATOM_WM_HINTS, xcb::ATOM_WM_HINTS, WM_HINTS_WORDS) {
            Some(raw) => raw,
            None => return,
        };
        raw.resize(WM_HINTS_WORDS as usize, 0);
        if urgent {
            raw[0] |= URGENCY_HINT;
        } else {
            raw[0] &= !URGENCY_HINT;
        }
        self.change_u32s(win, xcb::ATOM_WM_HINTS, xcb::ATOM_WM_HINTS, &raw);
    }

    fn window_pid(&self, win: Window) -> u32 {
        self.first_u32(win, self.atoms._NET_WM_PID, xcb::ATOM_CARDINAL)
            .unwrap_or(0)
    }

    fn atom_property(&self, win: Window, prop: Atom) -> Option<Atom> {
        self.first_u32(win, prop, xcb::ATOM_ATOM)
    }

    fn xembed_flags(&self, win: Window) -> Option<u32> {
        self.property_u32s(win, self.atoms._XEMBED_INFO, self.atoms._XEMBED_INFO, 2)
            .and_then(|v| v.get(1).copied())
    }

    fn supports_protocol(&self, win: Window, protocol: Atom) -> bool {
        self.wm_protocols(win).contains(&protocol)
    }

    fn configure_window(&self, win: Window, changes: &WindowChanges) {
        let mut args = Vec::with_capacity(7);
        if let Some(x) = changes.x {
            args.push((CONFIG_WINDOW_X, x as u32));
        }
        if let Some(y) = changes.y {
            args.push((CONFIG_WINDOW_Y, y as u32));
        }
        if let Some(w) = changes.w {
            args.push((CONFIG_WINDOW_WIDTH, w.max(1) as u32));
        }
        if let Some(h) = changes.h {
            args.push((CONFIG_WINDOW_HEIGHT, h.max(1) as u32));
        }
        if let Some(bw) = changes.border_width {
            args.push((CONFIG_WINDOW_BORDER_WIDTH, bw.max(0) as u32));
        }
        if let Some(sibling) = changes.sibling {
            args.push((CONFIG_WINDOW_SIBLING, sibling));
        }
        if let Some(mode) = changes.stack_mode {
            let mode = match mode {
                StackMode::Above => xcb::STACK_MODE_ABOVE,
                StackMode::Below => xcb::STACK_MODE_BELOW,
            };
            args.push((CONFIG_WINDOW_STACK_MODE, mode));
        }
        if !args.is_empty() {
            xcb::configure_window(&self.conn, win, &args);
        }
    }

    fn send_configure_notify(&self, win: Window, r: &Rectangle, border_width: i32) {
        let event = xcb::ConfigureNotifyEvent::new(
            win,
            win,
            xcb::NONE,
            r.x as i16,
            r.y as i16,
            r.w.max(1) as u16,
            r.h.max(1) as u16,
            border_width as u16,
            false,
        );
        xcb::send_event(&self.conn, false, win, xcb::EVENT_MASK_STRUCTURE_NOTIFY, &event);
    }

    fn send_client_message(&self, win: Window, dtype: Atom, data: [u32; 5], mask: u32) {
        let data = xcb::ClientMessageData::from_data32(data);
        let event = xcb::ClientMessageEvent::new(32, win, dtype, data);
        xcb::send_event(&self.conn, false, win, mask, &event);
    }

    fn set_border_color(&self, win: Window, color: u32) {
        xcb::change_window_attributes(&self.conn, win, &[(xcb::CW_BORDER_PIXEL, color)]);
    }

    fn map_window(&self, win: Window) {
        xcb::map_window(&self.conn, win);
    }

    fn unmap_window(&self, win: Window) {
        xcb::unmap_window(&self.conn, win);
    }

    fn set_input_focus(&self, win: Window) {
        xcb::set_input_focus(&self.conn, INPUT_FOCUS_POINTER_ROOT, win, xcb::CURRENT_TIME);
        ewmh::set_active_window(&self.conn, self.preferred_screen, win);
    }

    fn focus_root(&self) {
        xcb::set_input_focus(&self.conn, INPUT_FOCUS_POINTER_ROOT, self.root, xcb::CURRENT_TIME);
        xcb::delete_property(&self.conn, self.root, self.atoms._NET_ACTIVE_WINDOW);
    }

    fn set_wm_state(&self, win: Window, state: WmState) {
        self.change_u32s(win, self.atoms.WM_STATE, self.atoms.WM_STATE, &[state as u32, xcb::NONE]);
    }

    fn set_opacity(&self, win: Window, opacity: f64) {
        let value = (opacity.max(0.0).min(1.0) * u32::MAX as f64) as u32;
        self.change_u32s(win, self.atoms._NET_WM_WINDOW_OPACITY, xcb::ATOM_CARDINAL, &[value]);
    }

    fn set_fullscreen_state(&self, win: Window, fullscreen: bool) {
        let state: &[u32] = if fullscreen {
            &[self.atoms._NET_WM_STATE_FULLSCREEN]
        } else {
            &[]
        };
        self.change_u32s(win, self.atoms._NET_WM_STATE, xcb::ATOM_ATOM, state);
    }

    fn set_client_list(&self, wins: &[Window]) {
        ewmh::set_client_list(&self.conn, self.preferred_screen, wins);
    }

    fn set_supported(&self, atoms: &[Atom]) {
        ewmh::set_supported(&self.conn, self.preferred_screen, atoms);
    }

    fn set_cardinal_property(&self, win: Window, prop: Atom, value: u32) {
        self.change_u32s(win, prop, xcb::ATOM_CARDINAL, &[value]);
    }

    fn select_client_events(&self, win: Window) {
        self.set_event_mask(win, CLIENT_EVENT_MASK);
    }

    fn select_tray_icon_events(&self, win: Window) {
        self.set_event_mask(win, TRAY_ICON_EVENT_MASK);
    }

    fn numlock_mask(&self) -> u16 {
        let numlock: Vec<xcb::Keycode> = KeySymbols::new(&self.conn).get_keycode(XK_NUM_LOCK).collect();
        let reply = match xcb::get_modifier_mapping(&self.conn).get_reply() {
            Ok(r) => r,
            Err(_) => return 0,
        };
        let per_mod = reply.keycodes_per_modifier() as usize;
        reply
            .keycodes()
            .chunks(per_mod.max(1))
            .take(8)
            .position(|codes| codes.iter().any(|c| *c != 0 && numlock.contains(c)))
            .map_or(0, |i| 1 << i)
    }

    fn grab_keys(&self, keys: &[XcbKey], numlock: u16) {
        xcb::ungrab_key(&self.conn, xcb::GRAB_ANY as u8, self.root, xcb::MOD_MASK_ANY as u16);
        for key in keys {
            for m in Self::lock_variants(numlock).iter() {
                // xcb docs: https://www.mankier.com/3/xcb_grab_key
                xcb::grab_key(
                    &self.conn,
                    true,
                    self.root,
                    key.mod_mask | m,
                    key.code,
                    GRAB_MODE_ASYNC,
                    GRAB_MODE_ASYNC,
                );
            }
        }
    }

    fn grab_buttons(&self, win: Window, buttons: &[(u8, u16)], numlock: u16, focused: bool) {
        xcb::ungrab_button(&self.conn, xcb::BUTTON_INDEX_ANY as u8, win, xcb::MOD_MASK_ANY as u16);
        if !focused {
            xcb::grab_button(
                &self.conn,
                false,
                win,
                BUTTON_MASK,
                xcb::GRAB_MODE_SYNC as u8,
                xcb::GRAB_MODE_SYNC as u8,
                xcb::NONE,
                xcb::NONE,
                xcb::BUTTON_INDEX_ANY as u8,
                xcb::MOD_MASK_ANY as u16,
            );
        }
        for &(button, mods) in buttons {
            for m in Self::lock_variants(numlock).iter() {
                xcb::grab_button(
                    &self.conn,
                    false,
                    win,
                    BUTTON_MASK,
                    GRAB_MODE_ASYNC,
                    xcb::GRAB_MODE_SYNC as u8,
                    xcb::NONE,
                    xcb::NONE,
                    button,
                    mods | m,
                );
            }
        }
    }

    fn grab_pointer(&self, cursor: CursorKind) -> bool {
        xcb::grab_pointer(
            &self.conn,
            false,
            self.root,
            DRAG_MASK,
            GRAB_MODE_ASYNC,
            GRAB_MODE_ASYNC,
            xcb::NONE,
            self.cursor(cursor),
            xcb::CURRENT_TIME,
        )
        .get_reply()
        .map_or(false, |r| r.status() as u32 == xcb::GRAB_STATUS_SUCCESS)
    }

    fn ungrab_pointer(&self) {
        xcb::ungrab_pointer(&self.conn, xcb::CURRENT_TIME);
    }

    fn query_pointer(&self) -> Option<Point> {
        xcb::query_pointer(&self.conn, self.root)
            .get_reply()
            .ok()
            .map(|r| Point::new(r.root_x() as i32, r.root_y() as i32))
    }

    fn warp_pointer(&self, win: Window, x: i32, y: i32) {
        xcb::warp_pointer(&self.conn, xcb::NONE, win, 0, 0, 0, 0, x as i16, y as i16);
    }

    /// Closes a window.
    ///
    /// The window will be closed gracefully using the ICCCM WM_DELETE_WINDOW
    /// protocol if it is supported.
    fn signal_delete_window(&self, win: Window) {
        let atom = self.atoms.WM_DELETE_WINDOW;
        if self.supports_protocol(win, atom) {
            info!("Closing window {} using WM_DELETE", win);
            self.send_client_message(
                win,
                self.atoms.WM_PROTOCOLS,
                [atom, xcb::CURRENT_TIME, 0, 0, 0],
                xcb::EVENT_MASK_NO_EVENT,
            );
        } else {
            info!("Closing window {} using xcb::kill_client()", win);
            xcb::grab_server(&self.conn);
            xcb::set_close_down_mode(&self.conn, xcb::CLOSE_DOWN_DESTROY_ALL as u8);
            xcb::kill_client(&self.conn, win);
            xcb::ungrab_server(&self.conn);
        }
    }

    fn create_bar_window(&self, r: &Rectangle) -> Window {
        let win = self.conn.generate_id();
        // xcb docs: https://www.mankier.com/3/xcb_create_window
        xcb::create_window(
            &self.conn,
            self.depth,
            win,
            self.root,
            r.x as i16,
            r.y as i16,
            r.w.max(1) as u16,
            r.h.max(1) as u16,
            0,
            xcb::WINDOW_CLASS_INPUT_OUTPUT as u16,
            self.root_visual,
            &[
                (xcb::CW_BACK_PIXEL, self.normal.bg),
                (xcb::CW_OVERRIDE_REDIRECT, 1),
                (xcb::CW_EVENT_MASK, BAR_EVENT_MASK),
                (xcb::CW_CURSOR, self.cursor(CursorKind::Normal)),
            ],
        );
        xcb::map_window(&self.conn, win);
        self.configure_window(win, &WindowChanges::stack(None, StackMode::Above));
        win
    }

    fn create_tray_window(&self, r: &Rectangle, background: u32) -> Window {
        let win = self.conn.generate_id();
        xcb::create_window(
            &self.conn,
            self.depth,
            win,
            self.root,
            r.x as i16,
            r.y as i16,
            r.w.max(1) as u16,
            r.h.max(1) as u16,
            0,
            xcb::WINDOW_CLASS_INPUT_OUTPUT as u16,
            self.root_visual,
            &[
                (xcb::CW_BACK_PIXEL, background),
                (xcb::CW_OVERRIDE_REDIRECT, 1),
                (xcb::CW_EVENT_MASK, BAR_EVENT_MASK),
            ],
        );
        win
    }

    fn destroy_window(&self, win: Window) {
        xcb::destroy_window(&self.conn, win);
    }

    fn reparent_window(&self, win: Window, parent: Window, x: i32, y: i32) {
        xcb::reparent_window(&self.conn, win, parent, x as i16, y as i16);
    }

    fn add_to_save_set(&self, win: Window) {
        xcb::change_save_set(&self.conn, xcb::SET_MODE_INSERT as u8, win);
    }

    fn set_background(&self, win: Window, pixel: u32) {
        xcb::change_window_attributes(&self.conn, win, &[(xcb::CW_BACK_PIXEL, pixel)]);
    }

    fn claim_selection(&self, owner: Window, selection: Atom) -> bool {
        xcb::set_selection_owner(&self.conn, owner, selection, xcb::CURRENT_TIME);
        xcb::get_selection_owner(&self.conn, selection)
            .get_reply()
            .map_or(false, |r| r.owner() == owner)
    }

    // - Release all of the keybindings we are holding on to
    // - destroy the check window
    // - mark ourselves as no longer being the active root window
    fn cleanup(&self) {
        // xcb docs: https://www.mankier.com/3/xcb_ungrab_key
        xcb::ungrab_key(&self.conn, xcb::GRAB_ANY as u8, self.root, xcb::MOD_MASK_ANY as u16);
        if self.check_win.get() != xcb::NONE {
            xcb::destroy_window(&self.conn, self.check_win.get());
        }
        for &cursor in self.cursors.iter() {
            xcb::free_cursor(&self.conn, cursor);
        }
        xcb::free_gc(&self.conn, self.gc);
        xcb::close_font(&self.conn, self.font.id);
        self.focus_root();
        self.conn.flush();
    }
}

impl Draw for XcbConnection {
    fn bar_height(&self) -> i32 {
        self.font.height() + 2
    }

    fn text_width(&self, text: &str) -> i32 {
        self.font.width(&latin1(text)) + self.font.height()
    }

    fn draw_bar(&self, win: Window, content: &BarContent) {
        let h = self.bar_height();
        let box_size = self.font.height() / 9 + 2;
        let box_offset = self.font.height() / 9;
        self.with_pixmap(win, content.width, h, |pm| {
            self.fill(pm, self.normal.bg, 0, 0, content.width, h, true);
            for seg in content.segments.iter() {
                let scheme = if seg.selected { &self.selected } else { &self.normal };
                let mut colors = (scheme.fg, scheme.bg);
                if let SegmentKind::Tag { urgent: true, .. } = seg.kind {
                    colors = (scheme.bg, scheme.fg);
                }
                self.text_cell(pm, colors, seg.x, seg.w, h, &seg.text);

                match seg.kind {
                    SegmentKind::Tag {
                        occupied: true,
                        has_sel,
                        ..
                    } => self.fill(pm, colors.0, seg.x + box_offset, box_offset, box_size, box_size, has_sel),
                    SegmentKind::Title { floating: true } if !seg.text.is_empty() => {
                        self.fill(pm, colors.0, seg.x + box_offset, box_offset, box_size, box_size, seg.selected)
                    }
                    _ => (),
                }
            }
        });
    }

    fn draw_tabs(&self, win: Window, width: i32, tabs: &[Tab]) {
        let h = self.bar_height();
        self.with_pixmap(win, width, h, |pm| {
            self.fill(pm, self.normal.bg, 0, 0, width, h, true);
            for tab in tabs {
                let scheme = if tab.selected { &self.selected } else { &self.normal };
                self.text_cell(pm, (scheme.fg, scheme.bg), tab.x, tab.w, h, &tab.title);
            }
        });
    }
}
