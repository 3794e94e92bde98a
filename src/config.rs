use crate::{
    bindings::{ButtonBinding, Click, Command},
    layout::{Layout, LayoutKind},
    monitor::TabMode,
    rule::Rule,
    tag::MAX_TAGS,
};

/// Default tag names
pub const TAGS: [&str; 9] = ["www", "code", "3", "4", "macaw", "chat", "mail", "8", "9"];
const _: () = assert!(TAGS.len() <= MAX_TAGS);

const BUTTON_1: u8 = 1;
const BUTTON_2: u8 = 2;
const BUTTON_3: u8 = 3;
const MODKEY: u16 = xcb::MOD_MASK_1 as u16;

/// Foreground, background and border colors for one drawing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorScheme {
    pub fg: u32,
    pub bg: u32,
    pub border: u32,
}

/// The main user facing configuration details
pub struct Config {
    /// Tag names, one bit of the tag mask each. At most MAX_TAGS are used.
    pub tags: Vec<String>,
    /// Window classification rules, applied in order. The first is the default rule.
    pub rules: Vec<Rule>,
    /// Available layouts. The first entry is the default.
    pub layouts: Vec<Layout>,
    /// Layout switched to when a monitor becomes wider than tall
    pub landscape_layout: usize,
    /// Layout switched to when a monitor becomes taller than wide
    pub portrait_layout: usize,
    /// Key bindings in 'A-S-Return' form: A=Alt, M=Super, C=Ctrl, S=Shift
    pub key_bindings: Vec<(&'static str, Command)>,
    pub button_bindings: Vec<ButtonBinding>,
    /// X core fonts to try, in order
    pub fonts: Vec<String>,
    pub normal: ColorScheme,
    pub selected: ColorScheme,
    /// The width of window borders in pixels
    pub border_px: i32,
    /// The size of gaps between windows in pixels.
    pub gap_px: i32,
    /// Snap distance for interactive moves in pixels
    pub snap: i32,
    /// Share of the screen given to the master area
    pub mfact: f32,
    pub nmaster: i32,
    /// Left, master and right column weights for the multi column layouts
    pub colfact: [f32; 3],
    pub nmastercols: i32,
    pub nrightcols: i32,
    /// Respect size hints of tiled clients
    pub resize_hints: bool,
    /// Whether or not space should be reserved for a status bar
    pub show_bar: bool,
    /// True if the status bar should be at the top of the screen, false if it should be at the bottom
    pub top_bar: bool,
    pub tab_mode: TabMode,
    pub top_tab: bool,
    pub show_systray: bool,
    /// 0: the tray follows the selected monitor, n: pinned to monitor n-1
    pub systray_pinning: usize,
    pub systray_spacing: i32,
    /// Fall back to the first monitor (not the last) when the pinned one is missing
    pub systray_pinning_fail_first: bool,
    /// Minimum window area width before the left column of mtcl/varcol is used
    pub left_column_min_width: i32,
    /// Minimum number of tiled clients before the left column is used
    pub left_column_min_clients: usize,
}

macro_rules! vec_of_strings {
    ($($x:expr),*) => (vec![$($x.to_string()),*]);
}

fn spawn(cmd: &[&str]) -> Command {
    Command::Spawn(cmd.iter().map(|s| s.to_string()).collect())
}

fn key_bindings() -> Vec<(&'static str, Command)> {
    let mut keys = vec![
        ("A-p", spawn(&["dmenu_run"])),
        ("A-S-Return", spawn(&["st"])),
        ("A-b", Command::ToggleBar),
        ("A-w", Command::TabMode(-1)),
        ("A-j", Command::FocusStack(1)),
        ("A-k", Command::FocusStack(-1)),
        ("A-i", Command::IncNMaster(1)),
        ("A-d", Command::IncNMaster(-1)),
        ("A-h", Command::SetColFact(-0.05)),
        ("A-l", Command::SetColFact(0.05)),
        ("A-C-h", Command::SetMFact(-0.05)),
        ("A-C-l", Command::SetMFact(0.05)),
        ("A-S-h", Command::SetCFact(0.25)),
        ("A-S-l", Command::SetCFact(-0.25)),
        ("A-S-o", Command::SetCFact(0.0)),
        ("A-S-j", Command::PushDown),
        ("A-S-k", Command::PushUp),
        ("A-o", Command::PushLeft),
        ("A-Return", Command::Zoom),
        ("A-Tab", Command::ComboView(-1)),
        ("A-S-c", Command::KillClient),
        ("A-f", Command::SetLayout(Some(0))),
        ("A-t", Command::SetLayout(Some(1))),
        ("A-m", Command::SetLayout(Some(2))),
        ("A-g", Command::SetLayout(Some(3))),
        ("A-space", Command::NextLayout),
        ("A-S-space", Command::ForceTile),
        ("A-S-f", Command::ToggleFloating),
        ("A-u", Command::ToggleSwallow),
        ("A-bracketright", Command::IncNCols(1)),
        ("A-bracketleft", Command::IncNCols(-1)),
        ("A-S-bracketright", Command::IncNRightCols(1)),
        ("A-S-bracketleft", Command::IncNRightCols(-1)),
        ("A-0", Command::View(!0)),
        ("A-S-0", Command::Tag(!0)),
        ("A-comma", Command::FocusMon(-1)),
        ("A-period", Command::FocusMon(1)),
        ("A-S-comma", Command::TagMon(-1)),
        ("A-S-period", Command::TagMon(1)),
        ("A-n", Command::NameTag),
        ("A-S-q", Command::Quit),
    ];

    const TAG_KEYS: [&str; 9] = ["A-1", "A-2", "A-3", "A-4", "A-5", "A-6", "A-7", "A-8", "A-9"];
    const VIEW_KEYS: [&str; 9] = ["A-C-1", "A-C-2", "A-C-3", "A-C-4", "A-C-5", "A-C-6", "A-C-7", "A-C-8", "A-C-9"];
    const MOVE_KEYS: [&str; 9] = ["A-S-1", "A-S-2", "A-S-3", "A-S-4", "A-S-5", "A-S-6", "A-S-7", "A-S-8", "A-S-9"];
    const TOGGLE_KEYS: [&str; 9] = [
        "A-C-S-1", "A-C-S-2", "A-C-S-3", "A-C-S-4", "A-C-S-5", "A-C-S-6", "A-C-S-7", "A-C-S-8", "A-C-S-9",
    ];
    for i in 0..TAGS.len() {
        keys.push((TAG_KEYS[i], Command::ComboView(i as i32)));
        keys.push((VIEW_KEYS[i], Command::ToggleView(1 << i)));
        keys.push((MOVE_KEYS[i], Command::ComboTag(1 << i)));
        keys.push((TOGGLE_KEYS[i], Command::ToggleTag(1 << i)));
    }

    keys
}

fn button_bindings() -> Vec<ButtonBinding> {
    vec![
        ButtonBinding::new(Click::LtSymbol, 0, BUTTON_1, Command::SetLayout(None)),
        ButtonBinding::new(Click::LtSymbol, 0, BUTTON_3, Command::SetLayout(Some(2))),
        ButtonBinding::new(Click::WinTitle, 0, BUTTON_2, Command::Zoom),
        ButtonBinding::new(Click::StatusText, 0, BUTTON_2, spawn(&["st"])),
        ButtonBinding::new(Click::ClientWin, MODKEY, BUTTON_1, Command::MoveMouse),
        ButtonBinding::new(Click::ClientWin, MODKEY, BUTTON_2, Command::ToggleFloating),
        ButtonBinding::new(Click::ClientWin, MODKEY, BUTTON_3, Command::ResizeMouse),
        ButtonBinding::new(Click::TagBar, 0, BUTTON_1, Command::View(0)),
        ButtonBinding::new(Click::TagBar, 0, BUTTON_3, Command::ToggleView(0)),
        ButtonBinding::new(Click::TagBar, MODKEY, BUTTON_1, Command::Tag(0)),
        ButtonBinding::new(Click::TagBar, MODKEY, BUTTON_3, Command::ToggleTag(0)),
        ButtonBinding::new(Click::TabBar, 0, BUTTON_1, Command::FocusWin(0)),
    ]
}

fn rules() -> Vec<Rule> {
    vec![
        Rule::default(),
        Rule {
            class: Some("xvkbd"),
            floating: true,
            opacity: 0.6,
            no_swallow: true,
            keyboard: true,
            ..Rule::default()
        },
        Rule {
            class: Some("Pidgin"),
            tags: 1 << 5,
            left: true,
            cfact: 0.5,
            ..Rule::default()
        },
        Rule {
            class: Some("st-256color"),
            terminal: true,
            ..Rule::default()
        },
        Rule {
            title: Some("Event Tester"),
            no_swallow: true,
            ..Rule::default()
        },
    ]
}

impl Config {
    /// Initialise a default Config, giving sensible (but minimal) values for all fields.
    pub fn default() -> Config {
        Config {
            tags: TAGS.iter().map(|t| t.to_string()).collect(),
            rules: rules(),
            layouts: vec![
                Layout::new("=O=", LayoutKind::Mtcl),
                Layout::new("[]=", LayoutKind::Tile),
                Layout::new("[M]", LayoutKind::Monocle),
                Layout::new("###", LayoutKind::GaplessGrid),
                Layout::new("---", LayoutKind::HorizGrid),
                Layout::new("|||", LayoutKind::Varcol),
                Layout::new("><>", LayoutKind::Floating),
            ],
            landscape_layout: 0,
            portrait_layout: 2,
            key_bindings: key_bindings(),
            button_bindings: button_bindings(),
            fonts: vec_of_strings!["-misc-fixed-medium-r-normal--13-*-*-*-*-*-*-*", "fixed"],
            normal: ColorScheme {
                fg: 0xbbbbbb,
                bg: 0x222222,
                border: 0x444444,
            },
            selected: ColorScheme {
                fg: 0xeeeeee,
                bg: 0x005577,
                border: 0x005577,
            },
            border_px: 1,
            gap_px: 6,
            snap: 32,
            mfact: 0.60,
            nmaster: 1,
            colfact: [0.1, 0.6, 0.3],
            nmastercols: 1,
            nrightcols: 1,
            resize_hints: false,
            show_bar: true,
            top_bar: true,
            tab_mode: TabMode::Auto,
            top_tab: false,
            show_systray: true,
            systray_pinning: 0,
            systray_spacing: 2,
            systray_pinning_fail_first: true,
            left_column_min_width: 2560,
            left_column_min_clients: 4,
        }
    }

    /// The layout a monitor should use for its current orientation.
    pub fn orientation_layout(&self, portrait: bool) -> usize {
        let idx = if portrait {
            self.portrait_layout
        } else {
            self.landscape_layout
        };
        idx.min(self.layouts.len().saturating_sub(1))
    }
}
