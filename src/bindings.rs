//! User actions and the key and button tables that trigger them.
use std::{collections::HashMap, process::Command as Process};

use anyhow::{anyhow, Context, Result};

use crate::{tag::TagMask, xconnection::XcbKey};

/// An action the user can trigger from a key or button binding
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Spawn(Vec<String>),
    ToggleBar,
    /// Set the tab mode, or cycle it with a negative index
    TabMode(i32),
    FocusStack(i32),
    /// Focus the n-th visible client, as clicked in the tab bar
    FocusWin(usize),
    IncNMaster(i32),
    IncNCols(i32),
    IncNRightCols(i32),
    SetMFact(f32),
    SetCFact(f32),
    SetColFact(f32),
    PushUp,
    PushDown,
    PushLeft,
    Zoom,
    KillClient,
    /// Switch to a layout table entry, or back to the other layout slot
    SetLayout(Option<usize>),
    NextLayout,
    ForceTile,
    ToggleFloating,
    ToggleSwallow,
    View(TagMask),
    ToggleView(TagMask),
    /// Switch to a tag index combo style, or back to the previous view when negative
    ComboView(i32),
    Tag(TagMask),
    ToggleTag(TagMask),
    ComboTag(TagMask),
    FocusMon(i32),
    TagMon(i32),
    NameTag,
    MoveMouse,
    ResizeMouse,
    Quit,
}

impl Command {
    /**
     * Bar click bindings are declared with a zero argument that is filled in
     * from what was clicked: the tag under the pointer or the tab index.
     */
    pub fn with_click_arg(&self, arg: u32) -> Command {
        match self {
            Command::View(0) => Command::View(arg),
            Command::ToggleView(0) => Command::ToggleView(arg),
            Command::Tag(0) => Command::Tag(arg),
            Command::ToggleTag(0) => Command::ToggleTag(arg),
            Command::FocusWin(0) => Command::FocusWin(arg as usize),
            other => other.clone(),
        }
    }
}

/// Where a button press landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Click {
    TagBar,
    TabBar,
    LtSymbol,
    StatusText,
    WinTitle,
    ClientWin,
    RootWin,
}

/// A mouse binding: region, modifiers and button
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonBinding {
    pub click: Click,
    pub mask: u16,
    pub button: u8,
    pub command: Command,
}

impl ButtonBinding {
    pub fn new(click: Click, mask: u16, button: u8, command: Command) -> ButtonBinding {
        ButtonBinding {
            click,
            mask,
            button,
            command,
        }
    }
}

/// Map xmodmap key names to their X key code so that we can bind them by name
pub type KeymapTable = HashMap<String, u8>;

/**
 * Run the xmodmap command to dump the system keymap table.
 *
 * This is done in a form that we can load in and convert back to key
 * codes. This lets the user define key bindings in the way that they
 * would expect while also ensuring that it is easy to debug any odd
 * issues with bindings by referring the user to the xmodmap output.
 */
pub fn keycodes_from_xmodmap() -> Result<KeymapTable> {
    let output = Process::new("xmodmap")
        .arg("-pke")
        .output()
        .context("unable to fetch keycodes via xmodmap")?;
    let s = String::from_utf8(output.stdout).context("invalid utf8 from xmodmap")?;
    Ok(parse_keymap(&s))
}

/// Parse 'keycode <code> = <names ...>' lines, skipping anything malformed.
pub fn parse_keymap(dump: &str) -> KeymapTable {
    dump.lines()
        .filter_map(|l| {
            let mut words = l.split_whitespace();
            let code: u8 = words.nth(1)?.parse().ok()?;
            Some(words.skip(1).map(move |name| (name.to_string(), code)))
        })
        .flatten()
        .collect()
}

/**
 * Convert user friendly key bindings into X keycodes.
 *
 * Bindings are of the form '<MOD>-<key name>' with multiple modifiers being
 * allowed, and key names being taken from the output of 'xmodmap -pke'.
 *
 * Allowed modifiers are:
 *   M - Super
 *   A - Alt
 *   C - Ctrl
 *   S - Shift
 */
pub fn parse_key_binding(pattern: &str, known_codes: &KeymapTable) -> Result<XcbKey> {
    let mut parts: Vec<&str> = pattern.split('-').collect();
    let name = parts.pop().unwrap_or_default();
    let code = known_codes
        .get(name)
        .ok_or_else(|| anyhow!("unknown key name '{}' in binding '{}'", name, pattern))?;

    let mut mask = 0;
    for p in parts {
        mask |= match p {
            "A" => xcb::MOD_MASK_1,
            "M" => xcb::MOD_MASK_4,
            "S" => xcb::MOD_MASK_SHIFT,
            "C" => xcb::MOD_MASK_CONTROL,
            _ => return Err(anyhow!("invalid key binding prefix '{}' in '{}'", p, pattern)),
        };
    }

    Ok(XcbKey::new(mask as u16, *code))
}

/// Modifiers that take part in matching a binding, with numlock and capslock removed.
pub fn clean_mask(mask: u16, numlock: u16) -> u16 {
    let relevant = (xcb::MOD_MASK_SHIFT
        | xcb::MOD_MASK_CONTROL
        | xcb::MOD_MASK_1
        | xcb::MOD_MASK_2
        | xcb::MOD_MASK_3
        | xcb::MOD_MASK_4
        | xcb::MOD_MASK_5) as u16;
    mask & !(numlock | xcb::MOD_MASK_LOCK as u16) & relevant
}

/// The resolved key and button tables
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    keys: HashMap<XcbKey, Command>,
    buttons: Vec<ButtonBinding>,
}

impl Bindings {
    /// Resolve the key patterns against the keymap. Bindings that do not resolve are skipped.
    pub fn new(keymap: &KeymapTable, keys: &[(&str, Command)], buttons: &[ButtonBinding]) -> Bindings {
        let mut resolved = HashMap::new();
        for (pattern, cmd) in keys {
            match parse_key_binding(pattern, keymap) {
                Ok(key) => {
                    resolved.insert(key, cmd.clone());
                }
                Err(e) => warn!("skipping key binding: {}", e),
            }
        }
        debug!("{} key bindings resolved", resolved.len());

        Bindings {
            keys: resolved,
            buttons: buttons.to_vec(),
        }
    }

    /// Every key that needs to be grabbed on the root window
    pub fn keys(&self) -> Vec<XcbKey> {
        self.keys.keys().copied().collect()
    }

    pub fn key_command(&self, key: &XcbKey, numlock: u16) -> Option<&Command> {
        let clean = XcbKey::new(clean_mask(key.mod_mask, numlock), key.code);
        self.keys.get(&clean)
    }

    /// Commands bound to a button press in a click region
    pub fn button_commands(&self, click: Click, button: u8, state: u16, numlock: u16) -> Vec<&Command> {
        let state = clean_mask(state, numlock);
        self.buttons
            .iter()
            .filter(|b| b.click == click && b.button == button && clean_mask(b.mask, numlock) == state)
            .map(|b| &b.command)
            .collect()
    }

    /// (button, modifiers) pairs to grab on focused client windows
    pub fn client_buttons(&self) -> Vec<(u8, u16)> {
        self.buttons
            .iter()
            .filter(|b| b.click == Click::ClientWin)
            .map(|b| (b.button, b.mask))
            .collect()
    }
}
