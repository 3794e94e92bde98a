//! What the status bar and tab bar show, and where clicks on them land.
use xcb::Window;

use crate::{bindings::Click, tag::{tag_bit, TagMask}};

/// Text drawing, implemented by the X connection
pub trait Draw {
    /// Height of the bar (and of tray icons and tabs)
    fn bar_height(&self) -> i32;
    /// Width of a string including the horizontal padding around it
    fn text_width(&self, text: &str) -> i32;
    fn draw_bar(&self, win: Window, content: &BarContent);
    fn draw_tabs(&self, win: Window, width: i32, tabs: &[Tab]);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    Tag {
        index: usize,
        occupied: bool,
        urgent: bool,
        /// The selected client is on this tag
        has_sel: bool,
    },
    LtSymbol,
    Title {
        floating: bool,
    },
    Status,
}

/// A run of the bar drawn in one scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
    pub x: i32,
    pub w: i32,
    /// Drawn with the selected scheme
    pub selected: bool,
}

/// Everything a monitor's bar needs to show
#[derive(Debug, Clone, Copy)]
pub struct BarInputs<'a> {
    pub tags: &'a [String],
    pub tagset: TagMask,
    /// Tags with at least one client
    pub occupied: TagMask,
    pub urgent: TagMask,
    /// Tags of the monitor's selected client
    pub sel_tags: TagMask,
    pub symbol: &'a str,
    pub title: Option<&'a str>,
    pub title_floating: bool,
    /// Only shown on the selected monitor
    pub status: &'a str,
    pub is_selmon: bool,
    /// Usable width, the tray excluded
    pub width: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BarContent {
    pub width: i32,
    pub segments: Vec<Segment>,
}

impl BarContent {
    /**
     * Lay the bar out left to right: one cell per tag, the layout symbol, the
     * title filling the middle, and the status text flush right.
     */
    pub fn build(inputs: &BarInputs, text_width: impl Fn(&str) -> i32) -> BarContent {
        let mut segments = Vec::with_capacity(inputs.tags.len() + 3);
        let mut x = 0;

        for (i, name) in inputs.tags.iter().enumerate() {
            let bit = tag_bit(i);
            let w = text_width(name);
            segments.push(Segment {
                kind: SegmentKind::Tag {
                    index: i,
                    occupied: inputs.occupied & bit != 0,
                    urgent: inputs.urgent & bit != 0,
                    has_sel: inputs.is_selmon && inputs.sel_tags & bit != 0,
                },
                text: name.clone(),
                x,
                w,
                selected: inputs.tagset & bit != 0,
            });
            x += w;
        }

        let w = text_width(inputs.symbol);
        segments.push(Segment {
            kind: SegmentKind::LtSymbol,
            text: inputs.symbol.to_string(),
            x,
            w,
            selected: false,
        });
        x += w;

        let status_w = if inputs.is_selmon {
            text_width(inputs.status).min((inputs.width - x).max(0))
        } else {
            0
        };
        let title_w = (inputs.width - x - status_w).max(0);
        segments.push(Segment {
            kind: SegmentKind::Title {
                floating: inputs.title_floating,
            },
            text: inputs.title.unwrap_or_default().to_string(),
            x,
            w: title_w,
            selected: inputs.is_selmon && inputs.title.is_some(),
        });
        if status_w > 0 {
            segments.push(Segment {
                kind: SegmentKind::Status,
                text: inputs.status.to_string(),
                x: inputs.width - status_w,
                w: status_w,
                selected: false,
            });
        }

        BarContent {
            width: inputs.width,
            segments,
        }
    }

    /// The region under bar position `x` and the argument a click there carries.
    pub fn click_at(&self, x: i32) -> Option<(Click, u32)> {
        let seg = self.segments.iter().find(|s| x >= s.x && x < s.x + s.w)?;
        Some(match seg.kind {
            SegmentKind::Tag { index, .. } => (Click::TagBar, tag_bit(index)),
            SegmentKind::LtSymbol => (Click::LtSymbol, 0),
            SegmentKind::Title { .. } => (Click::WinTitle, 0),
            SegmentKind::Status => (Click::StatusText, 0),
        })
    }
}

/// One label of the tab bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub title: String,
    pub x: i32,
    pub w: i32,
    pub selected: bool,
}

/**
 * Fit the natural tab widths into `total` pixels: narrow tabs keep their
 * width and the wide ones share whatever is left equally.
 */
pub fn fit_tab_widths(natural: &[i32], total: i32) -> Vec<i32> {
    let n = natural.len();
    let mut sorted = natural.to_vec();
    sorted.sort_unstable();

    let mut max = total;
    let mut used = 0;
    for (i, &w) in sorted.iter().enumerate() {
        let left = (n - i) as i32;
        if used + left * w > total {
            max = (total - used) / left;
            break;
        }
        used += w;
    }

    natural.iter().map(|&w| w.min(max)).collect()
}

/// Lay tabs out left to right from their fitted widths.
pub fn build_tabs(titles: Vec<(String, bool)>, widths: &[i32]) -> Vec<Tab> {
    let mut x = 0;
    titles
        .into_iter()
        .zip(widths.iter())
        .map(|((title, selected), &w)| {
            let tab = Tab { title, x, w, selected };
            x += w;
            tab
        })
        .collect()
}

/// Index of the tab under `x`
pub fn tab_at(widths: &[i32], x: i32) -> Option<usize> {
    let mut left = 0;
    for (i, &w) in widths.iter().enumerate() {
        if x >= left && x < left + w {
            return Some(i);
        }
        left += w;
    }
    None
}
