//! Size hint handling and the gap/border rules applied to client geometry.
use crate::xconnection::Rectangle;

// WM_NORMAL_HINTS flags
const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_ASPECT: u32 = 1 << 7;
const P_BASE_SIZE: u32 = 1 << 8;

/// Monitors at or below this size in either dimension get no gaps and no borders.
pub const SMALL_MONITOR_PX: i32 = 1024;

/// Constraints derived from a client's WM_NORMAL_HINTS.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeHints {
    pub base_w: i32,
    pub base_h: i32,
    pub inc_w: i32,
    pub inc_h: i32,
    pub max_w: i32,
    pub max_h: i32,
    pub min_w: i32,
    pub min_h: i32,
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl SizeHints {
    /**
     * Parse the raw 18 word WM_SIZE_HINTS structure.
     *
     * Words: flags, x, y, w, h, min_w, min_h, max_w, max_h, inc_w, inc_h,
     * min_aspect (num, den), max_aspect (num, den), base_w, base_h, gravity.
     * Short or missing data leaves the affected fields at zero.
     */
    pub fn from_raw(raw: &[u32]) -> SizeHints {
        let word = |i: usize| raw.get(i).map(|&v| v as i32).unwrap_or(0);
        let flags = raw.first().copied().unwrap_or(0);
        let mut hints = SizeHints::default();

        if flags & P_BASE_SIZE != 0 {
            hints.base_w = word(15);
            hints.base_h = word(16);
        } else if flags & P_MIN_SIZE != 0 {
            hints.base_w = word(5);
            hints.base_h = word(6);
        }
        if flags & P_RESIZE_INC != 0 {
            hints.inc_w = word(9);
            hints.inc_h = word(10);
        }
        if flags & P_MAX_SIZE != 0 {
            hints.max_w = word(7);
            hints.max_h = word(8);
        }
        if flags & P_MIN_SIZE != 0 {
            hints.min_w = word(5);
            hints.min_h = word(6);
        } else if flags & P_BASE_SIZE != 0 {
            hints.min_w = word(15);
            hints.min_h = word(16);
        }
        if flags & P_ASPECT != 0 {
            hints.min_aspect = ratio(word(12), word(11));
            hints.max_aspect = ratio(word(13), word(14));
        }

        hints
    }

    /// A client that can only ever be one size.
    pub fn is_fixed(&self) -> bool {
        self.max_w > 0 && self.max_h > 0 && self.max_w == self.min_w && self.max_h == self.min_h
    }

    /**
     * Apply base size, aspect ratio, increment and min/max constraints to a
     * content size, in the order ICCCM 4.1.2.3 describes.
     */
    pub fn constrain(&self, w: i32, h: i32) -> (i32, i32) {
        let (mut w, mut h) = (w, h);
        let base_is_min = self.base_w == self.min_w && self.base_h == self.min_h;

        // temporarily remove base dimensions
        if !base_is_min {
            w -= self.base_w;
            h -= self.base_h;
        }
        if self.min_aspect > 0.0 && self.max_aspect > 0.0 && w > 0 && h > 0 {
            if self.max_aspect < w as f32 / h as f32 {
                w = (h as f32 * self.max_aspect + 0.5) as i32;
            } else if self.min_aspect < h as f32 / w as f32 {
                h = (w as f32 * self.min_aspect + 0.5) as i32;
            }
        }
        // increment calculation requires this
        if base_is_min {
            w -= self.base_w;
            h -= self.base_h;
        }
        if self.inc_w > 0 {
            w -= w % self.inc_w;
        }
        if self.inc_h > 0 {
            h -= h % self.inc_h;
        }
        w = (w + self.base_w).max(self.min_w);
        h = (h + self.base_h).max(self.min_h);
        if self.max_w > 0 {
            w = w.min(self.max_w);
        }
        if self.max_h > 0 {
            h = h.min(self.max_h);
        }

        (w, h)
    }
}

fn ratio(num: i32, den: i32) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

/// Where a client is allowed to end up when its geometry is constrained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// The monitor's window area
    pub area: Rectangle,
    /// The whole X screen, used for interactive moves
    pub screen: Rectangle,
    /// Lower bound for either content dimension
    pub min_dim: i32,
}

/**
 * Adjust a requested content rectangle so the client stays reachable and
 * (when `honor_hints` is set) respects its size hints.
 *
 * `current` is the client's present content rectangle and `bw` its border.
 * Returns whether the result differs from `current`.
 */
pub fn apply_size_hints(
    hints: &SizeHints,
    current: &Rectangle,
    bw: i32,
    req: &mut Rectangle,
    interact: bool,
    bounds: &Bounds,
    honor_hints: bool,
) -> bool {
    req.w = req.w.max(1);
    req.h = req.h.max(1);
    let outer_w = current.w + 2 * bw;
    let outer_h = current.h + 2 * bw;

    if interact {
        let s = &bounds.screen;
        if req.x > s.x + s.w {
            req.x = s.x + s.w - outer_w;
        }
        if req.y > s.y + s.h {
            req.y = s.y + s.h - outer_h;
        }
        if req.x + req.w + 2 * bw < s.x {
            req.x = s.x;
        }
        if req.y + req.h + 2 * bw < s.y {
            req.y = s.y;
        }
    } else {
        let a = &bounds.area;
        if req.x >= a.x + a.w {
            req.x = a.x + a.w - outer_w;
        }
        if req.y >= a.y + a.h {
            req.y = a.y + a.h - outer_h;
        }
        if req.x + req.w + 2 * bw <= a.x {
            req.x = a.x;
        }
        if req.y + req.h + 2 * bw <= a.y {
            req.y = a.y;
        }
    }
    req.w = req.w.max(bounds.min_dim);
    req.h = req.h.max(bounds.min_dim);

    if honor_hints {
        let (w, h) = hints.constrain(req.w, req.h);
        req.w = w;
        req.h = h;
    }

    req != current
}

/// Gap size to use on a monitor: none on small outputs.
pub fn effective_gap(screen: &Rectangle, gap: i32) -> i32 {
    if is_small_monitor(screen) {
        0
    } else {
        gap.max(0)
    }
}

pub fn is_small_monitor(screen: &Rectangle) -> bool {
    screen.w <= SMALL_MONITOR_PX || screen.h <= SMALL_MONITOR_PX
}

/**
 * Shrink a layout cell by the gap on every side that is not flush with the
 * physical monitor edge. Cells are stacked top to bottom, so the top side
 * takes the whole gap and the bottom none. Horizontally each interior edge
 * takes half a gap so two neighbouring cells end up exactly one gap apart.
 * A cell touching all four edges is returned unchanged.
 */
pub fn inset_gaps(screen: &Rectangle, cell: &Rectangle, gap: i32) -> Rectangle {
    if gap <= 0 {
        return *cell;
    }

    let at_left = cell.x - screen.x < gap;
    let at_top = cell.y - screen.y < gap;
    let at_right = (screen.x + screen.w) - (cell.x + cell.w) < gap;
    let at_bottom = (screen.y + screen.h) - (cell.y + cell.h) < gap;
    if at_left && at_top && at_right && at_bottom {
        return *cell;
    }

    let left = if at_left { 0 } else { gap - gap / 2 };
    let right = if at_right { 0 } else { gap / 2 };
    let top = if at_top { 0 } else { gap };

    Rectangle::new(
        cell.x + left,
        cell.y + top,
        (cell.w - left - right).max(1),
        (cell.h - top).max(1),
    )
}
