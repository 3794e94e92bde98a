//! The layout engine: arrangement algorithms over a monitor's tiled clients.
use std::collections::HashMap;

use crate::{
    client::{Client, ClientId},
    geometry::{self, Bounds, SizeHints},
    registry::Registry,
    tag::TagMask,
    xconnection::Rectangle,
};

/// The arrangement algorithms available in the layout table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// Master column plus a stack column
    Tile,
    /// Every client gets the whole area
    Monocle,
    /// Near square grid without empty cells
    GaplessGrid,
    /// Two rows
    HorizGrid,
    /// Left, master and right columns
    Mtcl,
    /// Variable number of master and right columns plus a left column
    Varcol,
    /// Clients keep their own geometry
    Floating,
}

impl LayoutKind {
    /// Whether this layout positions clients at all
    pub fn arranges(self) -> bool {
        self != LayoutKind::Floating
    }

    pub fn arrange(self, ctx: &mut ArrangeCtx) {
        match self {
            LayoutKind::Tile => tile(ctx),
            LayoutKind::Monocle => monocle(ctx),
            LayoutKind::GaplessGrid => gapless_grid(ctx),
            LayoutKind::HorizGrid => horiz_grid(ctx),
            LayoutKind::Mtcl => mtcl(ctx),
            LayoutKind::Varcol => varcol(ctx),
            LayoutKind::Floating => (),
        }
    }
}

/// An entry of the layout table: the bar symbol and the algorithm
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub symbol: String,
    pub kind: LayoutKind,
}

impl Layout {
    pub fn new(symbol: impl Into<String>, kind: LayoutKind) -> Layout {
        Layout {
            symbol: symbol.into(),
            kind,
        }
    }
}

/// Settings shared by every arrange pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrangeParams {
    pub gap: i32,
    /// Smallest content size a client can be given (the bar height)
    pub min_dim: i32,
    pub resize_hints: bool,
    pub left_min_width: i32,
    pub left_min_clients: usize,
}

/// The outcome of one arrange pass
#[derive(Debug, Default, PartialEq)]
pub struct Arranged {
    /// Clients whose geometry changed and must be pushed to the server
    pub changed: Vec<ClientId>,
    /// Replacement for the layout symbol, if the layout computed one
    pub symbol: Option<String>,
}

/**
 * Everything a layout needs about one monitor.
 *
 * Tiled clients are never collected up front: layouts walk the monitor's
 * tiling order with [ArrangeCtx::next_tiled] and place each client with
 * [ArrangeCtx::resize].
 */
pub struct ArrangeCtx<'a> {
    clients: &'a mut HashMap<ClientId, Client>,
    order: &'a mut Vec<ClientId>,
    tagset: TagMask,
    pub screen: Rectangle,
    pub area: Rectangle,
    pub mfact: f32,
    pub nmaster: i32,
    pub colfact: [f32; 3],
    pub nmastercols: i32,
    pub nrightcols: i32,
    params: ArrangeParams,
    gap: i32,
    changed: Vec<ClientId>,
    symbol: Option<String>,
}

impl<'a> ArrangeCtx<'a> {
    pub fn new(reg: &'a mut Registry, mon: usize, params: ArrangeParams) -> ArrangeCtx<'a> {
        let (clients, monitors) = reg.parts_mut();
        let m = &mut monitors[mon];
        let gap = geometry::effective_gap(&m.screen, params.gap);

        ArrangeCtx {
            clients,
            tagset: m.tagset(),
            screen: m.screen,
            area: m.area,
            mfact: m.mfact,
            nmaster: m.nmaster,
            colfact: m.colfact,
            nmastercols: m.nmastercols,
            nrightcols: m.nrightcols,
            order: &mut m.clients,
            params,
            gap,
            changed: Vec::new(),
            symbol: None,
        }
    }

    pub fn finish(self) -> Arranged {
        Arranged {
            changed: self.changed,
            symbol: self.symbol,
        }
    }

    fn client_at(&self, pos: usize) -> Option<&Client> {
        self.order.get(pos).and_then(|id| self.clients.get(id))
    }

    fn is_tiled_at(&self, pos: usize) -> bool {
        self.client_at(pos)
            .map_or(false, |c| c.is_tiled() && c.is_visible_on(self.tagset))
    }

    /// Position in the tiling order of the next tiled, visible client at or after `from`
    pub fn next_tiled(&self, from: usize) -> Option<usize> {
        (from..self.order.len()).find(|&p| self.is_tiled_at(p))
    }

    pub fn count_tiled(&self) -> usize {
        (0..self.order.len()).filter(|&p| self.is_tiled_at(p)).count()
    }

    /// Visible clients, floating ones included
    pub fn count_visible(&self) -> usize {
        self.order
            .iter()
            .filter_map(|id| self.clients.get(id))
            .filter(|c| c.is_visible_on(self.tagset))
            .count()
    }

    pub fn bw(&self, pos: usize) -> i32 {
        self.client_at(pos).map_or(0, |c| c.bw)
    }

    pub fn cfact(&self, pos: usize) -> f32 {
        self.client_at(pos).map_or(1.0, |c| c.cfact)
    }

    fn hints(&self, pos: usize) -> SizeHints {
        self.client_at(pos).map(|c| c.hints).unwrap_or_default()
    }

    fn is_left(&self, pos: usize) -> bool {
        self.client_at(pos).map_or(false, |c| c.is_left)
    }

    /// The left column is only worth its space on wide monitors with many clients
    fn left_column_active(&self, n: usize) -> bool {
        self.area.w >= self.params.left_min_width && n >= self.params.left_min_clients
    }

    /// Move the given clients to the end of the tiling order, keeping their order.
    fn move_to_end(&mut self, ids: &[ClientId]) {
        if ids.is_empty() {
            return;
        }
        self.order.retain(|id| !ids.contains(id));
        self.order.extend_from_slice(ids);
    }

    /**
     * Place the client at `pos` with content size `w` x `h`.
     *
     * Returns the outer cell the client consumed (content plus borders, before
     * gaps) so callers can advance to the next slot.
     */
    pub fn resize(&mut self, pos: usize, x: i32, y: i32, w: i32, h: i32) -> Rectangle {
        let id = match self.order.get(pos) {
            Some(&id) => id,
            None => return Rectangle::new(x, y, w, h),
        };
        let (area, screen, gap, params) = (self.area, self.screen, self.gap, self.params);
        let c = match self.clients.get_mut(&id) {
            Some(c) => c,
            None => return Rectangle::new(x, y, w, h),
        };
        if c.is_keyboard {
            return c.outer();
        }

        let current = c.geometry();
        let mut req = Rectangle::new(x, y, w, h);
        let bounds = Bounds {
            area,
            screen,
            min_dim: params.min_dim,
        };
        geometry::apply_size_hints(
            &c.hints,
            &current,
            c.bw,
            &mut req,
            false,
            &bounds,
            params.resize_hints || c.is_floating,
        );

        let cell = Rectangle::new(req.x, req.y, req.w + 2 * c.bw, req.h + 2 * c.bw);
        let gapped = geometry::inset_gaps(&screen, &cell, gap);
        let content = Rectangle::new(
            gapped.x,
            gapped.y,
            (gapped.w - 2 * c.bw).max(1),
            (gapped.h - 2 * c.bw).max(1),
        );
        if content != current {
            c.set_geometry(&content);
            self.changed.push(id);
        }

        cell
    }
}

/// Width of a column given its weight and the total of all present columns
fn column_width(total_w: i32, weight: f32, total_weight: f32) -> i32 {
    if total_weight <= 0.0 {
        0
    } else {
        (total_w as f64 * weight as f64 / total_weight as f64).round() as i32
    }
}

/// Share of `remaining` owed to a client of weight `cfact` out of `facts`
fn share(remaining: i32, cfact: f32, facts: f32) -> i32 {
    if facts <= 0.0 {
        remaining
    } else {
        (remaining as f64 * cfact as f64 / facts as f64) as i32
    }
}

/// Master column plus stack column, heights split by cfact.
pub fn tile(ctx: &mut ArrangeCtx) {
    let n = ctx.count_tiled();
    if n == 0 {
        return;
    }
    let nmaster = ctx.nmaster.max(0) as usize;
    let area = ctx.area;

    let (mut mfacts, mut sfacts) = (0.0f32, 0.0f32);
    let mut i = 0;
    let mut pos = ctx.next_tiled(0);
    while let Some(p) = pos {
        if i < nmaster {
            mfacts += ctx.cfact(p);
        } else {
            sfacts += ctx.cfact(p);
        }
        i += 1;
        pos = ctx.next_tiled(p + 1);
    }

    let mw = if n > nmaster {
        if nmaster > 0 {
            (area.w as f64 * ctx.mfact as f64) as i32
        } else {
            0
        }
    } else {
        area.w
    };

    let (mut my, mut ty) = (0, 0);
    let masters = n.min(nmaster);
    let mut i = 0;
    let mut pos = ctx.next_tiled(0);
    while let Some(p) = pos {
        let bw = ctx.bw(p);
        let cf = ctx.cfact(p);
        if i < nmaster {
            let h = if i + 1 == masters {
                area.h - my
            } else {
                share(area.h - my, cf, mfacts)
            };
            let cell = ctx.resize(p, area.x, area.y + my, mw - 2 * bw, h - 2 * bw);
            my += cell.h;
            mfacts -= cf;
        } else {
            let h = if i + 1 == n {
                area.h - ty
            } else {
                share(area.h - ty, cf, sfacts)
            };
            let cell = ctx.resize(p, area.x + mw, area.y + ty, area.w - mw - 2 * bw, h - 2 * bw);
            ty += cell.h;
            sfacts -= cf;
        }
        i += 1;
        pos = ctx.next_tiled(p + 1);
    }
}

/// Everything gets the full area; the symbol shows how many clients are visible.
pub fn monocle(ctx: &mut ArrangeCtx) {
    let visible = ctx.count_visible();
    if visible > 0 {
        ctx.symbol = Some(format!("[{}]", visible));
    }
    let area = ctx.area;
    let mut pos = ctx.next_tiled(0);
    while let Some(p) = pos {
        let bw = ctx.bw(p);
        ctx.resize(p, area.x, area.y, area.w - 2 * bw, area.h - 2 * bw);
        pos = ctx.next_tiled(p + 1);
    }
}

/// A grid with as many columns as rows (or one more); trailing columns take an extra row.
pub fn gapless_grid(ctx: &mut ArrangeCtx) {
    let n = ctx.count_tiled() as i32;
    if n == 0 {
        return;
    }
    let area = ctx.area;

    let mut cols = 0;
    while cols <= n / 2 && cols * cols < n {
        cols += 1;
    }
    // 2:3 reads better than 1:2:2
    if n == 5 {
        cols = 2;
    }
    let mut rows = n / cols;
    let cw = area.w / cols;

    let (mut cn, mut rn) = (0, 0);
    let mut i = 0;
    let mut pos = ctx.next_tiled(0);
    while let Some(p) = pos {
        if i / rows + 1 > cols - n % cols {
            rows = n / cols + 1;
        }
        let ch = area.h / rows;
        let w = if cn + 1 == cols { area.w - cn * cw } else { cw };
        let h = if rn + 1 == rows { area.h - rn * ch } else { ch };
        let bw = ctx.bw(p);
        ctx.resize(p, area.x + cn * cw, area.y + rn * ch, w - 2 * bw, h - 2 * bw);

        rn += 1;
        if rn >= rows {
            rn = 0;
            cn += 1;
        }
        i += 1;
        pos = ctx.next_tiled(p + 1);
    }
}

/// Two rows: half the clients on top, the rest below.
pub fn horiz_grid(ctx: &mut ArrangeCtx) {
    let n = ctx.count_tiled() as i32;
    if n == 0 {
        return;
    }
    let area = ctx.area;
    let first = match ctx.next_tiled(0) {
        Some(p) => p,
        None => return,
    };

    if n == 1 {
        let bw = ctx.bw(first);
        ctx.resize(first, area.x, area.y, area.w - 2 * bw, area.h - 2 * bw);
        return;
    }

    if n == 2 {
        let second = match ctx.next_tiled(first + 1) {
            Some(p) => p,
            None => return,
        };
        let (b1, b2) = (ctx.bw(first), ctx.bw(second));
        if area.h < area.w {
            let w = area.w / 2;
            ctx.resize(first, area.x, area.y, w - 2 * b1, area.h - 2 * b1);
            ctx.resize(second, area.x + w, area.y, area.w - w - 2 * b2, area.h - 2 * b2);
        } else {
            let h = area.h / 2;
            ctx.resize(first, area.x, area.y, area.w - 2 * b1, h - 2 * b1);
            ctx.resize(second, area.x, area.y + h, area.w - 2 * b2, area.h - h - 2 * b2);
        }
        return;
    }

    let ntop = n / 2;
    let nbottom = n - ntop;
    let top_h = area.h / 2;
    let mut i = 0;
    let mut pos = Some(first);
    while let Some(p) = pos {
        let bw = ctx.bw(p);
        let (k, cols, y, h) = if i < ntop {
            (i, ntop, area.y, top_h)
        } else {
            (i - ntop, nbottom, area.y + top_h, area.h - top_h)
        };
        let x0 = k * area.w / cols;
        let x1 = (k + 1) * area.w / cols;
        ctx.resize(p, area.x + x0, y, x1 - x0 - 2 * bw, h - 2 * bw);
        i += 1;
        pos = ctx.next_tiled(p + 1);
    }
}

/**
 * Stack `count` tiled clients starting at `first` in one column.
 *
 * Heights are split by cfact in two passes: clients whose share would break
 * their min or max height are pinned to that height and taken out of the
 * pool, then the rest is shared out with the last unpinned client taking up
 * the rounding. Returns the position of the first client after the column.
 */
fn place_column(ctx: &mut ArrangeCtx, first: Option<usize>, count: usize, x: i32, w: i32) -> Option<usize> {
    let first = first?;
    if count == 0 {
        return Some(first);
    }

    let mut positions = Vec::with_capacity(count);
    let mut pos = Some(first);
    while let Some(p) = pos {
        if positions.len() == count {
            break;
        }
        positions.push(p);
        pos = ctx.next_tiled(p + 1);
    }
    let next = pos;
    let area = ctx.area;

    let mut cfacts: f32 = positions.iter().map(|&p| ctx.cfact(p)).sum();
    let mut pool = area.h;
    let mut pinned: Vec<Option<i32>> = vec![None; positions.len()];
    for (k, &p) in positions.iter().enumerate() {
        let hints = ctx.hints(p);
        let bw = ctx.bw(p);
        let cf = ctx.cfact(p);
        let ch = share(pool, cf, cfacts) - 2 * bw;
        let pin = if hints.max_h > 0 && ch > hints.max_h {
            Some(hints.max_h)
        } else if hints.min_h > 0 && ch < hints.min_h {
            Some(hints.min_h)
        } else {
            None
        };
        if let Some(h) = pin {
            pinned[k] = Some(h);
            cfacts -= cf;
            pool -= h + 2 * bw;
        }
    }

    let last_free = pinned.iter().rposition(|p| p.is_none());
    let mut remaining = pool;
    let mut y = area.y;
    for (k, &p) in positions.iter().enumerate() {
        let hints = ctx.hints(p);
        let bw = ctx.bw(p);
        let ch = match pinned[k] {
            Some(h) => h,
            None if Some(k) == last_free => remaining - 2 * bw,
            None => {
                let h = share(pool, ctx.cfact(p), cfacts);
                remaining -= h;
                h - 2 * bw
            }
        };
        let mut cw = w - 2 * bw;
        if hints.max_w > 0 && cw > hints.max_w {
            cw = hints.max_w;
        } else if hints.min_w > 0 && cw < hints.min_w {
            cw = hints.min_w;
        }
        let cell = ctx.resize(p, x, y, cw, ch);
        y += cell.h;
    }

    next
}

/**
 * Three columns: a master in the middle, a right column, and a narrow left
 * column for clients pushed there. The tiling order is rewritten so right
 * column clients come before left column ones.
 */
pub fn mtcl(ctx: &mut ArrangeCtx) {
    let n = ctx.count_tiled();
    let master = match ctx.next_tiled(0) {
        Some(p) => p,
        None => return,
    };
    let left_active = ctx.left_column_active(n);

    let (mut rights, mut lefts) = (Vec::new(), Vec::new());
    let mut pos = ctx.next_tiled(master + 1);
    while let Some(p) = pos {
        if left_active && ctx.is_left(p) {
            lefts.push(ctx.order[p]);
        } else {
            rights.push(ctx.order[p]);
        }
        pos = ctx.next_tiled(p + 1);
    }
    let (rightn, leftn) = (rights.len(), lefts.len());
    let tail: Vec<ClientId> = rights.into_iter().chain(lefts.into_iter()).collect();
    ctx.move_to_end(&tail);

    let area = ctx.area;
    let cf = ctx.colfact;
    let mut total = cf[1];
    if leftn > 0 {
        total += cf[0];
    }
    if rightn > 0 {
        total += cf[2];
    }
    let leftw = if leftn > 0 {
        column_width(area.w, cf[0], total)
    } else {
        0
    };
    let masterw = if rightn > 0 {
        column_width(area.w, cf[1], total)
    } else {
        area.w - leftw
    };
    let rightw = area.w - leftw - masterw;

    let pos = ctx.next_tiled(0);
    let pos = place_column(ctx, pos, 1, area.x + leftw, masterw);
    let pos = place_column(ctx, pos, rightn, area.x + leftw + masterw, rightw);
    place_column(ctx, pos, leftn, area.x, leftw);
}

/**
 * A left column, `nmastercols` master columns and `nrightcols` right columns.
 * The first nmaster clients are masters; pushed-left clients move to the end
 * of the tiling order.
 */
pub fn varcol(ctx: &mut ArrangeCtx) {
    let n = ctx.count_tiled();
    if n == 0 {
        return;
    }
    let nmaster = ctx.nmaster.max(0) as usize;
    let left_active = ctx.left_column_active(n);

    let mut lefts = Vec::new();
    if left_active {
        let mut i = 0;
        let mut pos = ctx.next_tiled(0);
        while let Some(p) = pos {
            if i >= nmaster && ctx.is_left(p) {
                lefts.push(ctx.order[p]);
            }
            i += 1;
            pos = ctx.next_tiled(p + 1);
        }
        ctx.move_to_end(&lefts);
    }

    let mastern = n.min(nmaster);
    if mastern == 0 {
        return;
    }
    let leftn = lefts.len();
    let rightn = n - mastern - leftn;
    let mcols = (ctx.nmastercols.max(1) as usize).min(mastern);
    let rcols = if rightn > 0 {
        (ctx.nrightcols.max(1) as usize).min(rightn)
    } else {
        0
    };

    let area = ctx.area;
    let cf = ctx.colfact;
    let mut total = mcols as f32 * cf[1] + rcols as f32 * cf[2];
    if leftn > 0 {
        total += cf[0];
    }
    let leftw = if leftn > 0 {
        column_width(area.w, cf[0], total)
    } else {
        0
    };
    let masterw = column_width(area.w, cf[1], total);
    let rightw = column_width(area.w, cf[2], total);

    let mut columns: Vec<(usize, i32)> = Vec::with_capacity(mcols + rcols);
    for i in 0..mcols {
        let per = mastern / mcols;
        let count = if i + 1 < mcols { per } else { mastern - per * (mcols - 1) };
        columns.push((count, masterw));
    }
    for i in 0..rcols {
        let per = rightn / rcols;
        let count = if i + 1 < rcols { per } else { rightn - per * (rcols - 1) };
        columns.push((count, rightw));
    }

    let mut x = area.x + leftw;
    let mut pos = ctx.next_tiled(0);
    let ncols = columns.len();
    for (k, (count, w)) in columns.into_iter().enumerate() {
        let w = if k + 1 == ncols { area.x + area.w - x } else { w };
        pos = place_column(ctx, pos, count, x, w);
        x += w;
    }
    if leftn > 0 {
        place_column(ctx, pos, leftn, area.x, leftw);
    }
}

/**
 * Set the border width of every visible client on a monitor.
 *
 * Tiled clients lose their border in monocle, on small monitors, or when
 * they are the only tiled client. Returns the clients whose width changed.
 */
pub fn adjust_borders(reg: &mut Registry, mon: usize, kind: LayoutKind, border_px: i32) -> Vec<ClientId> {
    let visible = reg.visible(mon);
    let ntiled = visible
        .iter()
        .filter(|&&id| reg.get(id).map_or(false, |c| c.is_tiled()))
        .count();
    let small = reg
        .monitors
        .get(mon)
        .map_or(false, |m| geometry::is_small_monitor(&m.screen));

    let mut changed = Vec::new();
    for id in visible {
        if let Some(c) = reg.get_mut(id) {
            if c.is_fullscreen {
                continue;
            }
            let bw = if c.is_floating || !kind.arranges() {
                border_px
            } else if kind == LayoutKind::Monocle || small || ntiled == 1 {
                0
            } else {
                border_px
            };
            if c.bw != bw {
                c.bw = bw;
                changed.push(id);
            }
        }
    }
    changed
}
