//! Monitors and their reconciliation against the physical outputs.
use xcb::Window;

use crate::{
    client::ClientId,
    config::Config,
    registry::Registry,
    tag::TagMask,
    xconnection::Rectangle,
};

/// When the tab bar of a monitor is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabMode {
    Never,
    /// Only in monocle with more than one visible client
    Auto,
    Always,
}

impl TabMode {
    /// Next mode when cycling. Cycling only alternates between never and auto.
    pub fn cycle(self) -> TabMode {
        match self {
            TabMode::Never => TabMode::Auto,
            _ => TabMode::Never,
        }
    }

    pub fn from_index(i: i32) -> TabMode {
        match i {
            0 => TabMode::Never,
            1 => TabMode::Auto,
            _ => TabMode::Always,
        }
    }
}

/// What a tag looked like the last time it was left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Remembered {
    pub tagset: TagMask,
    pub zoomed: Option<ClientId>,
}

/// One output and its independent view, layout and client lists
#[derive(Debug, Clone)]
pub struct Monitor {
    pub num: usize,
    pub ltsymbol: String,
    pub mfact: f32,
    pub colfact: [f32; 3],
    pub nmaster: i32,
    pub nmastercols: i32,
    pub nrightcols: i32,
    /// Physical output geometry
    pub screen: Rectangle,
    /// Space left for clients once the bars are taken out
    pub area: Rectangle,
    /// Bar y position, off screen when hidden
    pub by: i32,
    /// Tab bar y position, off screen when hidden
    pub ty: i32,
    pub seltags: usize,
    pub sellt: usize,
    pub tagset: [TagMask; 2],
    /// Tag new clients are created on, per tagset slot
    pub createtag: [usize; 2],
    /// Client to pop to master when a slot is returned to
    pub zoomed: [Option<ClientId>; 2],
    pub remembered: Vec<Remembered>,
    pub show_bar: bool,
    pub top_bar: bool,
    pub tab_mode: TabMode,
    pub top_tab: bool,
    /// Tiling order
    pub clients: Vec<ClientId>,
    /// Focus history, most recent first
    pub stack: Vec<ClientId>,
    pub sel: Option<ClientId>,
    pub barwin: Window,
    pub tabwin: Window,
    /// Width of every tab in the tab bar, in visible client order
    pub tab_widths: Vec<i32>,
    /// Indices into the layout table
    pub lt: [usize; 2],
}

impl Monitor {
    pub fn new(config: &Config, num: usize) -> Monitor {
        let num_tags = config.tags.len();
        let mut remembered = vec![Remembered::default(); num_tags.max(1)];
        remembered[0].tagset = 1;
        let lt0 = 0;
        let lt1 = 1 % config.layouts.len().max(1);

        Monitor {
            num,
            ltsymbol: config
                .layouts
                .get(lt0)
                .map(|l| l.symbol.clone())
                .unwrap_or_default(),
            mfact: config.mfact,
            colfact: config.colfact,
            nmaster: config.nmaster,
            nmastercols: config.nmastercols,
            nrightcols: config.nrightcols,
            screen: Rectangle::default(),
            area: Rectangle::default(),
            by: 0,
            ty: 0,
            seltags: 0,
            sellt: 0,
            tagset: [1, 1],
            createtag: [0, 0],
            zoomed: [None, None],
            remembered,
            show_bar: config.show_bar,
            top_bar: config.top_bar,
            tab_mode: config.tab_mode,
            top_tab: config.top_tab,
            clients: Vec::new(),
            stack: Vec::new(),
            sel: None,
            barwin: 0,
            tabwin: 0,
            tab_widths: Vec::new(),
            lt: [lt0, lt1],
        }
    }

    /// The tags currently in view
    pub fn tagset(&self) -> TagMask {
        self.tagset[self.seltags]
    }

    /// Index of the active layout
    pub fn layout(&self) -> usize {
        self.lt[self.sellt]
    }

    pub fn set_geometry(&mut self, r: Rectangle) {
        self.screen = r;
        self.area = r;
    }

    pub fn is_portrait(&self) -> bool {
        self.screen.w < self.screen.h
    }

    /// Carve the bar (and tab bar when wanted) out of the screen area.
    pub fn update_bar_pos(&mut self, bar_height: i32, show_tabs: bool) {
        self.area = self.screen;
        if self.show_bar {
            self.area.h -= bar_height;
            self.by = if self.top_bar {
                self.area.y
            } else {
                self.area.y + self.area.h
            };
            if self.top_bar {
                self.area.y += bar_height;
            }
        } else {
            self.by = -bar_height;
        }

        if show_tabs {
            self.area.h -= bar_height;
            self.ty = if self.top_tab {
                self.area.y
            } else {
                self.area.y + self.area.h
            };
            if self.top_tab {
                self.area.y += bar_height;
            }
        } else {
            self.ty = -bar_height;
        }
    }

    /// Remember the current view of the create tag along with its head client.
    pub fn remember_tag(&mut self) {
        let cur = self.createtag[self.seltags];
        let head = self.clients.first().copied();
        let tagset = self.tagset();
        if let Some(r) = self.remembered.get_mut(cur) {
            r.tagset = tagset;
            r.zoomed = head;
        }
    }
}

/// What a reconciliation against the outputs changed
#[derive(Debug, Default, PartialEq)]
pub struct Reconciled {
    /// Some monitor was added, removed or changed geometry
    pub dirty: bool,
    /// Bar and tab windows of removed monitors
    pub removed_windows: Vec<Window>,
}

/// Outputs with identical geometry show the same thing; keep the first of each.
pub fn unique_outputs(outputs: &[Rectangle]) -> Vec<Rectangle> {
    let mut unique: Vec<Rectangle> = Vec::with_capacity(outputs.len());
    for o in outputs {
        if o.w > 0 && o.h > 0 && !unique.contains(o) {
            unique.push(*o);
        }
    }
    unique
}

impl Registry {
    /**
     * Bring the monitor list in line with the current outputs.
     *
     * New outputs get new monitors. When outputs go away the trailing
     * monitors are removed and their clients are appended, in order, to the
     * tiling and focus lists of the first monitor. An empty output list
     * leaves a single monitor covering `fallback`.
     */
    pub fn reconcile_outputs(&mut self, outputs: &[Rectangle], fallback: Rectangle, config: &Config) -> Reconciled {
        let mut outputs = unique_outputs(outputs);
        if outputs.is_empty() {
            outputs.push(fallback);
        }
        let mut result = Reconciled::default();
        let n = self.monitors.len();
        let nn = outputs.len();

        if n < nn {
            for i in n..nn {
                self.monitors.push(Monitor::new(config, i));
            }
        }
        for (i, r) in outputs.iter().enumerate() {
            let m = &mut self.monitors[i];
            if i >= n || m.screen != *r {
                result.dirty = true;
                m.num = i;
                m.set_geometry(*r);
            }
        }

        while self.monitors.len() > nn {
            let last = self.monitors.len() - 1;
            self.migrate_clients(last, 0);
            let m = self.monitors.remove(last);
            result.removed_windows.extend([m.barwin, m.tabwin].iter().filter(|&&w| w != 0));
            result.dirty = true;
            if self.selmon >= self.monitors.len() {
                self.selmon = 0;
            }
        }

        if result.dirty {
            info!("monitors reconciled: {:?}", outputs);
        }
        result
    }

    /// Move every client of `from` to `to`, keeping their relative order.
    fn migrate_clients(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let clients = std::mem::take(&mut self.monitors[from].clients);
        let stack = std::mem::take(&mut self.monitors[from].stack);
        self.monitors[from].sel = None;
        for &id in clients.iter().chain(stack.iter()) {
            if let Some(c) = self.get_mut(id) {
                c.mon = to;
            }
        }
        let target = &mut self.monitors[to];
        for id in clients {
            if !target.clients.contains(&id) {
                target.clients.push(id);
            }
        }
        for id in stack {
            if !target.stack.contains(&id) {
                target.stack.push(id);
            }
        }
    }
}
