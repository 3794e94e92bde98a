//! The user commands bound to keys and buttons.
use std::{
    io::{BufRead, BufReader},
    process::{Command as Process, Stdio},
};

use anyhow::{anyhow, Context, Result};

use crate::{
    bar::Draw,
    bindings::Command,
    client::ClientId,
    monitor::TabMode,
    process::spawn,
    rule::{CFACT_MAX, CFACT_MIN},
    tag::{first_tag, tag_bit},
    wm::WindowManager,
    xconnection::{Rectangle, WindowChanges, XConn},
};

const MFACT_MIN: f32 = 0.05;
const MFACT_MAX: f32 = 0.95;
const COLFACT_MIN: f32 = 0.1;
const COLFACT_MAX: f32 = 0.9;

/// Which multi-column layout column the selected client sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Left,
    Master,
    Right,
}

impl<'a, X: XConn + Draw> WindowManager<'a, X> {
    /// Run a bound command. Commands that need a selected client do nothing without one.
    pub(crate) fn execute(&mut self, cmd: &Command) {
        debug!("running command {:?}", cmd);
        match cmd {
            Command::Spawn(args) => spawn(args),
            Command::ToggleBar => self.toggle_bar(),
            Command::TabMode(i) => {
                let m = self.reg.selmon_mut();
                m.tab_mode = if *i >= 0 {
                    TabMode::from_index(*i)
                } else {
                    m.tab_mode.cycle()
                };
                self.arrange(Some(self.reg.selmon));
            }
            Command::FocusStack(dir) => self.focus_stack(*dir),
            Command::FocusWin(n) => self.focus_win(*n),
            Command::IncNMaster(i) => {
                let m = self.reg.selmon_mut();
                m.nmaster = (m.nmaster + i).max(0);
                self.arrange(Some(self.reg.selmon));
            }
            Command::IncNCols(i) => self.inc_ncols(*i),
            Command::IncNRightCols(i) => {
                let m = self.reg.selmon_mut();
                m.nrightcols = (m.nrightcols + i).max(0);
                self.arrange(Some(self.reg.selmon));
            }
            Command::SetMFact(f) => self.set_mfact(*f),
            Command::SetCFact(f) => self.set_cfact(*f),
            Command::SetColFact(f) => self.set_colfact(*f),
            Command::PushUp => self.push_up(),
            Command::PushDown => self.push_down(),
            Command::PushLeft => {
                if let Some(sel) = self.reg.sel() {
                    if let Some(c) = self.reg.get_mut(sel) {
                        c.is_left = !c.is_left;
                    }
                    self.focus(Some(sel));
                }
                self.arrange(Some(self.reg.selmon));
            }
            Command::Zoom => self.zoom(),
            Command::KillClient => {
                if let Some(c) = self.reg.sel().and_then(|id| self.reg.get(id)) {
                    self.conn.signal_delete_window(c.win);
                }
            }
            Command::SetLayout(lt) => self.set_layout(*lt),
            Command::NextLayout => {
                let next = (self.reg.selmon().layout() + 1) % self.config.layouts.len().max(1);
                self.set_layout(Some(next));
            }
            Command::ForceTile => {
                if let Some(sel) = self.reg.sel() {
                    if let Some(c) = self.reg.get_mut(sel) {
                        c.is_floating = false;
                    }
                    self.arrange(Some(self.reg.selmon));
                }
            }
            Command::ToggleFloating => self.toggle_floating(),
            Command::ToggleSwallow => self.toggle_swallow(),
            Command::View(mask) => self.view(*mask),
            Command::ToggleView(mask) => self.toggle_view(*mask),
            Command::ComboView(i) => self.combo_view(*i),
            Command::Tag(mask) => self.tag(*mask),
            Command::ToggleTag(mask) => self.toggle_tag(*mask),
            Command::ComboTag(mask) => self.combo_tag(*mask),
            Command::FocusMon(dir) => self.focus_mon(*dir),
            Command::TagMon(dir) => {
                if let Some(sel) = self.reg.sel() {
                    if self.reg.monitors.len() > 1 {
                        let target = self.reg.dir_to_mon(*dir);
                        self.send_mon(sel, target);
                    }
                }
            }
            Command::NameTag => {
                if let Err(e) = self.name_tag() {
                    warn!("unable to name tag: {:#}", e);
                }
            }
            Command::MoveMouse => self.move_mouse(),
            Command::ResizeMouse => self.resize_mouse(),
            Command::Quit => {
                info!("quitting");
                self.running = false;
            }
        }
    }

    fn toggle_bar(&mut self) {
        let selmon = self.reg.selmon;
        let m = self.reg.selmon_mut();
        m.show_bar = !m.show_bar;
        self.update_bar_pos(selmon);
        self.resize_bar_win(selmon);
        if let Some(tray) = &self.systray {
            let m = self.reg.selmon();
            let y = if m.show_bar { m.by } else { -self.bh };
            self.conn.configure_window(
                tray.win,
                &WindowChanges {
                    y: Some(y),
                    ..WindowChanges::default()
                },
            );
        }
        self.arrange(Some(selmon));
    }

    /// Visible, non-keyboard clients of the selected monitor in tiling order
    fn focusable(&self) -> Vec<ClientId> {
        self.reg
            .visible(self.reg.selmon)
            .into_iter()
            .filter(|&id| self.reg.get(id).map_or(false, |c| !c.is_keyboard))
            .collect()
    }

    fn focus_stack(&mut self, dir: i32) {
        let sel = match self.reg.sel() {
            Some(sel) => sel,
            None => return,
        };
        let order = &self.reg.selmon().clients;
        let pos = match order.iter().position(|&c| c == sel) {
            Some(p) => p,
            None => return,
        };
        let candidates = self.focusable();
        let next = if dir > 0 {
            order[pos + 1..]
                .iter()
                .chain(order[..pos].iter())
                .copied()
                .find(|c| candidates.contains(c))
        } else {
            order[..pos]
                .iter()
                .rev()
                .chain(order[pos + 1..].iter().rev())
                .copied()
                .find(|c| candidates.contains(c))
        };
        if let Some(c) = next {
            self.focus(Some(c));
            self.restack(self.reg.selmon, true);
        }
    }

    fn focus_win(&mut self, n: usize) {
        if let Some(&c) = self.reg.visible(self.reg.selmon).get(n) {
            self.focus(Some(c));
            self.restack(self.reg.selmon, true);
        }
    }

    /// The column of the multi-column layouts the selected client is placed in.
    fn sel_column(&self) -> Option<Column> {
        let sel = self.reg.sel()?;
        if !self.layout_kind(self.reg.selmon).arranges() {
            return None;
        }
        let pos = self.reg.tiled(self.reg.selmon).iter().position(|&c| c == sel);
        let nmaster = self.reg.selmon().nmaster.max(0) as usize;
        Some(match pos {
            Some(i) if i < nmaster => Column::Master,
            _ if self.reg.get(sel).map_or(false, |c| c.is_left) => Column::Left,
            _ => Column::Right,
        })
    }

    fn inc_ncols(&mut self, i: i32) {
        let col = match self.sel_column() {
            Some(col) => col,
            None => return,
        };
        let m = self.reg.selmon_mut();
        match col {
            Column::Master => {
                m.nmastercols = (m.nmastercols + i).max(0);
                m.nmaster = m.nmaster.max(m.nmastercols);
            }
            Column::Right => m.nrightcols = (m.nrightcols + i).max(0),
            Column::Left => (),
        }
        self.arrange(Some(self.reg.selmon));
    }

    /// f < 1.0 adjusts the master fraction, f >= 1.0 sets it to f - 1.0.
    fn set_mfact(&mut self, f: f32) {
        if !self.layout_kind(self.reg.selmon).arranges() {
            return;
        }
        let m = self.reg.selmon_mut();
        let f = if f < 1.0 { f + m.mfact } else { f - 1.0 };
        if !(MFACT_MIN..=MFACT_MAX).contains(&f) {
            return;
        }
        m.mfact = f;
        self.arrange(Some(self.reg.selmon));
    }

    /// Adjust the selected client's weight; zero resets it.
    fn set_cfact(&mut self, f: f32) {
        let sel = match self.reg.sel() {
            Some(sel) if self.layout_kind(self.reg.selmon).arranges() => sel,
            _ => return,
        };
        let c = match self.reg.get_mut(sel) {
            Some(c) => c,
            None => return,
        };
        let new = if f == 0.0 { 1.0 } else { f + c.cfact };
        if !(CFACT_MIN..=CFACT_MAX).contains(&new) {
            return;
        }
        c.cfact = new;
        self.arrange(Some(self.reg.selmon));
    }

    /// Adjust the weight of the selected client's column; f >= 1.0 sets it to f - 1.0.
    fn set_colfact(&mut self, f: f32) {
        let index = match self.sel_column() {
            Some(Column::Left) => 0,
            Some(Column::Master) => 1,
            Some(Column::Right) => 2,
            None => return,
        };
        let m = self.reg.selmon_mut();
        let v = if f >= 1.0 { f - 1.0 } else { m.colfact[index] + f };
        m.colfact[index] = v.max(COLFACT_MIN).min(COLFACT_MAX);
        self.arrange(Some(self.reg.selmon));
    }

    /// Move the selected client before the previous tiled one, wrapping to the end.
    fn push_up(&mut self) {
        let sel = match self.reg.sel() {
            Some(sel) if self.reg.get(sel).map_or(false, |c| c.is_tiled()) => sel,
            _ => return,
        };
        let tiled = self.reg.tiled(self.reg.selmon);
        let pos = match tiled.iter().position(|&c| c == sel) {
            Some(p) => p,
            None => return,
        };
        let order = &mut self.reg.selmon_mut().clients;
        order.retain(|&c| c != sel);
        if pos == 0 {
            order.push(sel);
        } else {
            let before = order.iter().position(|&c| c == tiled[pos - 1]).unwrap_or(0);
            order.insert(before, sel);
        }
        self.focus(Some(sel));
        self.arrange(Some(self.reg.selmon));
    }

    /// Move the selected client after the next tiled one, wrapping to the head.
    fn push_down(&mut self) {
        let sel = match self.reg.sel() {
            Some(sel) if self.reg.get(sel).map_or(false, |c| c.is_tiled()) => sel,
            _ => return,
        };
        let tiled = self.reg.tiled(self.reg.selmon);
        let pos = match tiled.iter().position(|&c| c == sel) {
            Some(p) => p,
            None => return,
        };
        let order = &mut self.reg.selmon_mut().clients;
        order.retain(|&c| c != sel);
        match tiled.get(pos + 1) {
            Some(next) => {
                let after = order.iter().position(|c| c == next).map_or(order.len(), |p| p + 1);
                order.insert(after, sel);
            }
            None => order.insert(0, sel),
        }
        self.focus(Some(sel));
        self.arrange(Some(self.reg.selmon));
    }

    /// Swap the selection with the master, or bring the next client up if it already is.
    fn zoom(&mut self) {
        let sel = self.reg.sel();
        if !self.layout_kind(self.reg.selmon).arranges()
            || sel.and_then(|id| self.reg.get(id)).map_or(false, |c| c.is_floating)
        {
            return;
        }
        let tiled = self.reg.tiled(self.reg.selmon);
        let target = match sel {
            Some(c) if tiled.first() == Some(&c) => tiled.get(1).copied(),
            other => other,
        };
        if let Some(c) = target {
            self.pop(c);
        }
    }

    /// Move a client to the head of the tiling order and focus it.
    pub(crate) fn pop(&mut self, id: ClientId) {
        self.reg.detach(id);
        self.reg.attach(id);
        self.focus(Some(id));
        let mon = self.reg.get(id).map_or(self.reg.selmon, |c| c.mon);
        self.arrange(Some(mon));
    }

    /**
     * Switch the selected monitor's layout. None (or the layout already in
     * use) swaps back to the previous layout slot.
     */
    pub(crate) fn set_layout(&mut self, lt: Option<usize>) {
        let lt = lt.filter(|&i| i < self.config.layouts.len());
        let m = self.reg.selmon_mut();
        if lt.map_or(true, |i| i != m.layout()) {
            m.sellt ^= 1;
        }
        if let Some(i) = lt {
            m.lt[m.sellt] = i;
        }
        if let Some(l) = self.config.layouts.get(m.layout()) {
            m.ltsymbol = l.symbol.clone();
        }

        if self.reg.sel().is_some() {
            self.arrange(Some(self.reg.selmon));
        } else {
            self.draw_bar(self.reg.selmon);
        }
    }

    pub(crate) fn toggle_floating(&mut self) {
        let sel = match self.reg.sel() {
            Some(sel) => sel,
            None => return,
        };
        let (floating, r) = match self.reg.get_mut(sel) {
            Some(c) if !c.is_fullscreen => {
                c.is_floating = !c.is_floating || c.is_fixed;
                if c.is_floating && c.bw == 0 && c.old_bw != 0 {
                    c.bw = c.old_bw;
                    c.old_bw = 0;
                }
                (c.is_floating, c.geometry())
            }
            _ => return,
        };
        if floating {
            self.resize(sel, r, false);
        }
        self.arrange(Some(self.reg.selmon));
    }

    pub(crate) fn view(&mut self, mask: u32) {
        let mask = mask & self.tags.mask();
        let m = self.reg.selmon_mut();
        if mask == m.tagset() {
            return;
        }
        m.seltags ^= 1;
        if mask != 0 {
            m.tagset[m.seltags] = mask;
        }
        self.focus(None);
        self.arrange(Some(self.reg.selmon));
    }

    fn toggle_view(&mut self, mask: u32) {
        let mask = mask & self.tags.mask();
        let m = self.reg.selmon_mut();
        let new = m.tagset() ^ mask;
        if new != 0 {
            m.tagset[m.seltags] = new;
            self.focus(None);
            self.arrange(Some(self.reg.selmon));
        }
    }

    /**
     * View a tag the combo way.
     *
     * While the combo key is held further tags are added to the view.
     * Otherwise the view flips slots: a tag that is already the create target
     * is shown alone, any other tag is shown together with what was on screen
     * the last time it was left. A negative index returns to the previous slot.
     */
    pub(crate) fn combo_view(&mut self, i: i32) {
        let all = self.tags.mask();
        let newtags = if i >= 0 { tag_bit(i as usize) & all } else { 0 };
        let combo = self.combo;
        let m = self.reg.selmon_mut();
        let mut active = i >= 0 && m.createtag[m.seltags] == i as usize;

        m.remember_tag();

        if combo && i >= 0 {
            m.tagset[m.seltags] |= newtags;
        } else {
            m.seltags ^= 1;
            let newcreate = if i < 0 {
                active = false;
                m.createtag[m.seltags]
            } else {
                i as usize
            };
            self.combo = true;

            if active {
                m.tagset[m.seltags] = newtags;
            } else if let Some(r) = m.remembered.get(newcreate).copied() {
                let base = if i < 0 { m.tagset[m.seltags] } else { newtags };
                m.tagset[m.seltags] = base | r.tagset;
                m.zoomed[m.seltags] = r.zoomed;
            }
            m.createtag[m.seltags] = newcreate;

            // the remembered client may be long gone
            let zoomed = m.zoomed[m.seltags].filter(|z| m.clients.contains(z));
            if let Some(z) = zoomed {
                self.pop(z);
            }
        }
        self.focus(None);
        self.arrange(Some(self.reg.selmon));
    }

    fn tag(&mut self, mask: u32) {
        let mask = mask & self.tags.mask();
        if mask == 0 {
            return;
        }
        if let Some(c) = self.reg.sel().and_then(|id| self.reg.get_mut(id)) {
            c.tags = mask;
            self.focus(None);
            self.arrange(Some(self.reg.selmon));
        }
    }

    fn toggle_tag(&mut self, mask: u32) {
        let mask = mask & self.tags.mask();
        if let Some(c) = self.reg.sel().and_then(|id| self.reg.get_mut(id)) {
            let new = c.tags ^ mask;
            if new != 0 {
                c.tags = new;
                self.focus(None);
                self.arrange(Some(self.reg.selmon));
            }
        }
    }

    /// Move the selection to a tag; tags pressed while the combo key is held are added.
    fn combo_tag(&mut self, mask: u32) {
        let mask = mask & self.tags.mask();
        if mask == 0 {
            return;
        }
        let sel = match self.reg.sel() {
            Some(sel) => sel,
            None => return,
        };
        let combo = self.combo;
        if let Some(c) = self.reg.get_mut(sel) {
            if combo {
                c.tags |= mask;
            } else {
                c.tags = mask;
            }
        }
        self.combo = true;
        self.focus(None);
        self.arrange(Some(self.reg.selmon));
    }

    fn focus_mon(&mut self, dir: i32) {
        if self.reg.monitors.len() < 2 {
            return;
        }
        let target = self.reg.dir_to_mon(dir);
        if target == self.reg.selmon {
            return;
        }
        if let Some(sel) = self.reg.sel() {
            self.unfocus(sel, false);
        }
        self.reg.selmon = target;
        self.focus(None);
        self.warp(self.reg.sel());
    }

    /// Move a client to another monitor, onto the tags that monitor is viewing.
    pub(crate) fn send_mon(&mut self, id: ClientId, mon: usize) {
        match self.reg.get(id) {
            Some(c) if c.mon != mon && mon < self.reg.monitors.len() => (),
            _ => return,
        }
        self.unfocus(id, true);
        self.reg.detach(id);
        self.reg.detach_stack(id);
        let tags = self.reg.monitors[mon].tagset();
        if let Some(c) = self.reg.get_mut(id) {
            c.mon = mon;
            c.tags = tags;
        }
        self.reg.attach_aside(id);
        self.reg.attach_stack(id);
        self.focus(None);
        self.arrange(None);
    }

    /// Ask dmenu for a new name for the viewed tags.
    fn name_tag(&mut self) -> Result<()> {
        let mut child = Process::new("dmenu")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .context("unable to run dmenu")?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow!("dmenu has no stdout"))?;
        let mut name = String::new();
        BufReader::new(stdout)
            .read_line(&mut name)
            .context("unable to read from dmenu")?;
        child.wait().context("dmenu did not exit cleanly")?;

        let name = name.trim_end_matches('\n');
        if name.is_empty() {
            return Ok(());
        }
        let tagset = self.reg.selmon().tagset();
        debug!("renaming tag {:?} to '{}'", first_tag(tagset), name);
        self.tags.rename(tagset, name);
        self.draw_bars();
        Ok(())
    }

    /// Monitor under a client's current geometry.
    pub(crate) fn client_mon(&self, id: ClientId) -> Option<usize> {
        let c = self.reg.get(id)?;
        Some(self.reg.rect_to_mon(&Rectangle::new(c.x, c.y, c.w, c.h)))
    }
}
