//! Ownership of every managed client and the per-monitor orderings.
use std::collections::HashMap;

use xcb::Window;

use crate::{
    client::{Client, ClientId, Swallow},
    monitor::Monitor,
    xconnection::Rectangle,
};

/**
 * The set of managed clients and the monitors showing them.
 *
 * Clients live in a map keyed by [ClientId]. Each monitor owns two ordered
 * lists of ids: `clients` (tiling order) and `stack` (focus history, most
 * recent first). A client is listed on at most the monitor named by its
 * `mon` field, and at most once in each list.
 */
#[derive(Debug, Default)]
pub struct Registry {
    clients: HashMap<ClientId, Client>,
    pub monitors: Vec<Monitor>,
    /// Index of the selected monitor
    pub selmon: usize,
    next_id: usize,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Take ownership of a client without listing it anywhere yet.
    pub fn insert(&mut self, client: Client) -> ClientId {
        let id = ClientId(self.next_id);
        self.next_id += 1;
        self.clients.insert(id, client);
        id
    }

    /// Drop a client, unlinking it from both orderings first.
    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        self.detach(id);
        self.detach_stack(id);
        self.clients.remove(&id)
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn clients(&self) -> impl Iterator<Item = (ClientId, &Client)> {
        self.clients.iter().map(|(&id, c)| (id, c))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Split borrow used by the layout engine
    pub(crate) fn parts_mut(&mut self) -> (&mut HashMap<ClientId, Client>, &mut Vec<Monitor>) {
        (&mut self.clients, &mut self.monitors)
    }

    pub fn selmon(&self) -> &Monitor {
        &self.monitors[self.selmon]
    }

    pub fn selmon_mut(&mut self) -> &mut Monitor {
        let i = self.selmon;
        &mut self.monitors[i]
    }

    /// The focused client of the selected monitor
    pub fn sel(&self) -> Option<ClientId> {
        self.monitors.get(self.selmon).and_then(|m| m.sel)
    }

    pub fn is_visible(&self, id: ClientId) -> bool {
        match self.clients.get(&id) {
            Some(c) => self
                .monitors
                .get(c.mon)
                .map_or(false, |m| c.is_visible_on(m.tagset())),
            None => false,
        }
    }

    fn is_tiled_visible(&self, id: ClientId) -> bool {
        self.clients.get(&id).map_or(false, |c| c.is_tiled()) && self.is_visible(id)
    }

    /// Insert at the head of the tiling order of the client's monitor.
    pub fn attach(&mut self, id: ClientId) {
        if let Some(mon) = self.clients.get(&id).map(|c| c.mon) {
            let m = &mut self.monitors[mon];
            if !m.clients.contains(&id) {
                m.clients.insert(0, id);
            }
        }
    }

    /**
     * Insert right after the monitor's focused client so new windows open
     * next to what the user is looking at. Falls back to the head of the list
     * when nothing tiled and visible is focused.
     */
    pub fn attach_aside(&mut self, id: ClientId) {
        let mon = match self.clients.get(&id) {
            Some(c) => c.mon,
            None => return,
        };
        if self.monitors[mon].clients.contains(&id) {
            return;
        }
        let anchor = self.monitors[mon]
            .sel
            .filter(|&sel| sel != id && self.is_tiled_visible(sel))
            .and_then(|sel| self.monitors[mon].clients.iter().position(|&c| c == sel));

        match anchor {
            Some(pos) => self.monitors[mon].clients.insert(pos + 1, id),
            None => self.attach(id),
        }
    }

    pub fn detach(&mut self, id: ClientId) {
        if let Some(mon) = self.clients.get(&id).map(|c| c.mon) {
            self.monitors[mon].clients.retain(|&c| c != id);
        }
    }

    /// Make a client the most recent entry of its monitor's focus history.
    pub fn attach_stack(&mut self, id: ClientId) {
        if let Some(mon) = self.clients.get(&id).map(|c| c.mon) {
            let m = &mut self.monitors[mon];
            if !m.stack.contains(&id) {
                m.stack.insert(0, id);
            }
        }
    }

    /// Remove from the focus history, re-selecting the next visible client if needed.
    pub fn detach_stack(&mut self, id: ClientId) {
        let mon = match self.clients.get(&id) {
            Some(c) => c.mon,
            None => return,
        };
        self.monitors[mon].stack.retain(|&c| c != id);
        if self.monitors[mon].sel == Some(id) {
            let next = self.first_visible_in_stack(mon);
            self.monitors[mon].sel = next;
        }
    }

    pub fn first_visible_in_stack(&self, mon: usize) -> Option<ClientId> {
        self.monitors
            .get(mon)?
            .stack
            .iter()
            .copied()
            .find(|&c| self.is_visible(c))
    }

    /// Find the client showing a window, scanning every monitor.
    pub fn win_to_client(&self, win: Window) -> Option<ClientId> {
        self.monitors
            .iter()
            .flat_map(|m| m.clients.iter())
            .copied()
            .find(|id| self.clients.get(id).map_or(false, |c| c.win == win))
    }

    /// Find the client that is keeping `win` hidden while it shows a swallowed child.
    pub fn swallowing_client(&self, win: Window) -> Option<ClientId> {
        self.clients
            .iter()
            .find(|(_, c)| matches!(c.swallow, Swallow::Active { hidden, .. } if hidden == win))
            .map(|(&id, _)| id)
    }

    /// Position of the next tiled, visible client at or after `from`.
    pub fn next_tiled(&self, mon: usize, from: usize) -> Option<usize> {
        let list = &self.monitors.get(mon)?.clients;
        (from..list.len()).find(|&i| self.is_tiled_visible(list[i]))
    }

    /// Tiled, visible clients of a monitor in tiling order.
    pub fn tiled(&self, mon: usize) -> Vec<ClientId> {
        self.monitors.get(mon).map_or_else(Vec::new, |m| {
            m.clients
                .iter()
                .copied()
                .filter(|&id| self.is_tiled_visible(id))
                .collect()
        })
    }

    /// Visible clients of a monitor in tiling order, floating ones included.
    pub fn visible(&self, mon: usize) -> Vec<ClientId> {
        self.monitors.get(mon).map_or_else(Vec::new, |m| {
            m.clients
                .iter()
                .copied()
                .filter(|&id| self.is_visible(id))
                .collect()
        })
    }

    /// Every listed window, monitor by monitor, for _NET_CLIENT_LIST.
    pub fn managed_windows(&self) -> Vec<Window> {
        self.monitors
            .iter()
            .flat_map(|m| m.clients.iter())
            .filter_map(|id| self.clients.get(id).map(|c| c.win))
            .collect()
    }

    /// The monitor whose window area overlaps `r` the most, defaulting to the selected one.
    pub fn rect_to_mon(&self, r: &Rectangle) -> usize {
        let mut best = self.selmon;
        let mut area = 0;
        for (i, m) in self.monitors.iter().enumerate() {
            let a = m.area.intersection_area(r);
            if a > area {
                area = a;
                best = i;
            }
        }
        best
    }

    /// The neighbouring monitor in direction `dir`, wrapping around.
    pub fn dir_to_mon(&self, dir: i32) -> usize {
        let n = self.monitors.len();
        if n == 0 {
            return 0;
        }
        if dir > 0 {
            (self.selmon + 1) % n
        } else {
            (self.selmon + n - 1) % n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn registry_with(n: usize) -> (Registry, Vec<ClientId>) {
        let cfg = Config::default();
        let mut reg = Registry::new();
        let mut m = Monitor::new(&cfg, 0);
        m.set_geometry(Rectangle::new(0, 0, 1920, 1080));
        reg.monitors.push(m);
        let ids = (0..n)
            .map(|i| {
                let mut c = Client::new(100 + i as Window, Rectangle::new(0, 0, 10, 10), 1, 0);
                c.tags = 1;
                let id = reg.insert(c);
                reg.attach(id);
                reg.attach_stack(id);
                id
            })
            .collect();
        (reg, ids)
    }

    #[test]
    fn attach_is_idempotent() {
        let (mut reg, ids) = registry_with(2);
        reg.attach(ids[0]);
        reg.attach_stack(ids[0]);
        assert_eq!(reg.monitors[0].clients, vec![ids[1], ids[0]]);
        assert_eq!(reg.monitors[0].stack, vec![ids[1], ids[0]]);
    }

    #[test]
    fn attach_aside_follows_the_selection() {
        let (mut reg, ids) = registry_with(3);
        // tiling order is [2, 1, 0]
        reg.monitors[0].sel = Some(ids[1]);
        let mut c = Client::new(999, Rectangle::new(0, 0, 10, 10), 1, 0);
        c.tags = 1;
        let new = reg.insert(c);
        reg.attach_aside(new);
        assert_eq!(reg.monitors[0].clients, vec![ids[2], ids[1], new, ids[0]]);
    }

    #[test]
    fn attach_aside_without_tiled_selection_goes_to_head() {
        let (mut reg, ids) = registry_with(2);
        reg.monitors[0].sel = Some(ids[0]);
        if let Some(c) = reg.get_mut(ids[0]) {
            c.is_floating = true;
        }
        let mut c = Client::new(999, Rectangle::new(0, 0, 10, 10), 1, 0);
        c.tags = 1;
        let new = reg.insert(c);
        reg.attach_aside(new);
        assert_eq!(reg.monitors[0].clients[0], new);
    }

    #[test]
    fn detaching_the_selection_falls_back_to_next_visible() {
        let (mut reg, ids) = registry_with(3);
        // stack is [2, 1, 0]; hide client 1
        if let Some(c) = reg.get_mut(ids[1]) {
            c.tags = 0b10;
        }
        reg.monitors[0].sel = Some(ids[2]);
        reg.detach_stack(ids[2]);
        assert_eq!(reg.monitors[0].sel, Some(ids[0]));

        reg.detach_stack(ids[0]);
        assert_eq!(reg.monitors[0].sel, None);
    }

    #[test]
    fn removal_unlinks_everywhere() {
        let (mut reg, ids) = registry_with(2);
        let c = reg.remove(ids[0]);
        assert!(c.is_some());
        assert!(!reg.monitors[0].clients.contains(&ids[0]));
        assert!(!reg.monitors[0].stack.contains(&ids[0]));
        assert_eq!(reg.win_to_client(100), None);
        assert_eq!(reg.win_to_client(101), Some(ids[1]));
    }

    #[test]
    fn next_tiled_skips_floating_and_hidden() {
        let (mut reg, ids) = registry_with(3);
        // tiling order is [2, 1, 0]
        if let Some(c) = reg.get_mut(ids[2]) {
            c.is_floating = true;
        }
        if let Some(c) = reg.get_mut(ids[1]) {
            c.tags = 0b100;
        }
        assert_eq!(reg.next_tiled(0, 0), Some(2));
        assert_eq!(reg.next_tiled(0, 3), None);
        assert_eq!(reg.tiled(0), vec![ids[0]]);
    }
}
