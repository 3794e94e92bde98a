//! Terminals swallowing the GUI windows of programs they started.
use xcb::Window;

use crate::{
    bar::Draw,
    client::{ClientId, Swallow},
    process::is_descendant,
    wm::WindowManager,
    xconnection::{WmState, XConn},
};

impl<'a, X: XConn + Draw> WindowManager<'a, X> {
    /// A terminal client whose process started `pid`, if one is free to swallow it.
    pub(crate) fn term_for_pid(&self, pid: u32, is_terminal: bool) -> Option<ClientId> {
        if pid == 0 || is_terminal {
            return None;
        }
        self.reg
            .monitors
            .iter()
            .flat_map(|m| m.clients.iter().copied())
            .find(|&id| {
                self.reg.get(id).map_or(false, |t| {
                    t.is_terminal
                        && t.pid != 0
                        && t.swallowed_child().is_none()
                        && is_descendant(self.procs.as_ref(), t.pid, pid)
                })
            })
    }

    /**
     * Make terminal `p` show the window of its child client `c`.
     *
     * `c` leaves both orderings but stays in the registry, holding the
     * terminal's window while it is hidden. Returns whether it happened.
     */
    pub(crate) fn swallow(&mut self, p: ClientId, c: ClientId) -> bool {
        let (child_win, refused) = match self.reg.get(c) {
            Some(cl) => (cl.win, cl.no_swallow || cl.is_terminal || cl.is_floating),
            None => return false,
        };
        let (term_win, mon) = match self.reg.get(p) {
            Some(pl) if pl.swallowed_child().is_none() => (pl.win, pl.mon),
            _ => return false,
        };
        if refused || p == c {
            return false;
        }
        debug!("terminal window {} swallows window {}", term_win, child_win);

        self.reg.detach(c);
        self.reg.detach_stack(c);
        self.conn.set_wm_state(term_win, WmState::Withdrawn);
        self.conn.unmap_window(term_win);

        if let Some(cl) = self.reg.get_mut(c) {
            cl.win = term_win;
            cl.mon = mon;
            cl.swallow = Swallow::None;
        }
        if let Some(pl) = self.reg.get_mut(p) {
            pl.win = child_win;
            pl.swallow = Swallow::Active {
                child: c,
                hidden: term_win,
            };
        }
        self.update_title(p);
        self.arrange(Some(mon));
        self.configure_client(p);
        self.update_client_list();
        true
    }

    /**
     * Bring the terminal window back after the swallowed child went away.
     * The child's record is dropped.
     */
    pub(crate) fn unswallow(&mut self, p: ClientId) {
        let (child, hidden) = match self.reg.get(p).map(|pl| pl.swallow) {
            Some(Swallow::Active { child, hidden }) => (child, hidden),
            _ => return,
        };
        debug!("restoring terminal window {}", hidden);

        self.reg.remove(child);
        let mon = match self.reg.get_mut(p) {
            Some(pl) => {
                pl.win = hidden;
                pl.swallow = Swallow::None;
                pl.mon
            }
            None => return,
        };
        self.update_title(p);
        self.arrange(Some(mon));

        if let Some(pl) = self.reg.get(p) {
            self.conn.map_window(pl.win);
        }
        self.configure_client(p);
        self.conn.set_wm_state(hidden, WmState::Normal);
        self.update_client_list();
    }

    /// The hidden terminal window of a swallowing client was destroyed.
    pub(crate) fn drop_hidden(&mut self, p: ClientId) {
        let child = match self.reg.get(p).map(|pl| pl.swallow) {
            Some(Swallow::Active { child, .. }) => child,
            _ => return,
        };
        info!("hidden terminal window of {:?} was destroyed", p);
        self.reg.remove(child);
        let mon = match self.reg.get_mut(p) {
            Some(pl) => {
                pl.swallow = Swallow::None;
                pl.mon
            }
            None => return,
        };
        self.arrange(Some(mon));
    }

    /**
     * Split the selected client from the window it swallowed, or swallow a
     * previously split child again.
     */
    pub(crate) fn toggle_swallow(&mut self) {
        let p = match self.reg.sel() {
            Some(p) => p,
            None => return,
        };
        match self.reg.get(p).map(|pl| pl.swallow) {
            Some(Swallow::Active { child, hidden }) => self.split_swallowed(p, child, hidden),
            Some(Swallow::Suspended { child }) => {
                let valid = self
                    .reg
                    .get(child)
                    .map_or(false, |c| self.reg.monitors[c.mon].clients.contains(&child));
                if let Some(pl) = self.reg.get_mut(p) {
                    pl.swallow = Swallow::None;
                }
                if valid {
                    self.swallow(p, child);
                    self.focus(Some(p));
                } else {
                    debug!("suspended swallow of {:?} is stale", p);
                }
            }
            _ => (),
        }
    }

    fn split_swallowed(&mut self, p: ClientId, child: ClientId, hidden: Window) {
        let (shown, tags, mon) = match self.reg.get_mut(p) {
            Some(pl) => {
                let shown = pl.win;
                pl.win = hidden;
                pl.swallow = Swallow::Suspended { child };
                (shown, pl.tags, pl.mon)
            }
            None => return,
        };
        if let Some(c) = self.reg.get_mut(child) {
            c.win = shown;
            c.tags = tags;
            c.mon = mon;
        }

        self.conn.map_window(hidden);
        self.conn.map_window(shown);
        self.reg.attach(p);
        self.reg.attach(child);
        self.reg.attach_stack(p);
        self.reg.attach_stack(child);
        self.update_title(p);
        self.update_title(child);
        self.arrange(Some(mon));
        self.configure_client(p);
        self.configure_client(child);
        self.conn.set_wm_state(hidden, WmState::Normal);
        self.conn.set_wm_state(shown, WmState::Normal);
        self.update_client_list();
        self.focus(Some(child));
    }
}
