//! A dwm style tiling window manager with combo tag views, terminal
//! swallowing and a system tray.

#[macro_use]
extern crate log;

pub mod bar;
pub mod bindings;
pub mod client;
pub mod config;
pub mod geometry;
pub mod layout;
pub mod monitor;
pub mod process;
pub mod registry;
pub mod rule;
pub mod systray;
pub mod tag;
pub mod wm;
pub mod xcbconn;
pub mod xconnection;

mod commands;
mod events;
mod focus;
mod mouse;
mod swallow;

#[cfg(test)]
mod tests;

pub use bar::Draw;
pub use bindings::keycodes_from_xmodmap;
pub use config::Config;
pub use process::install_sigchld_handler;
pub use wm::WindowManager;
pub use xcbconn::XcbConnection;
pub use xconnection::XConn;
