/// A default 'anyhow' based result type
type Result<T> = anyhow::Result<T>;
use anyhow::Context;
use combowm::{install_sigchld_handler, keycodes_from_xmodmap, Config, WindowManager, XcbConnection};
use simplelog::{LevelFilter, SimpleLogger, WriteLogger};
use std::{env, fs::File};

fn main() -> Result<()> {
    // -- logging --
    let level = env::var("COMBOWM_LOG")
        .ok()
        .and_then(|l| l.parse().ok())
        .unwrap_or(LevelFilter::Debug);
    match env::var("COMBOWM_LOGFILE") {
        Ok(path) => {
            let file = File::create(&path).with_context(|| format!("unable to create log file {}", path))?;
            WriteLogger::init(level, simplelog::Config::default(), file)?;
        }
        Err(_) => SimpleLogger::init(level, simplelog::Config::default())?,
    }

    install_sigchld_handler();
    let keymap = keycodes_from_xmodmap()?;
    let config = Config::default();

    let conn = XcbConnection::new(&config.fonts, config.normal, config.selected)?;
    let mut wm = WindowManager::new(&conn, config, &keymap)?;
    wm.run()
}
