//! Child processes: spawning, reaping and walking the process tree.
use std::{
    os::unix::process::CommandExt,
    process::{Command, Stdio},
};

/// Ancestry walks give up after this many steps.
const MAX_ANCESTRY_DEPTH: usize = 64;

/// Where the parent of a process can be looked up
pub trait ProcessTable {
    /// Parent pid, or 0 when it cannot be determined
    fn parent_of(&self, pid: u32) -> u32;
}

/// Reads parents from /proc/<pid>/stat
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcFs;

#[cfg(target_os = "linux")]
impl ProcessTable for ProcFs {
    fn parent_of(&self, pid: u32) -> u32 {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => parse_stat_ppid(&stat).unwrap_or(0),
            Err(_) => 0,
        }
    }
}

#[cfg(not(target_os = "linux"))]
impl ProcessTable for ProcFs {
    fn parent_of(&self, _pid: u32) -> u32 {
        0
    }
}

/// A table that knows nothing, which disables swallowing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProcessTable;

impl ProcessTable for NoProcessTable {
    fn parent_of(&self, _pid: u32) -> u32 {
        0
    }
}

/// The ppid field of /proc/<pid>/stat. The command name may itself contain spaces
/// and parentheses so fields are counted from the last ')'.
fn parse_stat_ppid(stat: &str) -> Option<u32> {
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().nth(1)?.parse().ok()
}

/// Whether `pid` is a (possibly indirect) child of `ancestor`.
pub fn is_descendant(procs: &dyn ProcessTable, ancestor: u32, pid: u32) -> bool {
    if ancestor == 0 {
        return false;
    }
    let mut p = pid;
    for _ in 0..MAX_ANCESTRY_DEPTH {
        if p == 0 || p == ancestor {
            break;
        }
        p = procs.parent_of(p);
    }
    p == ancestor && p != pid
}

/**
 * Run an external command
 *
 * This redirects the process stdout and stderr to /dev/null and puts it in a
 * session of its own. Logs a warning if there were any errors in kicking off
 * the process.
 */
pub fn spawn(cmd: &[String]) {
    let (prog, args) = match cmd.split_first() {
        Some(parts) => parts,
        None => return,
    };

    let mut command = Command::new(prog);
    command.args(args).stdout(Stdio::null()).stderr(Stdio::null());
    unsafe {
        command.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    match command.spawn() {
        Ok(child) => debug!("spawned '{}' as pid {}", prog, child.id()),
        Err(e) => warn!("error spawning external program '{}': {}", prog, e),
    }
}

extern "C" fn reap_children(_: libc::c_int) {
    unsafe { while libc::waitpid(-1, std::ptr::null_mut(), libc::WNOHANG) > 0 {} }
}

/// Reap exited children as soon as they exit so spawned programs never linger as zombies.
pub fn install_sigchld_handler() {
    let handler = reap_children as extern "C" fn(libc::c_int) as libc::sighandler_t;
    unsafe {
        if libc::signal(libc::SIGCHLD, handler) == libc::SIG_ERR {
            warn!("unable to install SIGCHLD handler");
        }
    }
    // collect anything that exited before the handler was in place
    reap_children(0);
}
