//! Small shared helpers.

use std::path::{Path, PathBuf};

/// Render a path with the home directory collapsed to `~` for display.
///
/// Keeps usernames out of log output that users tend to paste into issues.
pub fn private_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        return format!("~/{}", stripped.display());
    }
    path.display().to_string()
}

/// Resolve the per-user runtime directory used for the lock file and the
/// notification socket.
///
/// Primary: `$XDG_RUNTIME_DIR`; fallback: `/run/user/{uid}`.
pub fn runtime_dir() -> PathBuf {
    if let Ok(xdg_runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(xdg_runtime_dir)
    } else {
        let uid = nix::unistd::getuid();
        PathBuf::from(format!("/run/user/{}", uid))
    }
}

/// Check whether a process with the given PID is still alive.
///
/// Sends signal 0, which performs permission and existence checks without
/// delivering anything.
pub fn is_process_running(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_path_collapses_home() {
        if let Some(home) = dirs::home_dir() {
            let inside = home.join(".config/sunwidgetr/sunwidgetr.toml");
            assert_eq!(private_path(&inside), "~/.config/sunwidgetr/sunwidgetr.toml");
        }
        assert_eq!(private_path(Path::new("/etc/passwd")), "/etc/passwd");
    }

    #[test]
    fn current_process_is_running() {
        assert!(is_process_running(std::process::id()));
    }
}
