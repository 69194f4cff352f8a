//! Lock file management for single-instance enforcement.
//!
//! Only one `serve` instance may run per user session: it owns the event
//! socket and receives the sync signals. The lock file in the runtime
//! directory holds the owning PID so other commands can find and signal it.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::common::utils;

const LOCK_FILE: &str = "sunwidgetr.lock";

/// Path of the instance lock file.
pub fn lock_path() -> PathBuf {
    utils::runtime_dir().join(LOCK_FILE)
}

/// Acquire the exclusive instance lock, writing our PID into it.
///
/// Stale locks left by a dead process are cleaned up and the acquisition
/// retried once. If a live instance holds the lock this logs an error and
/// exits the process.
pub fn acquire_lock() -> Result<(File, PathBuf)> {
    let lock_path = lock_path();

    // Open without truncating to preserve content for conflict inspection
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

    match lock_file.try_lock_exclusive() {
        Ok(()) => {
            write_pid(&mut lock_file)?;
            Ok((lock_file, lock_path))
        }
        Err(_) => {
            handle_lock_conflict(&lock_path);

            // Conflict was stale; retry once
            let mut retry_lock_file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&lock_path)
                .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

            match retry_lock_file.try_lock_exclusive() {
                Ok(()) => {
                    write_pid(&mut retry_lock_file)?;
                    Ok((retry_lock_file, lock_path))
                }
                Err(e) => {
                    log_error_exit!("Failed to acquire lock after cleanup attempt: {}", e);
                    std::process::exit(crate::common::constants::EXIT_FAILURE);
                }
            }
        }
    }
}

fn write_pid(lock_file: &mut File) -> Result<()> {
    lock_file.set_len(0)?;
    lock_file.seek(SeekFrom::Start(0))?;
    writeln!(lock_file, "{}", std::process::id())?;
    lock_file.flush()?;
    Ok(())
}

/// Resolve a held lock: remove it when stale, exit when a live instance owns
/// it.
fn handle_lock_conflict(lock_path: &PathBuf) {
    let Some(pid) = read_lock_pid(lock_path) else {
        log_warning!("Lock file format invalid, removing");
        let _ = std::fs::remove_file(lock_path);
        return;
    };

    if !utils::is_process_running(pid) {
        log_warning!("Removing stale lock file (process {pid} no longer running)");
        let _ = std::fs::remove_file(lock_path);
        return;
    }

    log_pipe!();
    log_error!("sunwidgetr is already running (PID: {pid})");
    log_block_start!("Did you mean to:");
    log_indented!("• Trigger a refresh: sunwidgetr sync");
    log_indented!("• Check cached data: sunwidgetr status");
    log_block_start!("Cannot start - another sunwidgetr instance is running");
    log_end!();
    std::process::exit(crate::common::constants::EXIT_FAILURE);
}

fn read_lock_pid(lock_path: &PathBuf) -> Option<u32> {
    let content = std::fs::read_to_string(lock_path).ok()?;
    content.trim().lines().next()?.trim().parse().ok()
}

/// PID of the running service instance, if one holds the lock.
pub fn get_running_pid() -> Option<u32> {
    let pid = read_lock_pid(&lock_path())?;
    utils::is_process_running(pid).then_some(pid)
}

/// Ask the running instance to perform a synchronization pass.
pub fn send_sync_signal(pid: u32) -> Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGUSR1)
        .with_context(|| format!("Failed to signal instance (PID: {pid})"))?;
    Ok(())
}
