//! Signal handling for the long-running service instance.
//!
//! SIGUSR1 asks the running instance to perform a synchronization pass; an
//! external scheduler (systemd timer, cron) or the `sync` command sends it.
//! SIGTERM, SIGINT and SIGHUP request shutdown.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR1},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

/// Messages the signal handler thread forwards to the main loop.
#[derive(Debug, Clone)]
pub enum SignalMessage {
    /// Perform a synchronization pass now (SIGUSR1).
    RunSync,
    /// Shut down (SIGTERM, SIGINT, SIGHUP).
    Shutdown,
}

/// Signal handling state shared between threads.
pub struct SignalState {
    /// Cleared when shutdown is requested; also stops the event server.
    pub running: Arc<AtomicBool>,
    pub signal_receiver: std::sync::mpsc::Receiver<SignalMessage>,
    pub signal_sender: std::sync::mpsc::Sender<SignalMessage>,
}

/// Install the signal handler thread and return the shared state.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let running = Arc::new(AtomicBool::new(true));
    let (signal_sender, signal_receiver) = std::sync::mpsc::channel::<SignalMessage>();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR1])
        .context("failed to register signal handlers")?;

    let running_clone = running.clone();
    let signal_sender_clone = signal_sender.clone();

    thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGUSR1 => {
                    if debug_enabled {
                        log_debug!("Received SIGUSR1, queueing sync");
                    }
                    if signal_sender_clone.send(SignalMessage::RunSync).is_err() {
                        break;
                    }
                }
                SIGINT | SIGTERM | SIGHUP => {
                    if debug_enabled {
                        log_debug!("Received shutdown signal {}", sig);
                    }
                    running_clone.store(false, Ordering::SeqCst);
                    let _ = signal_sender_clone.send(SignalMessage::Shutdown);
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(SignalState {
        running,
        signal_receiver,
        signal_sender,
    })
}
