//! Implementation of the serve command: the long-running service instance.
//!
//! The instance owns the event socket and the single-instance lock. It runs
//! one synchronization pass at startup and then waits for signals: SIGUSR1
//! triggers another pass (an external timer or the `sync` command sends it),
//! SIGTERM/SIGINT/SIGHUP shut it down. There is no internal scheduler by
//! design; periodic refresh cadence belongs to systemd timers or cron.

use anyhow::{Context, Result};

use crate::common::utils::private_path;
use crate::config::Config;
use crate::instance;
use crate::notify::{self, EventServer, Notifier};
use crate::signals::{SignalMessage, setup_signal_handler};
use crate::store::Store;

/// Run the service instance until shutdown.
pub fn handle_serve_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    // Exits if another instance already holds the lock
    let (_lock_file, lock_path) = instance::acquire_lock()?;

    let config = Config::load()?;
    config.log_config();

    let store = Store::open_default()?;

    let signal_state = setup_signal_handler(debug_enabled)?;

    let (notifier, event_receiver) = Notifier::new();
    let event_server = EventServer::start(
        event_receiver,
        signal_state.running.clone(),
        debug_enabled,
    )?;
    log_block_start!(
        "Broadcasting widget events on {}",
        private_path(&notify::socket_path()?)
    );

    log_block_start!("Initial synchronization");
    run_sync_pass(&config, &store, &notifier);

    loop {
        match signal_state.signal_receiver.recv() {
            Ok(SignalMessage::RunSync) => {
                log_block_start!("Synchronization requested");
                run_sync_pass(&config, &store, &notifier);
            }
            Ok(SignalMessage::Shutdown) | Err(_) => break,
        }
    }

    log_block_start!("Shutting down...");
    event_server
        .shutdown()
        .context("Event server did not shut down cleanly")?;
    let _ = std::fs::remove_file(&lock_path);
    log_end!();
    Ok(())
}

/// One pass; failures are reported but never bring the instance down.
fn run_sync_pass(config: &Config, store: &Store, notifier: &Notifier) {
    match super::sync::run_once(config, store, &[], notifier) {
        Ok(outcome) => super::sync::report_outcome(&outcome),
        Err(e) => {
            log_pipe!();
            log_error!("Synchronization failed: {:#}", e);
        }
    }
}
