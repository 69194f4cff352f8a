//! Implementation of the sync command.
//!
//! When a service instance is running, this just sends it SIGUSR1 and lets
//! it do the work against its own event socket. Without an instance it runs
//! one synchronization pass in-process; no widgets are listening in that
//! case, so events go nowhere, but the store still ends up current.

use anyhow::Result;

use crate::api::TimeDataClient;
use crate::config::Config;
use crate::instance;
use crate::notify::Notifier;
use crate::store::Store;
use crate::sync::{ConnectivityProbe, SyncCoordinator, SyncOutcome, TcpProbe};
use std::time::Duration;

/// Handle the sync command.
pub fn handle_sync_command(targets: Vec<u32>) -> Result<()> {
    log_version!();

    if let Some(pid) = instance::get_running_pid() {
        log_block_start!("Signaling running instance to refresh...");
        instance::send_sync_signal(pid)?;
        log_decorated!("Sent sync signal to sunwidgetr (PID: {pid})");
        log_end!();
        return Ok(());
    }

    log_block_start!("No running instance, performing one-shot sync");
    let config = Config::load()?;
    let store = Store::open_default()?;
    let outcome = run_once(&config, &store, &targets, &Notifier::disconnected())?;
    report_outcome(&outcome);
    log_end!();
    Ok(())
}

/// Run one synchronization pass with collaborators built from config.
pub fn run_once(
    config: &Config,
    store: &Store,
    targets: &[u32],
    notifier: &Notifier,
) -> Result<SyncOutcome> {
    let client = TimeDataClient::new(
        config.endpoint(),
        Duration::from_secs(config.fetch_timeout_secs()),
    );
    let probe = TcpProbe::for_endpoint(config.endpoint());
    let probe_ref = probe.as_ref().map(|p| p as &dyn ConnectivityProbe);

    SyncCoordinator::new(store, &client, probe_ref, notifier).run_sync(targets)
}

pub fn report_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Updated(times) => {
            log_decorated!(
                "Times updated: sunrise {} sunset {}",
                times.sunrise_rfc3339(),
                times.sunset_rfc3339()
            );
        }
        SyncOutcome::NoConnectionUseCache(times) => {
            log_decorated!(
                "Offline, keeping cached times: sunrise {} sunset {}",
                times.sunrise_rfc3339(),
                times.sunset_rfc3339()
            );
        }
        SyncOutcome::NoConnectionNoCache => {
            log_decorated!("Offline and nothing cached, widgets stay on placeholders");
        }
    }
}
