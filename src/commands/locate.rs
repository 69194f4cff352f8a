//! Implementation of the locate command.
//!
//! Runs the location acquirer against the GeoClue2 sources, streaming each
//! estimate to the terminal, then persists the best fix and nudges a running
//! instance so widgets pick up times for the new location.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};

use crate::config::Config;
use crate::config::validation::validate_coordinates;
use crate::instance;
use crate::location::geoclue::GeoClueSource;
use crate::location::{AcquireError, AcquireState, LocationAcquirer};
use crate::store::Store;

/// Give up and settle for the best estimate so far after this long.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(60);

/// Handle the locate command.
pub fn handle_locate_command() -> Result<()> {
    log_version!();
    log_block_start!("Acquiring current location...");

    let config = Config::load()?;
    let store = Store::open_default()?;

    let acquirer = LocationAcquirer::new(
        config.accuracy_threshold(),
        config.accuracy_preference(),
    );
    let sources = GeoClueSource::all();
    let (estimates, estimate_rx) = mpsc::channel();

    let handle = match acquirer.start(&sources, estimates) {
        Ok(handle) => handle,
        Err(AcquireError::NoPositionAvailable) => {
            log_pipe!();
            log_error!("Location services are disabled or unavailable");
            log_indented!("Enable GeoClue2 or save a location manually:");
            log_indented!("sunwidgetr save <latitude> <longitude>");
            log_end!();
            return Err(anyhow!("no position source is enabled"));
        }
        Err(AcquireError::PermissionDenied) => {
            log_pipe!();
            log_error!("Permission to read the current position was denied");
            log_indented!("Grant location access to 'sunwidgetr' in your desktop portal");
            log_end!();
            return Err(anyhow!("location permission denied"));
        }
        Err(AcquireError::Backend(e)) => return Err(e),
    };

    let deadline = Instant::now() + ACQUIRE_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match estimate_rx.recv_timeout(remaining) {
            Ok(fix) => {
                log_indented!(
                    "Estimate: {:.4}, {:.4} (±{:.0}m)",
                    fix.latitude,
                    fix.longitude,
                    fix.accuracy
                );
                if handle.state() == AcquireState::TerminatedByAccuracy {
                    break;
                }
            }
            Err(_) => {
                // Timed out or the source went away; settle for what we have
                handle.cancel();
                break;
            }
        }
    }

    let Some(fix) = handle.best_fix() else {
        log_pipe!();
        log_error!("No position fix obtained");
        log_end!();
        return Err(anyhow!("no position fix obtained"));
    };

    validate_coordinates(fix.latitude, fix.longitude)?;
    store.save_location(fix.latitude, fix.longitude)?;
    log_block_start!(
        "Saved location {:.4}, {:.4} (±{:.0}m)",
        fix.latitude,
        fix.longitude,
        fix.accuracy
    );

    if let Some(pid) = instance::get_running_pid() {
        instance::send_sync_signal(pid)?;
        log_indented!("Asked running instance (PID: {pid}) to refresh");
    }
    log_end!();
    Ok(())
}
