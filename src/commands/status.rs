//! Implementation of the status command.
//!
//! Prints what the store holds without touching the network, so it reflects
//! exactly what widgets are displaying.

use anyhow::Result;

use crate::instance;
use crate::store::{Store, StoreKey};

/// Print the persisted state.
pub fn handle_status_command() -> Result<()> {
    log_version!();

    let store = Store::open_default()?;

    log_block_start!("Location:");
    if store.has_location() {
        let location = store.location();
        log_indented!("{:.4}, {:.4}", location.latitude, location.longitude);
    } else {
        log_indented!("not set (using 0.0000, 0.0000)");
    }

    log_block_start!("Cached times:");
    if store.has(StoreKey::Sunrise) && store.has(StoreKey::Sunset) {
        match store.times() {
            Some(times) => {
                log_indented!("sunrise  {}", times.sunrise_rfc3339());
                log_indented!("sunset   {}", times.sunset_rfc3339());
            }
            None => log_indented!("unreadable (run 'sunwidgetr sync' to refresh)"),
        }
    } else {
        log_indented!("unavailable");
    }

    log_block_start!("Instance:");
    match instance::get_running_pid() {
        Some(pid) => log_indented!("running (PID: {pid})"),
        None => log_indented!("not running"),
    }
    log_end!();
    Ok(())
}
