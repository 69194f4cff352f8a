//! Implementation of the save command.

use anyhow::Result;

use crate::config::validation::validate_coordinates;
use crate::instance;
use crate::store::Store;

/// Persist a manually chosen location and nudge any running instance.
pub fn handle_save_command(latitude: f64, longitude: f64) -> Result<()> {
    log_version!();

    validate_coordinates(latitude, longitude)?;

    let store = Store::open_default()?;
    store.save_location(latitude, longitude)?;
    log_block_start!("Saved location {:.4}, {:.4}", latitude, longitude);

    if let Some(pid) = instance::get_running_pid() {
        instance::send_sync_signal(pid)?;
        log_indented!("Asked running instance (PID: {pid}) to refresh");
    }
    log_end!();
    Ok(())
}
