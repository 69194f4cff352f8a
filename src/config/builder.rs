//! Default configuration file generation.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::common::utils::private_path;

/// Commented template written on first run. Values mirror the compiled-in
/// defaults so editing the file is optional.
const DEFAULT_CONFIG_TEMPLATE: &str = r#"#[Remote service]
endpoint = "https://api.sunrise-sunset.org"  # Base URL of the time service
fetch_timeout_secs = 10                      # Request timeout in seconds (1-120)

#[Location acquisition]
accuracy_threshold = 10.0        # Stop acquiring below this error radius
accuracy_preference = "medium"   # "medium" prefers network sources, "high" satellite
"#;

/// Create a default configuration file at the given path.
///
/// Creates parent directories as needed and logs where the file landed.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create config directory {}", private_path(parent))
        })?;
    }

    fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write default config to {}", private_path(path)))?;

    log_block_start!("Created default configuration");
    log_indented!("{}", private_path(path));

    Ok(())
}
