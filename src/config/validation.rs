//! Configuration validation.
//!
//! Validates value ranges before defaults are applied so that a bad explicit
//! value is always reported, never silently replaced.

use anyhow::Result;

use super::Config;
use crate::common::constants::*;

/// Validate all present configuration fields.
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(ref endpoint) = config.endpoint {
        validate_endpoint(endpoint)?;
    }

    if let Some(timeout) = config.fetch_timeout_secs
        && !(MINIMUM_FETCH_TIMEOUT_SECS..=MAXIMUM_FETCH_TIMEOUT_SECS).contains(&timeout)
    {
        anyhow::bail!(
            "fetch_timeout_secs must be between {} and {} seconds (got {})",
            MINIMUM_FETCH_TIMEOUT_SECS,
            MAXIMUM_FETCH_TIMEOUT_SECS,
            timeout
        );
    }

    if let Some(threshold) = config.accuracy_threshold
        && !(threshold.is_finite() && threshold > 0.0)
    {
        anyhow::bail!(
            "accuracy_threshold must be a positive number (got {})",
            threshold
        );
    }

    Ok(())
}

fn validate_endpoint(endpoint: &str) -> Result<()> {
    if endpoint.trim().is_empty() {
        anyhow::bail!("endpoint must not be empty");
    }
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        anyhow::bail!(
            "endpoint must start with http:// or https:// (got \"{}\")",
            endpoint
        );
    }
    Ok(())
}

/// Validate coordinates supplied on the command line or by a position source.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        anyhow::bail!("latitude must be between -90 and 90 degrees (got {latitude})");
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        anyhow::bail!("longitude must be between -180 and 180 degrees (got {longitude})");
    }
    Ok(())
}
