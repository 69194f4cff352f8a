//! Configuration system for sunwidgetr.
//!
//! Handles the TOML configuration file, validation, and default value
//! generation. The file lives at `XDG_CONFIG_HOME/sunwidgetr/sunwidgetr.toml`
//! and is created with a commented template on first run.
//!
//! ```toml
//! #[Remote service]
//! endpoint = "https://api.sunrise-sunset.org"  # Base URL of the time service
//! fetch_timeout_secs = 10                      # Request timeout in seconds (1-120)
//!
//! #[Location acquisition]
//! accuracy_threshold = 10.0        # Stop acquiring below this error radius (meters)
//! accuracy_preference = "medium"   # "medium" prefers network sources, "high" satellite
//! ```
//!
//! All values are optional; missing fields fall back to the defaults in
//! `common::constants`. Out-of-range values are rejected with an actionable
//! message during load.

pub mod builder;
pub mod loading;
pub mod validation;

#[cfg(test)]
mod tests;

use serde::Deserialize;

use crate::common::constants::*;

// Re-export public API
pub use builder::create_default_config;
pub use loading::{get_config_path, load, load_from_path, set_config_dir};

/// How the acquirer chooses among enabled position sources.
///
/// `Medium` trades precision for power by preferring coarse network sources;
/// `High` always picks a satellite source when one is enabled.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyPreference {
    #[default]
    Medium,
    High,
}

impl AccuracyPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccuracyPreference::Medium => "medium",
            AccuracyPreference::High => "high",
        }
    }
}

/// Configuration for the sunwidgetr application.
///
/// Most fields are optional and fall back to defaults when not specified.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the remote sunrise/sunset service.
    pub endpoint: Option<String>,

    /// Request timeout in seconds applied to every remote call.
    pub fetch_timeout_secs: Option<u64>,

    /// Error radius below which location acquisition self-terminates.
    pub accuracy_threshold: Option<f64>,

    /// Source selection criterion for location acquisition.
    pub accuracy_preference: Option<AccuracyPreference>,
}

impl Config {
    /// Load configuration using automatic path detection, creating a default
    /// file when none exists.
    pub fn load() -> anyhow::Result<Self> {
        loading::load()
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn fetch_timeout_secs(&self) -> u64 {
        self.fetch_timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS)
    }

    pub fn accuracy_threshold(&self) -> f64 {
        self.accuracy_threshold.unwrap_or(DEFAULT_ACCURACY_THRESHOLD)
    }

    pub fn accuracy_preference(&self) -> AccuracyPreference {
        self.accuracy_preference.unwrap_or_default()
    }

    /// Log the effective configuration as an indented block.
    pub fn log_config(&self) {
        log_block_start!("Loaded configuration");
        log_indented!("Endpoint: {}", self.endpoint());
        log_indented!("Fetch timeout: {}s", self.fetch_timeout_secs());
        log_indented!("Accuracy threshold: {}", self.accuracy_threshold());
        log_indented!(
            "Accuracy preference: {}",
            self.accuracy_preference().as_str()
        );
    }
}
