//! Shared constants for defaults, limits, and process exit codes.

/// Base URL of the remote sunrise/sunset service.
pub const DEFAULT_ENDPOINT: &str = "https://api.sunrise-sunset.org";

/// Request timeout applied to every fetch, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const MINIMUM_FETCH_TIMEOUT_SECS: u64 = 1;
pub const MAXIMUM_FETCH_TIMEOUT_SECS: u64 = 120;

/// Acquisition stops once a fix reports an error radius below this value.
///
/// Inherited battery/precision trade-off; kept configurable because the
/// right value depends on how precise the sunrise math needs to be.
pub const DEFAULT_ACCURACY_THRESHOLD: f64 = 10.0;

/// Placeholder pair used when nothing has ever been cached.
pub const DEFAULT_SUNRISE: &str = "2015-05-21T05:05:35+00:00";
pub const DEFAULT_SUNSET: &str = "2015-05-21T19:22:59+00:00";

/// Process exit code for fatal errors.
pub const EXIT_FAILURE: i32 = 1;
