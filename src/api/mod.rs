//! Remote sunrise/sunset service client.
//!
//! Wraps the `GET <base>/json?formatted=0&lat=..&lng=..` query: request
//! construction, response validation, and timestamp parsing. The remote
//! contract is not trusted; a response only counts as successful when the
//! transport status is OK, the payload's own `status` field is `"OK"`, and
//! both timestamps are present and parseable. Everything else surfaces as a
//! typed [`FetchError`] so the caller can fall back to cache without
//! unwinding.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::time::Duration;

use crate::common::constants::{DEFAULT_SUNRISE, DEFAULT_SUNSET};

/// A sunrise/sunset pair with full date, time, and offset precision.
///
/// The source timestamps carry a date component even though display surfaces
/// typically render only the time of day, so the full value is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: DateTime<FixedOffset>,
    pub sunset: DateTime<FixedOffset>,
}

impl SunTimes {
    /// Parse a pair of RFC 3339 timestamps as returned by the remote service.
    pub fn parse_pair(sunrise: &str, sunset: &str) -> Result<Self, FetchError> {
        let sunrise = DateTime::parse_from_rfc3339(sunrise)
            .map_err(|e| FetchError::MalformedResponse(format!("bad sunrise timestamp: {e}")))?;
        let sunset = DateTime::parse_from_rfc3339(sunset)
            .map_err(|e| FetchError::MalformedResponse(format!("bad sunset timestamp: {e}")))?;
        Ok(Self { sunrise, sunset })
    }

    /// The fixed placeholder pair used before anything was ever cached.
    pub fn placeholder() -> Self {
        // Compiled-in constants, parse cannot fail
        Self::parse_pair(DEFAULT_SUNRISE, DEFAULT_SUNSET)
            .unwrap_or_else(|_| unreachable!("placeholder timestamps are valid RFC 3339"))
    }

    pub fn sunrise_rfc3339(&self) -> String {
        self.sunrise.to_rfc3339()
    }

    pub fn sunset_rfc3339(&self) -> String {
        self.sunset.to_rfc3339()
    }
}

/// Fetch-layer failure taxonomy.
///
/// All variants are recoverable by design: the sync coordinator answers every
/// one of them with the cache fallback path.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The remote host could not be reached at the transport level.
    #[error("no connection to time service: {0}")]
    Connectivity(String),

    /// Transport worked but the service refused the request.
    #[error("time service rejected request (status {status})")]
    RemoteRejected { status: String },

    /// Transport and service status were fine but the payload is unusable.
    #[error("malformed time service response: {0}")]
    MalformedResponse(String),
}

/// Raw JSON payload shape of the remote service. Untrusted until validated.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    results: Option<ApiResults>,
}

#[derive(Debug, Deserialize)]
struct ApiResults {
    sunrise: Option<String>,
    sunset: Option<String>,
}

/// Anything that can produce sunrise/sunset data for a coordinate pair.
///
/// The HTTP client below is the production implementation; tests substitute
/// their own.
#[cfg_attr(test, mockall::automock)]
pub trait TimeDataSource {
    fn fetch(&self, latitude: f64, longitude: f64) -> Result<SunTimes, FetchError>;
}

/// HTTP client for the remote sunrise/sunset service.
pub struct TimeDataClient {
    endpoint: String,
    agent: ureq::Agent,
}

impl TimeDataClient {
    /// Build a client against the given base endpoint with a fixed request
    /// timeout so a dead network can never hang a sync indefinitely.
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn request_url(&self) -> String {
        // formatted=0 requests fully-qualified ISO 8601 timestamps instead of
        // the service's human-readable default
        format!("{}/json", self.endpoint)
    }
}

impl TimeDataSource for TimeDataClient {
    fn fetch(&self, latitude: f64, longitude: f64) -> Result<SunTimes, FetchError> {
        let response = self
            .agent
            .get(&self.request_url())
            .query("formatted", "0")
            .query("lat", &latitude.to_string())
            .query("lng", &longitude.to_string())
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => FetchError::RemoteRejected {
                    status: format!("http {code}"),
                },
                ureq::Error::Transport(t) => FetchError::Connectivity(t.to_string()),
            })?;

        let payload: ApiResponse = response
            .into_json()
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

        validate_payload(payload)
    }
}

/// Apply the acceptance rule to a decoded payload.
///
/// Returns a fully parsed pair or a typed rejection; partial results never
/// escape this function.
fn validate_payload(payload: ApiResponse) -> Result<SunTimes, FetchError> {
    if payload.status != "OK" {
        return Err(FetchError::RemoteRejected {
            status: payload.status,
        });
    }

    let results = payload
        .results
        .ok_or_else(|| FetchError::MalformedResponse("missing results object".into()))?;

    match (results.sunrise, results.sunset) {
        (Some(sunrise), Some(sunset)) => SunTimes::parse_pair(&sunrise, &sunset),
        (None, _) => Err(FetchError::MalformedResponse("sunrise field is null".into())),
        (_, None) => Err(FetchError::MalformedResponse("sunset field is null".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> ApiResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn accepts_valid_payload() {
        let payload = decode(
            r#"{"status":"OK","results":{"sunrise":"2024-06-21T03:13:00+00:00","sunset":"2024-06-21T19:28:00+00:00"}}"#,
        );
        let times = validate_payload(payload).unwrap();
        assert_eq!(times.sunrise_rfc3339(), "2024-06-21T03:13:00+00:00");
        assert_eq!(times.sunset_rfc3339(), "2024-06-21T19:28:00+00:00");
    }

    #[test]
    fn rejects_non_ok_status() {
        let payload = decode(r#"{"status":"INVALID_REQUEST"}"#);
        match validate_payload(payload) {
            Err(FetchError::RemoteRejected { status }) => {
                assert_eq!(status, "INVALID_REQUEST");
            }
            other => panic!("expected RemoteRejected, got {other:?}"),
        }
    }

    #[test]
    fn rejects_null_sunset_even_when_status_ok() {
        let payload = decode(
            r#"{"status":"OK","results":{"sunrise":"2024-06-21T03:13:00+00:00","sunset":null}}"#,
        );
        assert!(matches!(
            validate_payload(payload),
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn rejects_missing_results() {
        let payload = decode(r#"{"status":"OK"}"#);
        assert!(matches!(
            validate_payload(payload),
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn rejects_unparsable_timestamp() {
        let payload = decode(
            r#"{"status":"OK","results":{"sunrise":"7:12 AM","sunset":"2024-06-21T19:28:00+00:00"}}"#,
        );
        assert!(matches!(
            validate_payload(payload),
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn placeholder_pair_matches_constants() {
        let times = SunTimes::placeholder();
        assert_eq!(times.sunrise_rfc3339(), "2015-05-21T05:05:35+00:00");
        assert_eq!(times.sunset_rfc3339(), "2015-05-21T19:22:59+00:00");
    }
}
