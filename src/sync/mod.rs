//! Synchronization between the remote time service and the local store.
//!
//! One [`SyncCoordinator::run_sync`] invocation is one refresh attempt: it
//! announces the run, consults connectivity, fetches and validates fresh
//! times, persists them, and reports exactly one outcome to the widgets.
//! Only validated data ever reaches the store; on any failure the store is
//! left exactly as it was and previously cached times are served instead.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api::{FetchError, SunTimes, TimeDataSource};
use crate::notify::Notifier;
use crate::store::Store;

/// How one synchronization pass ended. Exactly one of these is reached per
/// invocation, and exactly one matching event is emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Fresh times were fetched, validated and persisted.
    Updated(SunTimes),
    /// The service was unreachable or rejected us, but cached times exist
    /// and remain on display.
    NoConnectionUseCache(SunTimes),
    /// The service was unreachable and there is nothing cached to show.
    NoConnectionNoCache,
}

/// Reachability check consulted before spending a fetch attempt.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectivityProbe {
    fn is_reachable(&self) -> bool;
}

/// Probe that attempts a short TCP connect to the endpoint host.
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    /// Build a probe for an http(s) endpoint URL. Returns None when the URL
    /// has no extractable host.
    pub fn for_endpoint(endpoint: &str) -> Option<Self> {
        let (host, port) = endpoint_host_port(endpoint)?;
        Some(Self {
            host,
            port,
            timeout: Duration::from_secs(3),
        })
    }
}

impl ConnectivityProbe for TcpProbe {
    fn is_reachable(&self) -> bool {
        let Ok(addrs) = (self.host.as_str(), self.port).to_socket_addrs() else {
            return false;
        };
        for addr in addrs {
            if TcpStream::connect_timeout(&addr, self.timeout).is_ok() {
                return true;
            }
        }
        false
    }
}

/// Extract host and port from an http(s) URL without a URL-parsing crate.
fn endpoint_host_port(endpoint: &str) -> Option<(String, u16)> {
    let (default_port, rest) = if let Some(rest) = endpoint.strip_prefix("https://") {
        (443, rest)
    } else if let Some(rest) = endpoint.strip_prefix("http://") {
        (80, rest)
    } else {
        return None;
    };

    let authority = rest.split('/').next().unwrap_or("");
    if authority.is_empty() {
        return None;
    }

    match authority.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port = port.parse().ok()?;
            Some((host.to_string(), port))
        }
        _ => Some((authority.to_string(), default_port)),
    }
}

/// Drives one synchronization pass over borrowed collaborators.
pub struct SyncCoordinator<'a> {
    store: &'a Store,
    fetcher: &'a dyn TimeDataSource,
    probe: Option<&'a dyn ConnectivityProbe>,
    notifier: &'a Notifier,
}

impl<'a> SyncCoordinator<'a> {
    pub fn new(
        store: &'a Store,
        fetcher: &'a dyn TimeDataSource,
        probe: Option<&'a dyn ConnectivityProbe>,
        notifier: &'a Notifier,
    ) -> Self {
        Self {
            store,
            fetcher,
            probe,
            notifier,
        }
    }

    /// Run one synchronization pass for the given widget targets.
    ///
    /// The returned error covers persistence failures only; fetch and
    /// connectivity problems are ordinary outcomes, not errors.
    pub fn run_sync(&self, targets: &[u32]) -> Result<SyncOutcome> {
        self.notifier.send_run_requested(targets.to_vec());

        let location = self.store.location();
        log_indented!(
            "Refreshing times for lat {:.4}, lon {:.4}",
            location.latitude,
            location.longitude
        );

        // Reachability gate: only worth skipping the fetch when there is
        // also nothing cached to show. With a cache the fetch is always
        // attempted so a wrong probe verdict cannot suppress an update.
        if let Some(probe) = self.probe
            && !probe.is_reachable()
            && self.store.times().is_none()
        {
            log_indented!("No connectivity and nothing cached, skipping fetch");
            self.notifier.send_no_connection(targets.to_vec(), None);
            return Ok(SyncOutcome::NoConnectionNoCache);
        }

        match self.fetcher.fetch(location.latitude, location.longitude) {
            Ok(times) => {
                // Persist before telling anyone; widgets reading the store
                // on receipt of the event must see the new pair
                self.store
                    .save_times(&times)
                    .context("Failed to persist fetched times")?;
                self.notifier.send_data_updated(targets.to_vec(), &times);
                log_indented!(
                    "Updated: sunrise {} sunset {}",
                    times.sunrise_rfc3339(),
                    times.sunset_rfc3339()
                );
                Ok(SyncOutcome::Updated(times))
            }
            Err(err) => {
                match &err {
                    FetchError::Connectivity(detail) => {
                        log_indented!("Fetch failed: {}", detail)
                    }
                    FetchError::RemoteRejected { status } => {
                        log_warning!("Service rejected request: {}", status)
                    }
                    FetchError::MalformedResponse(detail) => {
                        log_warning!("Malformed service response: {}", detail)
                    }
                }
                self.fall_back_to_cache(targets)
            }
        }
    }

    fn fall_back_to_cache(&self, targets: &[u32]) -> Result<SyncOutcome> {
        match self.store.times() {
            Some(cached) => {
                self.notifier
                    .send_no_connection(targets.to_vec(), Some(&cached));
                log_indented!("Keeping cached times on display");
                Ok(SyncOutcome::NoConnectionUseCache(cached))
            }
            None => {
                self.notifier.send_no_connection(targets.to_vec(), None);
                log_indented!("No cached times available");
                Ok(SyncOutcome::NoConnectionNoCache)
            }
        }
    }
}
