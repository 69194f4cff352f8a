//! Durable key/value store for the last known location and cached times.
//!
//! The store is a small TOML document under the XDG state directory
//! (`sunwidgetr/store.toml`) holding four keys: `latitude`, `longitude`,
//! `sunrise`, `sunset`. Every save rewrites the whole document to a temp file
//! in the same directory and renames it over the old one, so readers observe
//! either the pre-update or the post-update document, never a torn value.
//! Durability is "shortly after the call returns" (no fsync), matching the
//! deferred-write behavior the store always had.
//!
//! Concurrency: the in-memory copy sits behind a mutex, making the store
//! single-writer-at-a-time. Saving a sunrise/sunset pair is one critical
//! section and one rename, which is what keeps overlapping syncs from
//! interleaving their writes.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::api::SunTimes;
use crate::common::utils::private_path;

/// A geographic coordinate pair. Defaults to (0.0, 0.0) until a user or the
/// acquirer saves one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Keys exposed to the display-surface collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    Latitude,
    Longitude,
    Sunrise,
    Sunset,
}

/// On-disk document shape. Absent keys stay absent; defaults are applied at
/// read time so the file reflects only what was actually saved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct StoreData {
    latitude: Option<f64>,
    longitude: Option<f64>,
    sunrise: Option<String>,
    sunset: Option<String>,
}

/// Handle to the persistent store. Cheap to share by reference; all methods
/// take `&self`.
pub struct Store {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl Store {
    /// Open the store at the default XDG state location.
    pub fn open_default() -> Result<Self> {
        let base = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .context("Could not determine state directory")?;
        Self::open(base.join("sunwidgetr").join("store.toml"))
    }

    /// Open a store backed by the given file, creating parent directories.
    ///
    /// A missing file means an empty store. An unreadable or unparsable file
    /// is treated as empty with a warning rather than a fault, since the next
    /// successful sync rewrites it wholesale.
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create store directory {}", private_path(parent))
            })?;
        }

        let data = if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str::<StoreData>(&content) {
                    Ok(data) => data,
                    Err(e) => {
                        log_warning!(
                            "Store file {} is corrupt, starting empty: {e}",
                            private_path(&path)
                        );
                        StoreData::default()
                    }
                },
                Err(e) => {
                    log_warning!(
                        "Could not read store file {}, starting empty: {e}",
                        private_path(&path)
                    );
                    StoreData::default()
                }
            }
        } else {
            StoreData::default()
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Check whether a key holds a value.
    ///
    /// Callers saving multi-key units re-check with this before trusting a
    /// read; see [`Store::times`] for the pair rule.
    pub fn has(&self, key: StoreKey) -> bool {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        match key {
            StoreKey::Latitude => data.latitude.is_some(),
            StoreKey::Longitude => data.longitude.is_some(),
            StoreKey::Sunrise => data.sunrise.is_some(),
            StoreKey::Sunset => data.sunset.is_some(),
        }
    }

    /// The stored location, or the (0.0, 0.0) default when none was saved.
    pub fn location(&self) -> Location {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        Location {
            latitude: data.latitude.unwrap_or(0.0),
            longitude: data.longitude.unwrap_or(0.0),
        }
    }

    pub fn has_location(&self) -> bool {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.latitude.is_some() && data.longitude.is_some()
    }

    /// Save a location. Both coordinates are written as one unit.
    pub fn save_location(&self, latitude: f64, longitude: f64) -> Result<()> {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.latitude = Some(latitude);
        data.longitude = Some(longitude);
        self.flush(&data)
    }

    /// The cached sunrise/sunset pair, if a complete and parseable one exists.
    ///
    /// A document holding only one of the two keys counts as "no cached
    /// data", as does a pair that no longer parses.
    pub fn times(&self) -> Option<SunTimes> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        match (&data.sunrise, &data.sunset) {
            (Some(sunrise), Some(sunset)) => SunTimes::parse_pair(sunrise, sunset).ok(),
            _ => None,
        }
    }

    pub fn has_times(&self) -> bool {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.sunrise.is_some() && data.sunset.is_some()
    }

    /// Replace the cached pair. Both fields are written under one lock and
    /// one atomic rename, so a reader never sees one old and one new value.
    pub fn save_times(&self, times: &SunTimes) -> Result<()> {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.sunrise = Some(times.sunrise_rfc3339());
        data.sunset = Some(times.sunset_rfc3339());
        self.flush(&data)
    }

    /// Serialize and atomically replace the backing file.
    fn flush(&self, data: &StoreData) -> Result<()> {
        let content = toml::to_string(data).context("Failed to serialize store")?;

        let tmp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, content).with_context(|| {
            format!("Failed to write store temp file {}", private_path(&tmp_path))
        })?;
        std::fs::rename(&tmp_path, &self.path).with_context(|| {
            format!("Failed to replace store file {}", private_path(&self.path))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_times() -> SunTimes {
        SunTimes::parse_pair("2024-06-21T03:13:00+00:00", "2024-06-21T19:28:00+00:00").unwrap()
    }

    #[test]
    fn empty_store_has_defaults() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("store.toml")).unwrap();

        assert_eq!(store.location(), Location::default());
        assert!(!store.has_location());
        assert!(store.times().is_none());
        assert!(!store.has_times());
        assert!(!store.has(StoreKey::Latitude));
        assert!(!store.has(StoreKey::Sunrise));
    }

    #[test]
    fn location_round_trips_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.toml");

        let store = Store::open(path.clone()).unwrap();
        store.save_location(48.1, 17.1).unwrap();
        assert!(store.has(StoreKey::Latitude));
        assert!(store.has(StoreKey::Longitude));

        let reopened = Store::open(path).unwrap();
        let loc = reopened.location();
        assert_eq!(loc.latitude, 48.1);
        assert_eq!(loc.longitude, 17.1);
    }

    #[test]
    fn times_round_trip_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.toml");

        let store = Store::open(path.clone()).unwrap();
        store.save_times(&sample_times()).unwrap();

        let reopened = Store::open(path).unwrap();
        assert_eq!(reopened.times(), Some(sample_times()));
    }

    #[test]
    fn partial_pair_counts_as_no_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.toml");
        // Simulate a write that only got one half of the pair onto disk
        std::fs::write(&path, "sunrise = \"2024-06-21T03:13:00+00:00\"\n").unwrap();

        let store = Store::open(path).unwrap();
        assert!(store.has(StoreKey::Sunrise));
        assert!(!store.has(StoreKey::Sunset));
        assert!(!store.has_times());
        assert!(store.times().is_none());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.toml");
        std::fs::write(&path, "{{{{not toml").unwrap();

        crate::logger::Log::set_enabled(false);
        let store = Store::open(path).unwrap();
        crate::logger::Log::set_enabled(true);

        assert!(!store.has_times());
        assert!(!store.has_location());
    }

    #[test]
    fn unparsable_cached_pair_counts_as_no_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.toml");
        std::fs::write(
            &path,
            "sunrise = \"7:12 AM\"\nsunset = \"7:48 PM\"\n",
        )
        .unwrap();

        let store = Store::open(path).unwrap();
        assert!(store.has_times()); // keys exist...
        assert!(store.times().is_none()); // ...but the pair is unusable
    }
}
