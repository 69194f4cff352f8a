use proptest::prelude::*;
use sunwidgetr::api::SunTimes;
use sunwidgetr::store::Store;

/// Generate valid latitude values
fn latitude_strategy() -> impl Strategy<Value = f64> {
    -90.0..=90.0
}

/// Generate valid longitude values
fn longitude_strategy() -> impl Strategy<Value = f64> {
    -180.0..=180.0
}

/// Generate plausible RFC 3339 timestamps with arbitrary offsets.
fn timestamp_strategy() -> impl Strategy<Value = String> {
    (
        2015i32..2035,
        1u32..=12,
        1u32..=28,
        0u32..24,
        0u32..60,
        0u32..60,
        -12i32..=12,
    )
        .prop_map(|(year, month, day, hour, min, sec, offset)| {
            format!(
                "{year:04}-{month:02}-{day:02}T{hour:02}:{min:02}:{sec:02}{}{:02}:00",
                if offset < 0 { '-' } else { '+' },
                offset.abs()
            )
        })
}

proptest! {
    /// Any valid coordinate pair survives a save, reopen and load unchanged.
    #[test]
    fn location_round_trips_through_reopen(
        lat in latitude_strategy(),
        lon in longitude_strategy()
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");

        let store = Store::open(path.clone()).unwrap();
        store.save_location(lat, lon).unwrap();
        drop(store);

        let reopened = Store::open(path).unwrap();
        let location = reopened.location();
        prop_assert_eq!(location.latitude, lat);
        prop_assert_eq!(location.longitude, lon);
    }

    /// Any parseable timestamp pair round-trips through persistence and both
    /// fields come back together.
    #[test]
    fn times_round_trip_through_reopen(
        sunrise in timestamp_strategy(),
        sunset in timestamp_strategy()
    ) {
        let times = SunTimes::parse_pair(&sunrise, &sunset).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");

        let store = Store::open(path.clone()).unwrap();
        store.save_times(&times).unwrap();
        drop(store);

        let reopened = Store::open(path).unwrap();
        prop_assert_eq!(reopened.times(), Some(times));
    }

    /// Saving a location never disturbs cached times and vice versa.
    #[test]
    fn location_and_times_are_independent(
        lat in latitude_strategy(),
        lon in longitude_strategy(),
        sunrise in timestamp_strategy(),
        sunset in timestamp_strategy()
    ) {
        let times = SunTimes::parse_pair(&sunrise, &sunset).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("store.toml")).unwrap();

        store.save_times(&times).unwrap();
        store.save_location(lat, lon).unwrap();

        prop_assert_eq!(store.times(), Some(times));
        let location = store.location();
        prop_assert_eq!(location.latitude, lat);
        prop_assert_eq!(location.longitude, lon);
    }
}
