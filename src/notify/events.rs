//! Event data structures for the widget notification channel.

use serde::{Deserialize, Serialize};

use crate::api::SunTimes;

/// All events broadcast to widget processes.
///
/// `targets` carries widget instance identifiers; an empty list addresses
/// every widget. Events are fire-and-forget, so no event carries a reply
/// path or expects acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum WidgetEvent {
    /// A synchronization pass has started; widgets may show a busy state.
    RunRequested { targets: Vec<u32> },

    /// Fresh times were fetched, validated and persisted. The payload lets
    /// widgets repaint without a store round-trip.
    DataUpdated {
        targets: Vec<u32>,
        sunrise: String,
        sunset: String,
    },

    /// Synchronization could not reach the remote service. `cached` carries
    /// the previously stored pair when one exists, so widgets know whether
    /// they are showing stale data or placeholders.
    NoConnection {
        targets: Vec<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cached: Option<CachedPair>,
    },
}

/// The stored pair echoed inside a `no_connection` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPair {
    pub sunrise: String,
    pub sunset: String,
}

impl WidgetEvent {
    pub fn run_requested(targets: Vec<u32>) -> Self {
        WidgetEvent::RunRequested { targets }
    }

    pub fn data_updated(targets: Vec<u32>, times: &SunTimes) -> Self {
        WidgetEvent::DataUpdated {
            targets,
            sunrise: times.sunrise_rfc3339(),
            sunset: times.sunset_rfc3339(),
        }
    }

    pub fn no_connection(targets: Vec<u32>, cached: Option<&SunTimes>) -> Self {
        WidgetEvent::NoConnection {
            targets,
            cached: cached.map(|times| CachedPair {
                sunrise: times.sunrise_rfc3339(),
                sunset: times.sunset_rfc3339(),
            }),
        }
    }

    pub fn targets(&self) -> &[u32] {
        match self {
            WidgetEvent::RunRequested { targets }
            | WidgetEvent::DataUpdated { targets, .. }
            | WidgetEvent::NoConnection { targets, .. } => targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times() -> SunTimes {
        SunTimes::parse_pair("2025-06-21T04:51:34+00:00", "2025-06-21T20:26:06+00:00").unwrap()
    }

    #[test]
    fn data_updated_serialization() {
        let event = WidgetEvent::data_updated(vec![3, 7], &times());
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("\"event_type\":\"data_updated\""));
        assert!(json.contains("\"targets\":[3,7]"));
        assert!(json.contains("\"sunrise\":\"2025-06-21T04:51:34+00:00\""));

        let back: WidgetEvent = serde_json::from_str(&json).unwrap();
        match back {
            WidgetEvent::DataUpdated { targets, sunset, .. } => {
                assert_eq!(targets, vec![3, 7]);
                assert_eq!(sunset, "2025-06-21T20:26:06+00:00");
            }
            _ => panic!("wrong event type deserialized"),
        }
    }

    #[test]
    fn no_connection_with_cache_carries_the_pair() {
        let event = WidgetEvent::no_connection(vec![], Some(&times()));
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("\"event_type\":\"no_connection\""));
        assert!(json.contains("\"targets\":[]"));
        assert!(json.contains("\"cached\":{\"sunrise\":\"2025-06-21T04:51:34+00:00\""));
    }

    #[test]
    fn no_connection_without_cache_omits_the_field() {
        let event = WidgetEvent::no_connection(vec![7], None);
        let json = serde_json::to_string(&event).unwrap();

        assert!(!json.contains("cached"));

        let back: WidgetEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, WidgetEvent::NoConnection { cached: None, .. }));
    }

    #[test]
    fn run_requested_serialization() {
        let event = WidgetEvent::run_requested(vec![1]);
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("\"event_type\":\"run_requested\""));
        assert_eq!(event.targets(), &[1]);
    }
}
