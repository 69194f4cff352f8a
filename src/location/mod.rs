//! Location acquisition over a closed set of position source kinds.
//!
//! The acquirer produces a location estimate without the user picking one on
//! a map, and stops burning power once a good-enough fix exists. Sources are
//! a small static set ([`SourceKind`]) behind the [`PositionSource`] trait;
//! the production implementation talks to GeoClue2 over D-Bus (see
//! [`geoclue`]), tests feed synthetic fixes.
//!
//! Lifecycle: `Idle -> Acquiring -> (TerminatedByAccuracy | CancelledExternally)`.
//! Acquisition self-terminates as soon as a fix reports an error radius below
//! the configured threshold; that rule is a heuristic, so without a
//! sufficiently accurate fix it runs until explicitly cancelled. Cancellation
//! is safe to request twice, and fixes delivered after cancellation are
//! discarded rather than acted upon.

pub mod geoclue;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::config::AccuracyPreference;

/// A single reported position sample with an error radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported error radius; lower is better.
    pub accuracy: f64,
}

/// The closed set of position source kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Network/cell derived position: cheap, coarse.
    CoarseNetwork,
    /// Satellite derived position: precise, power hungry.
    PreciseSatellite,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::CoarseNetwork => "coarse-network",
            SourceKind::PreciseSatellite => "precise-satellite",
        }
    }
}

/// Acquisition-layer failure taxonomy.
///
/// `PermissionDenied` is distinct from `NoPositionAvailable` so the caller
/// can re-request authorization instead of telling the user to enable
/// location services.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// No enabled source and no fix to fall back on.
    #[error("no position source is enabled")]
    NoPositionAvailable,

    /// The platform declined to share position data with us.
    #[error("permission to read position was denied")]
    PermissionDenied,

    /// Source-level failure unrelated to the taxonomy above.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Listener verdict after each delivered fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Callback invoked by a source for every new fix. May be called from a
/// source-owned background thread.
pub type FixListener = Box<dyn FnMut(Fix) -> Flow + Send>;

/// Handle to an active source subscription. Dropping without cancelling is
/// allowed; sources stop delivering once the listener returns [`Flow::Stop`].
pub trait Subscription: Send {
    /// Stop the subscription. Must be idempotent.
    fn cancel(&mut self);
}

/// A position source the acquirer can query and subscribe to.
pub trait PositionSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Whether this source is currently usable at all.
    fn is_enabled(&self) -> bool;

    /// The most recent fix this source already holds, without starting a
    /// fresh acquisition. Sources that cannot answer passively return None.
    fn last_known_fix(&self) -> Option<Fix>;

    /// Begin delivering fixes to the listener.
    fn subscribe(&self, listener: FixListener) -> Result<Box<dyn Subscription>, AcquireError>;
}

/// Acquisition lifecycle states. Both terminal states return to `Idle` from
/// the caller's perspective; a handle is single-use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireState {
    Idle,
    Acquiring,
    TerminatedByAccuracy,
    CancelledExternally,
}

struct AcquireShared {
    state: Mutex<AcquireState>,
    cancelled: AtomicBool,
    /// Candidate best fix, overwritten by every delivered fix. Written from
    /// the subscription callback thread, read by whoever saves the result.
    best: Mutex<Option<Fix>>,
}

/// Handle to one acquisition run.
pub struct AcquireHandle {
    shared: Arc<AcquireShared>,
    subscription: Mutex<Option<Box<dyn Subscription>>>,
}

impl AcquireHandle {
    pub fn state(&self) -> AcquireState {
        *self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The best (most recent) fix seen so far, provisional or subscribed.
    pub fn best_fix(&self) -> Option<Fix> {
        *self.shared.best.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cancel acquisition. Safe to call twice; fixes delivered after this
    /// point are discarded by the listener.
    pub fn cancel(&self) {
        let already = self.shared.cancelled.swap(true, Ordering::SeqCst);

        {
            let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == AcquireState::Acquiring {
                *state = AcquireState::CancelledExternally;
            }
        }

        if !already
            && let Some(mut sub) = self
                .subscription
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take()
        {
            sub.cancel();
        }
    }
}

/// Orchestrates one acquisition run across the available sources.
pub struct LocationAcquirer {
    threshold: f64,
    preference: AccuracyPreference,
}

impl LocationAcquirer {
    pub fn new(threshold: f64, preference: AccuracyPreference) -> Self {
        Self {
            threshold,
            preference,
        }
    }

    /// Start acquiring. Emits each estimate on `estimates`: first the best
    /// already-known fix across all sources (instant, possibly stale), then
    /// every fresh fix from the selected subscription source.
    pub fn start(
        &self,
        sources: &[Box<dyn PositionSource>],
        estimates: Sender<Fix>,
    ) -> Result<AcquireHandle, AcquireError> {
        if !sources.iter().any(|s| s.is_enabled()) {
            return Err(AcquireError::NoPositionAvailable);
        }

        let shared = Arc::new(AcquireShared {
            state: Mutex::new(AcquireState::Acquiring),
            cancelled: AtomicBool::new(false),
            best: Mutex::new(None),
        });

        // Instant provisional answer: best last-known fix across every
        // source, enabled or not
        if let Some(provisional) = sources
            .iter()
            .filter_map(|s| s.last_known_fix())
            .min_by(|a, b| a.accuracy.total_cmp(&b.accuracy))
        {
            *shared.best.lock().unwrap_or_else(|e| e.into_inner()) = Some(provisional);
            let _ = estimates.send(provisional);
        }

        let source = self.select_source(sources);

        let listener = {
            let shared = Arc::clone(&shared);
            let estimates = estimates.clone();
            let threshold = self.threshold;
            Box::new(move |fix: Fix| -> Flow {
                if shared.cancelled.load(Ordering::SeqCst) {
                    // Late delivery after cancellation: discard
                    return Flow::Stop;
                }

                *shared.best.lock().unwrap_or_else(|e| e.into_inner()) = Some(fix);
                let _ = estimates.send(fix);

                if fix.accuracy < threshold {
                    let mut state = shared.state.lock().unwrap_or_else(|e| e.into_inner());
                    if *state == AcquireState::Acquiring {
                        *state = AcquireState::TerminatedByAccuracy;
                    }
                    return Flow::Stop;
                }
                Flow::Continue
            })
        };

        let subscription = source.subscribe(listener)?;

        Ok(AcquireHandle {
            shared,
            subscription: Mutex::new(Some(subscription)),
        })
    }

    /// Pick the subscription source among the enabled ones.
    ///
    /// `Medium` preference picks a coarse network source when one is enabled
    /// (power over precision); `High` picks a satellite source. Falls back to
    /// the first enabled source either way.
    fn select_source<'a>(
        &self,
        sources: &'a [Box<dyn PositionSource>],
    ) -> &'a dyn PositionSource {
        let preferred_kind = match self.preference {
            AccuracyPreference::Medium => SourceKind::CoarseNetwork,
            AccuracyPreference::High => SourceKind::PreciseSatellite,
        };

        sources
            .iter()
            .filter(|s| s.is_enabled())
            .find(|s| s.kind() == preferred_kind)
            .or_else(|| sources.iter().find(|s| s.is_enabled()))
            .map(|s| s.as_ref())
            .unwrap_or_else(|| unreachable!("start() checked for an enabled source"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    /// Test source that delivers fixes synchronously when pushed.
    struct TestSource {
        kind: SourceKind,
        enabled: bool,
        last_known: Option<Fix>,
        listener: Arc<Mutex<Option<FixListener>>>,
        subscribed: Arc<AtomicBool>,
        permission_denied: bool,
    }

    impl TestSource {
        fn new(kind: SourceKind) -> Self {
            Self {
                kind,
                enabled: true,
                last_known: None,
                listener: Arc::new(Mutex::new(None)),
                subscribed: Arc::new(AtomicBool::new(false)),
                permission_denied: false,
            }
        }

        /// Deliver a fix to the active listener, honoring its verdict the way
        /// a real source would.
        fn push(&self, fix: Fix) {
            let mut guard = self.listener.lock().unwrap();
            if let Some(listener) = guard.as_mut()
                && listener(fix) == Flow::Stop
            {
                *guard = None;
            }
        }

        fn has_listener(&self) -> bool {
            self.listener.lock().unwrap().is_some()
        }
    }

    struct TestSubscription {
        listener: Arc<Mutex<Option<FixListener>>>,
        cancel_count: u32,
    }

    impl Subscription for TestSubscription {
        fn cancel(&mut self) {
            self.cancel_count += 1;
            *self.listener.lock().unwrap() = None;
        }
    }

    impl PositionSource for TestSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn last_known_fix(&self) -> Option<Fix> {
            self.last_known
        }

        fn subscribe(&self, listener: FixListener) -> Result<Box<dyn Subscription>, AcquireError> {
            if self.permission_denied {
                return Err(AcquireError::PermissionDenied);
            }
            self.subscribed.store(true, Ordering::SeqCst);
            *self.listener.lock().unwrap() = Some(listener);
            Ok(Box::new(TestSubscription {
                listener: Arc::clone(&self.listener),
                cancel_count: 0,
            }))
        }
    }

    fn fix(accuracy: f64) -> Fix {
        Fix {
            latitude: 48.1,
            longitude: 17.1,
            accuracy,
        }
    }

    fn acquirer() -> LocationAcquirer {
        LocationAcquirer::new(10.0, AccuracyPreference::Medium)
    }

    #[test]
    fn stops_after_fix_beats_accuracy_threshold() {
        let source = TestSource::new(SourceKind::CoarseNetwork);
        let listener_slot = Arc::clone(&source.listener);
        let sources: Vec<Box<dyn PositionSource>> = vec![Box::new(source)];
        let (tx, rx) = mpsc::channel();

        let handle = acquirer().start(&sources, tx).unwrap();
        assert_eq!(handle.state(), AcquireState::Acquiring);

        // Feed the synthetic sequence through the listener the source holds
        let push = |f: Fix| {
            let mut guard = listener_slot.lock().unwrap();
            if let Some(listener) = guard.as_mut()
                && listener(f) == Flow::Stop
            {
                *guard = None;
            }
        };
        push(fix(50.0));
        push(fix(30.0));
        push(fix(9.0));

        // Three provisional estimates were emitted...
        assert_eq!(rx.try_recv().unwrap().accuracy, 50.0);
        assert_eq!(rx.try_recv().unwrap().accuracy, 30.0);
        assert_eq!(rx.try_recv().unwrap().accuracy, 9.0);
        assert!(rx.try_recv().is_err());

        // ...and the subscription terminated right after the third
        assert!(listener_slot.lock().unwrap().is_none());
        assert_eq!(handle.state(), AcquireState::TerminatedByAccuracy);
        assert_eq!(handle.best_fix().unwrap().accuracy, 9.0);
    }

    #[test]
    fn keeps_running_while_accuracy_is_insufficient() {
        let source = TestSource::new(SourceKind::CoarseNetwork);
        let listener_slot = Arc::clone(&source.listener);
        let sources: Vec<Box<dyn PositionSource>> = vec![Box::new(source)];
        let (tx, _rx) = mpsc::channel();

        let handle = acquirer().start(&sources, tx).unwrap();

        let mut guard = listener_slot.lock().unwrap();
        let listener = guard.as_mut().unwrap();
        assert_eq!(listener(fix(40.0)), Flow::Continue);
        assert_eq!(listener(fix(10.0)), Flow::Continue); // threshold is strict
        assert_eq!(listener(fix(9.9)), Flow::Stop);
        drop(guard);

        assert_eq!(handle.state(), AcquireState::TerminatedByAccuracy);
    }

    #[test]
    fn emits_best_last_known_fix_as_provisional_estimate() {
        let mut coarse = TestSource::new(SourceKind::CoarseNetwork);
        coarse.last_known = Some(fix(120.0));
        let mut satellite = TestSource::new(SourceKind::PreciseSatellite);
        satellite.last_known = Some(fix(35.0));
        // A disabled source still contributes its stale fix
        satellite.enabled = false;

        let sources: Vec<Box<dyn PositionSource>> =
            vec![Box::new(coarse), Box::new(satellite)];
        let (tx, rx) = mpsc::channel();

        let handle = acquirer().start(&sources, tx).unwrap();

        let provisional = rx.try_recv().unwrap();
        assert_eq!(provisional.accuracy, 35.0);
        assert_eq!(handle.best_fix(), Some(provisional));
    }

    #[test]
    fn medium_preference_selects_coarse_source() {
        let coarse = TestSource::new(SourceKind::CoarseNetwork);
        let coarse_subscribed = Arc::clone(&coarse.subscribed);
        let satellite = TestSource::new(SourceKind::PreciseSatellite);
        let satellite_subscribed = Arc::clone(&satellite.subscribed);

        let sources: Vec<Box<dyn PositionSource>> =
            vec![Box::new(satellite), Box::new(coarse)];
        let (tx, _rx) = mpsc::channel();

        let _handle = acquirer().start(&sources, tx).unwrap();

        assert!(coarse_subscribed.load(Ordering::SeqCst));
        assert!(!satellite_subscribed.load(Ordering::SeqCst));
    }

    #[test]
    fn high_preference_selects_satellite_source() {
        let coarse = TestSource::new(SourceKind::CoarseNetwork);
        let satellite = TestSource::new(SourceKind::PreciseSatellite);
        let satellite_subscribed = Arc::clone(&satellite.subscribed);

        let sources: Vec<Box<dyn PositionSource>> =
            vec![Box::new(coarse), Box::new(satellite)];
        let (tx, _rx) = mpsc::channel();

        let acquirer = LocationAcquirer::new(10.0, AccuracyPreference::High);
        let _handle = acquirer.start(&sources, tx).unwrap();

        assert!(satellite_subscribed.load(Ordering::SeqCst));
    }

    #[test]
    fn no_enabled_source_reports_no_position_available() {
        let mut source = TestSource::new(SourceKind::CoarseNetwork);
        source.enabled = false;
        let sources: Vec<Box<dyn PositionSource>> = vec![Box::new(source)];
        let (tx, _rx) = mpsc::channel();

        match acquirer().start(&sources, tx) {
            Err(AcquireError::NoPositionAvailable) => {}
            other => panic!("expected NoPositionAvailable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn permission_denied_is_reported_distinctly() {
        let mut source = TestSource::new(SourceKind::CoarseNetwork);
        source.permission_denied = true;
        let sources: Vec<Box<dyn PositionSource>> = vec![Box::new(source)];
        let (tx, _rx) = mpsc::channel();

        match acquirer().start(&sources, tx) {
            Err(AcquireError::PermissionDenied) => {}
            other => panic!("expected PermissionDenied, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn cancellation_discards_late_fixes_and_is_idempotent() {
        let source = TestSource::new(SourceKind::CoarseNetwork);
        let listener_slot = Arc::clone(&source.listener);
        let sources: Vec<Box<dyn PositionSource>> = vec![Box::new(source)];
        let (tx, rx) = mpsc::channel();

        let handle = acquirer().start(&sources, tx).unwrap();

        // Simulate a delivery already in flight when cancel lands: take the
        // listener out before cancelling, then invoke it afterwards.
        let mut in_flight = listener_slot.lock().unwrap().take().unwrap();

        handle.cancel();
        assert_eq!(handle.state(), AcquireState::CancelledExternally);

        // Second cancel is a no-op
        handle.cancel();
        assert_eq!(handle.state(), AcquireState::CancelledExternally);

        // The late fix is discarded, not emitted or recorded
        assert_eq!(in_flight(fix(3.0)), Flow::Stop);
        assert!(rx.try_recv().is_err());
        assert!(handle.best_fix().is_none());
    }

    #[test]
    fn accuracy_termination_is_not_overwritten_by_cancel() {
        let source = TestSource::new(SourceKind::CoarseNetwork);
        let listener_slot = Arc::clone(&source.listener);
        let sources: Vec<Box<dyn PositionSource>> = vec![Box::new(source)];
        let (tx, _rx) = mpsc::channel();

        let handle = acquirer().start(&sources, tx).unwrap();
        {
            let mut guard = listener_slot.lock().unwrap();
            let listener = guard.as_mut().unwrap();
            assert_eq!(listener(fix(5.0)), Flow::Stop);
        }
        assert_eq!(handle.state(), AcquireState::TerminatedByAccuracy);

        // Cancelling after natural termination keeps the terminal state
        handle.cancel();
        assert_eq!(handle.state(), AcquireState::TerminatedByAccuracy);
    }
}
