//! GeoClue2 position sources over D-Bus.
//!
//! Both source kinds are backed by the same GeoClue2 daemon; they differ only
//! in the accuracy level requested on the client object, which is what steers
//! GeoClue between network-based lookups and GNSS hardware. Uses zbus's
//! blocking API with the signal stream running on a dedicated thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use zbus::blocking::Connection;
use zbus::zvariant::OwnedObjectPath;

use super::{AcquireError, Fix, FixListener, Flow, PositionSource, SourceKind, Subscription};

const GEOCLUE_SERVICE: &str = "org.freedesktop.GeoClue2";
const DESKTOP_ID: &str = "sunwidgetr";

/// GeoClue2 accuracy levels (GClueAccuracyLevel).
const ACCURACY_LEVEL_CITY: u32 = 4;
const ACCURACY_LEVEL_EXACT: u32 = 8;

/// How long to wait for the background thread to finish D-Bus setup before
/// declaring the subscription failed.
const SETUP_TIMEOUT: Duration = Duration::from_secs(5);

#[zbus::proxy(
    interface = "org.freedesktop.GeoClue2.Manager",
    default_service = "org.freedesktop.GeoClue2",
    default_path = "/org/freedesktop/GeoClue2/Manager"
)]
trait GeoClueManager {
    fn get_client(&self) -> zbus::Result<OwnedObjectPath>;
}

#[zbus::proxy(
    interface = "org.freedesktop.GeoClue2.Client",
    default_service = "org.freedesktop.GeoClue2"
)]
trait GeoClueClient {
    fn start(&self) -> zbus::Result<()>;

    fn stop(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn desktop_id(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn set_desktop_id(&self, id: &str) -> zbus::Result<()>;

    #[zbus(property)]
    fn requested_accuracy_level(&self) -> zbus::Result<u32>;

    #[zbus(property)]
    fn set_requested_accuracy_level(&self, level: u32) -> zbus::Result<()>;

    #[zbus(signal)]
    fn location_updated(
        &self,
        old: zbus::zvariant::ObjectPath<'_>,
        new: zbus::zvariant::ObjectPath<'_>,
    ) -> zbus::Result<()>;
}

#[zbus::proxy(
    interface = "org.freedesktop.GeoClue2.Location",
    default_service = "org.freedesktop.GeoClue2"
)]
trait GeoClueLocation {
    #[zbus(property)]
    fn latitude(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn longitude(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn accuracy(&self) -> zbus::Result<f64>;
}

/// One GeoClue2-backed position source.
pub struct GeoClueSource {
    kind: SourceKind,
}

impl GeoClueSource {
    pub fn new(kind: SourceKind) -> Self {
        Self { kind }
    }

    /// Both GeoClue-backed kinds, coarse first.
    pub fn all() -> Vec<Box<dyn PositionSource>> {
        vec![
            Box::new(GeoClueSource::new(SourceKind::CoarseNetwork)),
            Box::new(GeoClueSource::new(SourceKind::PreciseSatellite)),
        ]
    }

    fn accuracy_level(&self) -> u32 {
        match self.kind {
            SourceKind::CoarseNetwork => ACCURACY_LEVEL_CITY,
            SourceKind::PreciseSatellite => ACCURACY_LEVEL_EXACT,
        }
    }
}

/// Distinguish the agent refusing us from GeoClue being absent or broken.
fn map_dbus_error(err: zbus::Error, action: &str) -> AcquireError {
    if let zbus::Error::MethodError(ref name, _, _) = err
        && name.as_str().ends_with("AccessDenied")
    {
        return AcquireError::PermissionDenied;
    }
    AcquireError::Backend(anyhow!(err).context(format!("geoclue: {action}")))
}

fn read_fix(connection: &Connection, path: &OwnedObjectPath) -> Result<Fix, zbus::Error> {
    let location = GeoClueLocationProxyBlocking::builder(connection)
        .path(path.clone())?
        .build()?;
    Ok(Fix {
        latitude: location.latitude()?,
        longitude: location.longitude()?,
        accuracy: location.accuracy()?,
    })
}

impl PositionSource for GeoClueSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Enabled when the GeoClue2 service is reachable on the system bus,
    /// either running or activatable.
    fn is_enabled(&self) -> bool {
        let Ok(connection) = Connection::system() else {
            return false;
        };
        let Ok(dbus) = zbus::blocking::fdo::DBusProxy::new(&connection) else {
            return false;
        };
        if let Ok(name) = GEOCLUE_SERVICE.try_into() {
            if dbus.name_has_owner(zbus::names::BusName::WellKnown(name)) == Ok(true) {
                return true;
            }
        }
        dbus.list_activatable_names()
            .map(|names| names.iter().any(|n| n.as_str() == GEOCLUE_SERVICE))
            .unwrap_or(false)
    }

    /// GeoClue exposes no passive last-known fix; a client must be started
    /// to get anything, so this source never answers instantly.
    fn last_known_fix(&self) -> Option<Fix> {
        None
    }

    fn subscribe(&self, mut listener: FixListener) -> Result<Box<dyn Subscription>, AcquireError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let accuracy_level = self.accuracy_level();

        // The blocking signal stream has to live on its own thread. Setup
        // errors are handed back synchronously through this channel so the
        // caller sees PermissionDenied instead of a silent dead thread.
        let (setup_tx, setup_rx) = mpsc::channel::<Result<(Connection, OwnedObjectPath), AcquireError>>();

        let thread_cancelled = Arc::clone(&cancelled);
        thread::spawn(move || {
            let setup = || {
                let connection = Connection::system().map_err(|e| {
                    AcquireError::Backend(anyhow!(e).context("connecting to system bus"))
                })?;
                let manager = GeoClueManagerProxyBlocking::new(&connection)
                    .map_err(|e| map_dbus_error(e, "creating manager proxy"))?;
                let client_path = manager
                    .get_client()
                    .map_err(|e| map_dbus_error(e, "requesting client object"))?;
                let client = GeoClueClientProxyBlocking::builder(&connection)
                    .path(client_path.clone())
                    .map_err(|e| map_dbus_error(e, "binding client path"))?
                    .build()
                    .map_err(|e| map_dbus_error(e, "creating client proxy"))?;
                client
                    .set_desktop_id(DESKTOP_ID)
                    .map_err(|e| map_dbus_error(e.into(), "setting desktop id"))?;
                client
                    .set_requested_accuracy_level(accuracy_level)
                    .map_err(|e| map_dbus_error(e.into(), "setting accuracy level"))?;
                let updates = client
                    .receive_location_updated()
                    .map_err(|e| map_dbus_error(e, "subscribing to location updates"))?;
                client
                    .start()
                    .map_err(|e| map_dbus_error(e, "starting client"))?;
                Ok((connection, client_path, client, updates))
            };

            let (connection, client_path, client, mut updates) = match setup() {
                Ok(parts) => parts,
                Err(err) => {
                    let _ = setup_tx.send(Err(err));
                    return;
                }
            };
            let _ = setup_tx.send(Ok((connection.clone(), client_path)));

            for signal in &mut updates {
                if thread_cancelled.load(Ordering::SeqCst) {
                    break;
                }
                let Ok(args) = signal.args() else { continue };
                let new_path = OwnedObjectPath::from(args.new.to_owned());
                let fix = match read_fix(&connection, &new_path) {
                    Ok(fix) => fix,
                    Err(err) => {
                        log_debug!("geoclue: failed to read location object: {}", err);
                        continue;
                    }
                };
                if listener(fix) == Flow::Stop {
                    break;
                }
            }
            let _ = client.stop();
        });

        match setup_rx.recv_timeout(SETUP_TIMEOUT) {
            Ok(Ok((connection, client_path))) => Ok(Box::new(GeoClueSubscription {
                cancelled,
                connection: Some(connection),
                client_path,
            })),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(AcquireError::Backend(
                anyhow!("timed out waiting for GeoClue client setup").context("geoclue"),
            )),
        }
    }
}

struct GeoClueSubscription {
    cancelled: Arc<AtomicBool>,
    connection: Option<Connection>,
    client_path: OwnedObjectPath,
}

impl Subscription for GeoClueSubscription {
    fn cancel(&mut self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        // Stop the GeoClue client directly; the stream thread may be parked
        // waiting for a signal that will now never arrive, and exits on the
        // next wakeup.
        if let Some(connection) = self.connection.take() {
            let stopped = GeoClueClientProxyBlocking::builder(&connection)
                .path(self.client_path.clone())
                .ok()
                .and_then(|b| b.build().ok())
                .map(|client| client.stop());
            if let Some(Err(err)) = stopped {
                log_debug!("geoclue: failed to stop client: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_levels_map_to_source_kinds() {
        assert_eq!(
            GeoClueSource::new(SourceKind::CoarseNetwork).accuracy_level(),
            ACCURACY_LEVEL_CITY
        );
        assert_eq!(
            GeoClueSource::new(SourceKind::PreciseSatellite).accuracy_level(),
            ACCURACY_LEVEL_EXACT
        );
    }

    #[test]
    fn access_denied_maps_to_permission_denied() {
        let err = zbus::Error::MethodError(
            "org.freedesktop.DBus.Error.AccessDenied".try_into().unwrap(),
            None,
            zbus::message::Message::method_call("/", "Dummy")
                .unwrap()
                .build(&())
                .unwrap(),
        );
        assert!(matches!(
            map_dbus_error(err, "test"),
            AcquireError::PermissionDenied
        ));
    }
}
