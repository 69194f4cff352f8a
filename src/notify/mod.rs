//! Fire-and-forget notification channel for widget processes.
//!
//! Synchronization code hands typed events to a [`Notifier`]; a background
//! [`EventServer`] thread broadcasts them over a Unix socket to any widget
//! that cares to listen. Emission never blocks and never fails the caller:
//! losing an event because no widget is connected is acceptable, failing a
//! sync because of a notification problem is not.

use anyhow::{Context, Result};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, mpsc};

use crate::api::SunTimes;

pub mod events;
mod server;

pub use events::WidgetEvent;
pub use server::socket_path;

/// Sending half of the notification channel.
///
/// Cheap to clone into whatever component needs to emit. All send methods
/// swallow channel errors; a missing server makes emission a no-op.
#[derive(Clone)]
pub struct Notifier {
    event_sender: mpsc::Sender<WidgetEvent>,
}

impl Notifier {
    /// Create a notifier and the receiver for the server thread.
    pub fn new() -> (Self, mpsc::Receiver<WidgetEvent>) {
        let (event_sender, event_receiver) = mpsc::channel();
        (Self { event_sender }, event_receiver)
    }

    /// A notifier wired to nothing, for one-shot commands that run without
    /// an event server.
    pub fn disconnected() -> Self {
        let (notifier, _receiver) = Self::new();
        notifier
    }

    pub fn send_run_requested(&self, targets: Vec<u32>) {
        let _ = self.event_sender.send(WidgetEvent::run_requested(targets));
    }

    pub fn send_data_updated(&self, targets: Vec<u32>, times: &SunTimes) {
        let _ = self
            .event_sender
            .send(WidgetEvent::data_updated(targets, times));
    }

    pub fn send_no_connection(&self, targets: Vec<u32>, cached: Option<&SunTimes>) {
        let _ = self
            .event_sender
            .send(WidgetEvent::no_connection(targets, cached));
    }
}

/// Background event server owning the broadcast socket.
pub struct EventServer {
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl EventServer {
    /// Start the server thread. The running flag is shared with the signal
    /// handler; clearing it shuts the server down.
    pub fn start(
        event_receiver: mpsc::Receiver<WidgetEvent>,
        running_flag: Arc<AtomicBool>,
        debug_enabled: bool,
    ) -> Result<Self> {
        let running = Arc::clone(&running_flag);

        let thread_handle = std::thread::Builder::new()
            .name("event-server".to_string())
            .spawn(move || {
                if let Err(e) = Self::run(event_receiver, running, debug_enabled) {
                    log_warning!("Event server stopped: {:#}", e);
                }
            })
            .context("Failed to spawn event server thread")?;

        Ok(Self {
            thread_handle: Some(thread_handle),
        })
    }

    /// Wait for the server thread to finish. The running flag is cleared by
    /// the signal handler before this is called.
    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.thread_handle.take() {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("Event server thread panicked"))?;
        }
        Ok(())
    }

    fn run(
        event_receiver: mpsc::Receiver<WidgetEvent>,
        running: Arc<AtomicBool>,
        debug_enabled: bool,
    ) -> Result<()> {
        let socket_path = server::socket_path().context("Failed to get event socket path")?;
        let socket_server = server::EventSocketServer::new(socket_path)
            .context("Failed to create event socket server")?;
        socket_server
            .run(event_receiver, running, debug_enabled)
            .context("Event socket server failed")?;
        Ok(())
    }
}
