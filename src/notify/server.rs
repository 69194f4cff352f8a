//! Unix socket server that broadcasts widget events.
//!
//! Accepts client connections on a non-blocking Unix domain socket and pushes
//! each [`WidgetEvent`] to all of them as one JSON line. The protocol is
//! broadcast-only; clients never send data, and a readable-but-empty stream
//! is how we detect they went away.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use crate::common::utils::runtime_dir;
use crate::notify::events::WidgetEvent;

const SOCKET_FILE: &str = "sunwidgetr-events.sock";

/// Broadcast socket server for widget event delivery.
pub struct EventSocketServer {
    socket_path: PathBuf,
    listener: UnixListener,
    clients: HashMap<u32, ClientConnection>,
    next_client_id: u32,
    /// Last DataUpdated event, replayed to newly connected clients so a
    /// widget that attaches between syncs still gets current times.
    last_update: Option<WidgetEvent>,
}

struct ClientConnection {
    raw_stream: UnixStream,
    writer: BufWriter<UnixStream>,
    connected_at: Instant,
}

impl EventSocketServer {
    pub fn new(socket_path: PathBuf) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        listener
            .set_nonblocking(true)
            .context("Failed to set socket to non-blocking mode")?;

        Ok(Self {
            socket_path,
            listener,
            clients: HashMap::new(),
            next_client_id: 1,
            last_update: None,
        })
    }

    /// Run the server loop until the running flag clears.
    pub fn run(
        mut self,
        event_receiver: mpsc::Receiver<WidgetEvent>,
        running: Arc<AtomicBool>,
        debug_enabled: bool,
    ) -> Result<()> {
        if debug_enabled {
            log_debug!("Event server starting on socket: {:?}", self.socket_path);
        }

        while running.load(Ordering::SeqCst) {
            while let Ok(event) = event_receiver.try_recv() {
                if let WidgetEvent::DataUpdated { .. } = event {
                    self.last_update = Some(event.clone());
                }
                self.broadcast_event(&event, debug_enabled)?;
            }

            self.accept(debug_enabled)?;
            self.prune_clients(debug_enabled);

            // Small delay to prevent busy-waiting
            thread::sleep(Duration::from_millis(10));
        }

        if debug_enabled {
            log_debug!("Event server shutting down");
        }

        self.cleanup()?;
        Ok(())
    }

    /// Broadcast one event to every connected client as a JSON line.
    fn broadcast_event(&mut self, event: &WidgetEvent, debug_enabled: bool) -> Result<()> {
        let json_line =
            serde_json::to_string(event).context("Failed to serialize widget event to JSON")?;
        let message = format!("{}\n", json_line);

        let mut failed_clients = Vec::new();
        for (client_id, client) in &mut self.clients {
            if client.writer.write_all(message.as_bytes()).is_err()
                || client.writer.flush().is_err()
            {
                failed_clients.push(*client_id);
            }
        }

        for client_id in failed_clients {
            self.drop_client(client_id, debug_enabled);
        }

        Ok(())
    }

    /// Accept pending client connections (non-blocking).
    fn accept(&mut self, debug_enabled: bool) -> Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    let client_id = self.next_client_id;
                    self.next_client_id += 1;

                    stream
                        .set_nonblocking(true)
                        .context("Failed to set client stream to non-blocking mode")?;
                    let writer_stream = stream
                        .try_clone()
                        .context("Failed to clone stream for writer")?;

                    let mut client = ClientConnection {
                        raw_stream: stream,
                        writer: BufWriter::new(writer_stream),
                        connected_at: Instant::now(),
                    };

                    // Replay the last update so the client starts in sync
                    if let Some(ref event) = self.last_update {
                        let json_line = serde_json::to_string(event)
                            .context("Failed to serialize replay event for new client")?;
                        let message = format!("{}\n", json_line);
                        if client.writer.write_all(message.as_bytes()).is_err()
                            || client.writer.flush().is_err()
                        {
                            if debug_enabled {
                                log_debug!("Failed to replay last update to client {}", client_id);
                            }
                            continue;
                        }
                    }

                    self.clients.insert(client_id, client);
                    if debug_enabled {
                        log_debug!("Event connections: {}", self.clients.len());
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    if debug_enabled {
                        log_debug!("Error accepting client connection: {}", e);
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    /// Detect disconnections by attempting a read; in a broadcast-only
    /// protocol any end-of-stream or reset means the client is gone.
    fn prune_clients(&mut self, debug_enabled: bool) {
        use std::io::Read;
        let mut disconnected = Vec::new();

        for (client_id, client) in &mut self.clients {
            let mut buffer = [0u8; 1];
            match client.raw_stream.read(&mut buffer) {
                Ok(0) => disconnected.push(*client_id),
                Ok(_) => {
                    // Unexpected inbound data; keep the connection alive
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(_) => disconnected.push(*client_id),
            }
        }

        for client_id in disconnected {
            self.drop_client(client_id, debug_enabled);
        }
    }

    fn drop_client(&mut self, client_id: u32, debug_enabled: bool) {
        if let Some(client) = self.clients.remove(&client_id)
            && debug_enabled
        {
            let duration = client.connected_at.elapsed();
            if duration.as_secs() < 2 {
                log_debug!(
                    "Event one-shot client served ({}ms) - connections: {}",
                    duration.as_millis(),
                    self.clients.len()
                );
            } else {
                log_debug!(
                    "Event client disconnected after {}s - connections: {}",
                    duration.as_secs(),
                    self.clients.len()
                );
            }
        }
    }

    fn cleanup(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)
                .with_context(|| format!("Failed to remove socket file: {:?}", self.socket_path))?;
        }
        Ok(())
    }
}

/// Socket path for the event server, under the user runtime directory.
pub fn socket_path() -> Result<PathBuf> {
    Ok(runtime_dir().join(SOCKET_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_uses_expected_file_name() {
        let path = socket_path().unwrap();
        assert!(path.to_string_lossy().ends_with(SOCKET_FILE));
    }

    #[test]
    fn server_creates_and_removes_socket() {
        let temp_dir = tempfile::tempdir().unwrap();
        let socket_path = temp_dir.path().join("test-sunwidgetr.sock");

        let server = EventSocketServer::new(socket_path.clone()).unwrap();
        assert!(socket_path.exists());

        server.cleanup().unwrap();
        assert!(!socket_path.exists());
    }

    #[test]
    fn broadcast_reaches_connected_client() {
        use std::io::{BufRead, BufReader};

        let temp_dir = tempfile::tempdir().unwrap();
        let socket_path = temp_dir.path().join("bcast.sock");
        let mut server = EventSocketServer::new(socket_path.clone()).unwrap();

        let client = UnixStream::connect(&socket_path).unwrap();
        server.accept(false).unwrap();
        assert_eq!(server.clients.len(), 1);

        let event = WidgetEvent::run_requested(vec![5]);
        server.broadcast_event(&event, false).unwrap();

        let mut line = String::new();
        BufReader::new(client).read_line(&mut line).unwrap();
        assert!(line.contains("\"event_type\":\"run_requested\""));
        assert!(line.contains("\"targets\":[5]"));
    }
}
