//! Live-reload socket listener and handshake.

use std::cell::Cell;
use std::net::{IpAddr, TcpListener, TcpStream};
use std::sync::Arc;

use anyhow::Result;
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;

use super::client::{ClientConnection, PingHandler, READ_TIMEOUT, WRITE_TIMEOUT};
use super::NotificationBus;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Outcome of an upgrade attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Upgrade {
    /// Handshake done; a connection thread now serves the client.
    Accepted,
    /// Not a request for the live-reload path; answered with 404.
    Ignored,
    Failed(String),
}

/// Accepts upgrades and hands clients to the bus.
pub struct Upgrader {
    path: String,
    bus: Arc<NotificationBus>,
    pings: Arc<dyn PingHandler>,
}

impl Upgrader {
    pub fn new(path: impl Into<String>, bus: Arc<NotificationBus>, pings: Arc<dyn PingHandler>) -> Self {
        Self {
            path: path.into(),
            bus,
            pings,
        }
    }

    /// Handshake on a raw socket and spawn its connection thread.
    pub fn upgrade(&self, stream: TcpStream) -> Upgrade {
        let _ = stream.set_nonblocking(false);
        let _ = stream.set_nodelay(true);

        let wrong_path = Cell::new(false);
        let path = self.path.as_str();
        let callback = |request: &Request, response: Response| {
            if request.uri().path() == path {
                Ok(response)
            } else {
                wrong_path.set(true);
                let mut reject = ErrorResponse::new(Some("404 - Not Found".to_string()));
                *reject.status_mut() = StatusCode::NOT_FOUND;
                Err(reject)
            }
        };

        let ws = match tungstenite::accept_hdr(stream, callback) {
            Ok(ws) => ws,
            Err(_) if wrong_path.get() => return Upgrade::Ignored,
            Err(e) => return Upgrade::Failed(e.to_string()),
        };

        // Timeouts only after the handshake so it is not cut short.
        let socket = ws.get_ref();
        if let Err(e) = socket
            .set_read_timeout(Some(READ_TIMEOUT))
            .and_then(|()| socket.set_write_timeout(Some(WRITE_TIMEOUT)))
        {
            return Upgrade::Failed(e.to_string());
        }

        let sub = self.bus.subscribe();
        let connection = ClientConnection::new(ws, sub, Arc::clone(&self.bus), Arc::clone(&self.pings));
        std::thread::spawn(move || connection.run());
        Upgrade::Accepted
    }
}

/// Bind the live-reload listener and accept on a background thread.
///
/// Returns the port actually bound.
pub fn start_hmr_server(interface: IpAddr, base_port: u16, upgrader: Arc<Upgrader>) -> Result<u16> {
    let (listener, actual_port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            if crate::core::is_shutdown() {
                break;
            }
            match stream {
                Ok(stream) => {
                    let upgrader = Arc::clone(&upgrader);
                    // Handshake off the accept thread; a silent peer must not stall it.
                    std::thread::spawn(move || match upgrader.upgrade(stream) {
                        Upgrade::Accepted => {}
                        Upgrade::Ignored => crate::debug!("hmr"; "ignored non-hmr upgrade"),
                        Upgrade::Failed(e) => crate::debug!("hmr"; "handshake failed: {}", e),
                    });
                }
                Err(e) => crate::log!("hmr"; "accept error: {}", e),
            }
        }
    });

    Ok(actual_port)
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "failed to bind live-reload socket after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
