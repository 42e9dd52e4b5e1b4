//! Per-connection I/O.
//!
//! One thread per client alternates between draining its bus queue and
//! reading pings with a short socket timeout. Writes stay in publish order.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::TryRecvError;
use tungstenite::protocol::Message;
use tungstenite::{Error as WsError, WebSocket};

use super::{ClientMessage, HmrEvent, NotificationBus, Subscription};

/// How long a read waits before the queue is drained again.
pub const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Dead clients must not block a connection thread forever.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Answers client keep-alive pings.
pub trait PingHandler: Send + Sync {
    /// `true` if `page` is still an active entry.
    fn ping(&self, page: &str) -> bool;
}

enum Flow {
    Continue,
    Close,
}

pub struct ClientConnection {
    ws: WebSocket<TcpStream>,
    sub: Subscription,
    bus: Arc<NotificationBus>,
    pings: Arc<dyn PingHandler>,
}

impl ClientConnection {
    pub fn new(
        ws: WebSocket<TcpStream>,
        sub: Subscription,
        bus: Arc<NotificationBus>,
        pings: Arc<dyn PingHandler>,
    ) -> Self {
        Self {
            ws,
            sub,
            bus,
            pings,
        }
    }

    /// Serve until the client goes away or the bus drops it.
    pub fn run(mut self) {
        let id = self.sub.id;
        while !crate::core::is_shutdown() {
            if let Flow::Close = self.drain_queue() {
                break;
            }
            if let Flow::Close = self.read_once() {
                break;
            }
        }
        let _ = self.ws.close(None);
        let _ = self.ws.flush();
        self.bus.unsubscribe(id);
        crate::debug!("hmr"; "client {} disconnected", id);
    }

    fn drain_queue(&mut self) -> Flow {
        loop {
            match self.sub.rx.try_recv() {
                Ok(payload) => {
                    if let Err(e) = self.ws.send(Message::Text(payload.to_string().into())) {
                        crate::debug!("hmr"; "client {} send failed: {}", self.sub.id, e);
                        return Flow::Close;
                    }
                }
                Err(TryRecvError::Empty) => return Flow::Continue,
                Err(TryRecvError::Disconnected) => return Flow::Close,
            }
        }
    }

    fn read_once(&mut self) -> Flow {
        match self.ws.read() {
            Ok(Message::Text(text)) => {
                if let Some(ClientMessage::Ping { page }) = ClientMessage::parse(&text) {
                    let reply = HmrEvent::Pong(self.pings.ping(&page));
                    if self.ws.send(Message::Text(reply.to_json().to_string().into())).is_err() {
                        return Flow::Close;
                    }
                }
                Flow::Continue
            }
            Ok(Message::Close(_)) => Flow::Close,
            Ok(_) => Flow::Continue,
            Err(WsError::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Flow::Continue
            }
            Err(_) => Flow::Close,
        }
    }
}
