//! Live reload: the notification bus and its socket clients.
//!
//! ```text
//! build actor --publish--> NotificationBus --queue--> ClientConnection --> browser
//!                                                          |
//!      PingHandler <----------------- {"event":"ping"} ----+
//! ```

mod bus;
mod client;
mod message;
mod upgrade;


pub use bus::{NotificationBus, Subscription};
pub use client::PingHandler;
pub use message::{ClientMessage, HmrEvent};
pub use upgrade::{Upgrader, start_hmr_server};
#[cfg(test)]
pub use upgrade::Upgrade;
