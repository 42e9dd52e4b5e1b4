//! Actor Message Definitions
//!
//! ```text
//! FsActor --FilesChanged--> BuildActor <--Ensure/Ping/Fallback-- HotReloader
//! ```

use std::path::PathBuf;

use tokio::sync::oneshot;

use crate::compiler::FallbackOutcome;
use crate::core::EntryKey;
use crate::entry::Waiter;

/// Messages to the Build Actor
#[derive(Debug)]
pub enum BuildMsg {
    /// Activate an entry and answer once a pass including it settles
    Ensure { key: EntryKey, reply: Waiter },
    /// Client keep-alive; answers whether the page is still active
    Ping {
        route: String,
        reply: oneshot::Sender<bool>,
    },
    /// Debounced source changes
    FilesChanged(Vec<PathBuf>),
    /// Unconditional pass (startup)
    Rebuild,
    /// Opportunistic eviction of inactive entries
    Tick,
    /// One-shot `_app` + `_error` build
    Fallback {
        reply: oneshot::Sender<FallbackOutcome>,
    },
    /// Reject waiters and stop
    Shutdown,
}
