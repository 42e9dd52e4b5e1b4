//! Actor System
//!
//! ```text
//! FsActor ──FilesChanged──► BuildActor ──events──► NotificationBus
//!  (watch)                  (passes)    ◄──Ensure── HotReloader
//! ```
//!
//! - `messages` - message types
//! - `build` - compilation orchestrator
//! - `fs` - file system watcher with debouncing
//! - `coordinator` - wires up and runs actors

pub mod build;
pub mod coordinator;
pub mod fs;
pub mod messages;

pub use build::BuildView;
pub use coordinator::{ActorSystem, Coordinator};
pub use messages::BuildMsg;
