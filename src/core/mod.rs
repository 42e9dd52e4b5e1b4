//! Core types - pure abstractions shared across the codebase.

mod key;
mod route;
mod state;
mod target;

pub use key::{EntryKey, PageKind};
pub use route::{
    BLOCKED_PAGES, ROOT_PAGES, bundle_path, denormalize_page_path, is_api_route,
    is_middleware_route, normalize_page_path, route_from_entry_name,
};
pub use state::{is_shutdown, register_server, setup_shutdown_handler};
pub use target::Target;
