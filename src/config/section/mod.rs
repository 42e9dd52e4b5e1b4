//! Configuration section definitions.
//!
//! Each module corresponds to a section in `devpack.toml`:
//!
//! | Module      | TOML Section   | Purpose                              |
//! |-------------|----------------|--------------------------------------|
//! | `build`     | `[build]`      | Pages dir, dist dir, extensions      |
//! | `serve`     | `[serve]`      | Development server                   |
//! | `on_demand` | `[on_demand]`  | Entry inactivity and eviction        |
//! | `hmr`       | `[hmr]`        | Live reload socket                   |

mod build;
mod hmr;
mod on_demand;
mod serve;

pub use build::BuildConfig;
pub use hmr::HmrConfig;
pub use on_demand::OnDemandConfig;
pub use serve::ServeConfig;
