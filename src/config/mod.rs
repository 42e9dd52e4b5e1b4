//! Project configuration for `devpack.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [build] [serve] [on_demand] [hmr]
//! ├── types/         # ConfigError, FieldPath, global handle
//! ├── util.rs        # config file discovery
//! └── mod.rs         # DevConfig (this file)
//! ```
//!
//! The config file is optional. Without one every section takes its
//! defaults and the project root is the current directory.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;
pub use util::normalize_path;

pub use section::{BuildConfig, HmrConfig, OnDemandConfig, ServeConfig};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath, cfg, init_config};

use crate::{
    cli::{Cli, Commands},
    log,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing devpack.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub on_demand: OnDemandConfig,

    #[serde(default)]
    pub hmr: HmrConfig,
}

impl DevConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. The project root is
    /// the config file's parent directory, or cwd when there is none.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, config_path) = match find_config_file(&cli.config) {
            Some(path) => (Self::from_path(&path)?, path),
            None => {
                log!("serve"; "no {} found, using defaults", cli.config.display());
                (Self::default(), cwd.join(&cli.config))
            }
        };

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);

        config.config_path = normalize_path(&config_path);
        config.apply_command_options(cli);
        config.normalize_paths(&root);
        config.validate()?;
        crate::debug!("config"; "root {}, config {}", config.root.display(), config.config_path.display());

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warn"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// First port tried for the live-reload socket.
    pub fn hmr_port(&self) -> u16 {
        self.hmr
            .port
            .unwrap_or_else(|| self.serve.port.saturating_add(1))
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);
        Self::update_option(&mut self.build.pages, cli.pages.as_ref());

        match &cli.command {
            Commands::Serve {
                interface,
                port,
                watch,
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
            }
            Commands::Check { .. } => {}
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Normalize all paths relative to root directory.
    fn normalize_paths(&mut self, root: &Path) {
        self.root = normalize_path(root);
        self.build.pages = normalize_path(&self.root.join(&self.build.pages));
        self.build.dist = normalize_path(&self.root.join(&self.build.dist));
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Collect every validation error and return them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        self.collect_diagnostics(&mut diag);
        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    fn collect_diagnostics(&self, diag: &mut ConfigDiagnostics) {
        if self.build.extensions.is_empty() {
            diag.error_with_hint(
                BuildConfig::EXTENSIONS,
                "at least one page extension is required",
                "extensions = [\"tsx\", \"ts\", \"jsx\", \"js\"]",
            );
        }
        if let Some(ext) = self
            .build
            .extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            diag.error_with_hint(
                BuildConfig::EXTENSIONS,
                format!("invalid extension `{ext}`"),
                "write extensions without the leading dot",
            );
        }
        let build_id = &self.build.build_id;
        if build_id.is_empty() || build_id.contains(['/', '\\']) {
            diag.error(
                BuildConfig::BUILD_ID,
                "must be a single non-empty path segment",
            );
        }
        if !self.hmr.path.starts_with('/') {
            diag.error(HmrConfig::PATH, "must start with `/`");
        }
        if self.hmr.queue_capacity == 0 {
            diag.error(HmrConfig::QUEUE_CAPACITY, "must be at least 1");
        }
        if self.on_demand.dispose_interval == 0 {
            diag.error(OnDemandConfig::DISPOSE_INTERVAL, "must be greater than 0");
        }
        if self.serve.port == 0 {
            diag.error(ServeConfig::PORT, "must be non-zero");
        }
        if !self.root.as_os_str().is_empty() && !self.build.pages.is_dir() {
            diag.warn(
                BuildConfig::PAGES,
                format!("pages directory `{}` does not exist", self.build.pages.display()),
            );
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> DevConfig {
    let (parsed, ignored) = DevConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// A config rooted at `root` with default sections.
#[cfg(test)]
pub fn test_config_at(root: &Path) -> DevConfig {
    let mut config = DevConfig::default();
    config.normalize_paths(root);
    config
}

// ============================================================================
// tests
// ============================================================================
