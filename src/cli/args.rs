//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// devpack on-demand development bundler
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: devpack.toml)
    #[arg(short = 'C', long, default_value = "devpack.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Pages directory (relative to project root)
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub pages: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start development server with on-demand builds and hot reload
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable file watching for rebuilds
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },

    /// Build every page once and report compile errors
    #[command(visible_alias = "c")]
    Check {
        /// Only check these routes (e.g. /about)
        routes: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::parse_from(["devpack", "serve", "--port", "4000", "--watch", "false"]);
        match cli.command {
            Commands::Serve { port, watch, .. } => {
                assert_eq!(port, Some(4000));
                assert_eq!(watch, Some(false));
            }
            _ => panic!("expected serve"),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_check_routes() {
        let cli = Cli::parse_from(["devpack", "-v", "check", "/about", "/"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Check { routes } => assert_eq!(routes, vec!["/about", "/"]),
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_default_config_name() {
        let cli = Cli::parse_from(["devpack", "serve"]);
        assert_eq!(cli.config, PathBuf::from("devpack.toml"));
        assert!(matches!(cli.command, Commands::Serve { .. }));
    }
}
