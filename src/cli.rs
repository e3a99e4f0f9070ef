use clap::{Parser, Subcommand};
use sc_core::config::{Config, LoggingConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "silkcast")]
#[command(author, version, about = "Convert audio to SILK over HTTP")]
pub struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable debug mode (route listing, verbose HTTP tracing)
    #[arg(long, global = true, conflicts_with = "no_debug")]
    pub debug: bool,

    /// Disable debug mode
    #[arg(long, global = true)]
    pub no_debug: bool,

    /// Log level: 0-3 or debug, info, warn, error
    #[arg(long, global = true, value_parser = parse_log_level)]
    pub log_level: Option<String>,

    /// Disable coloured console output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP service (default)
    Serve,

    /// Convert a single local file or http(s) URL and print the output path
    Convert {
        /// Local path or URL of the source audio
        #[arg(required = true)]
        input: String,
    },

    /// Check that the transcoder and encoder are available
    CheckTools,

    /// Print configuration warnings
    Validate,

    /// Display version information
    Version,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.debug {
            config.server.debug = true;
        } else if self.no_debug {
            config.server.debug = false;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.no_color {
            config.logging.color = false;
        }
    }
}

fn parse_log_level(s: &str) -> Result<String, String> {
    LoggingConfig::parse_level(s)
        .map(str::to_string)
        .ok_or_else(|| format!("invalid log level '{s}', expected 0-3 or debug/info/warn/error"))
}
