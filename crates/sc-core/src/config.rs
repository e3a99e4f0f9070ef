//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! sub-configs for the server, storage layout, retention, external tools,
//! conversion limits and logging. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// File name prefix of the daily log files in the log directory.
pub const LOG_FILE_PREFIX: &str = "audio_converter";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub retention: RetentionConfig,
    pub tools: ToolsConfig,
    pub conversion: ConversionConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).map_err(|e| Error::Input(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    ///
    /// # Errors
    ///
    /// A file that exists but cannot be read ([`Error::Io`]) or parsed
    /// ([`Error::Input`]) is an error rather than a silent fallback.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                Error::Input(format!("failed to parse config file {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.retention.sweep_interval_secs == 0 {
            warnings.push("retention.sweep_interval_secs is 0; housekeeping is disabled".into());
        }

        if self.retention.file_retention_hours == 0 {
            warnings.push(
                "retention.file_retention_hours is 0; files are swept on every pass".into(),
            );
        }

        if self.conversion.max_concurrent == Some(0) {
            warnings.push(
                "conversion.max_concurrent is 0; it is treated as 1".into(),
            );
        }

        if self.tools.sample_rate == 0 {
            warnings.push("tools.sample_rate is 0; the transcoder will reject it".into());
        }

        if LoggingConfig::parse_level(&self.logging.level).is_none() {
            warnings.push(format!(
                "logging.level '{}' is not recognized (valid: 0-3, debug, info, warn, error)",
                self.logging.level
            ));
        }

        let storage = &self.storage;
        if storage.upload_dir == storage.output_dir {
            warnings.push(
                "storage.upload_dir and storage.output_dir are the same directory".into(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Verbose request tracing and route listing at startup.
    pub debug: bool,
    pub static_dir: Option<PathBuf>,
    /// Base used for download links instead of the request's Host header,
    /// e.g. `https://audio.example.com`.
    pub public_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            debug: true,
            static_dir: Some(PathBuf::from("./static")),
            public_base_url: None,
        }
    }
}

/// On-disk layout: staged inputs, SILK outputs and log files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./uploads"),
            output_dir: PathBuf::from("./outputs"),
            log_dir: PathBuf::from("./logs"),
        }
    }
}

impl StorageConfig {
    /// Create every directory of the layout if absent.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.upload_dir, &self.output_dir, &self.log_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Retention windows for housekeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub file_retention_hours: u64,
    pub log_retention_days: u64,
    pub sweep_interval_secs: u64,
    pub sweep_on_shutdown: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            file_retention_hours: 24,
            log_retention_days: 7,
            sweep_interval_secs: 3600,
            sweep_on_shutdown: true,
        }
    }
}

impl RetentionConfig {
    /// Maximum age of staged and output files.
    pub fn file_max_age(&self) -> Duration {
        Duration::from_secs(self.file_retention_hours.saturating_mul(3600))
    }

    /// Maximum age of log files.
    pub fn log_max_age(&self) -> Duration {
        Duration::from_secs(self.log_retention_days.saturating_mul(24 * 3600))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// External tool locations and invocation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub transcoder_path: Option<PathBuf>,
    pub encoder_path: Option<PathBuf>,
    /// Mode flag appended to the encoder's arguments; empty to omit.
    pub encoder_flag: String,
    /// PCM sample rate requested from the transcoder, in Hz.
    pub sample_rate: u32,
    /// Kill a tool that runs longer than this. No limit when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            transcoder_path: None,
            encoder_path: None,
            encoder_flag: "-tencent".into(),
            sample_rate: 24_000,
            timeout_secs: None,
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Conversion admission and request-size limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Upper bound on simultaneously running conversions. Unbounded when unset.
    pub max_concurrent: Option<usize>,
    pub max_upload_bytes: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: None,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Console and file logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `0`-`3` or a level name.
    pub level: String,
    pub color: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "debug".into(),
            color: true,
        }
    }
}

impl LoggingConfig {
    /// Normalize a numeric (`0`=debug .. `3`=error) or named level into a
    /// `tracing` filter directive.
    pub fn parse_level(level: &str) -> Option<&'static str> {
        match level.trim().to_ascii_lowercase().as_str() {
            "0" | "debug" => Some("debug"),
            "1" | "info" => Some("info"),
            "2" | "warn" | "warning" => Some("warn"),
            "3" | "error" => Some("error"),
            "trace" => Some("trace"),
            _ => None,
        }
    }

    /// Filter directive for this config, defaulting to `debug`.
    pub fn filter_level(&self) -> &'static str {
        Self::parse_level(&self.level).unwrap_or("debug")
    }
}
