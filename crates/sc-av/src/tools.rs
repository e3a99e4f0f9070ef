//! External tool detection.
//!
//! The [`ToolRegistry`] resolves the transcoder (ffmpeg) and the SILK encoder
//! once at startup and is shared read-only for the rest of the process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Executable name searched for on `PATH` for the transcoder.
pub const TRANSCODER: &str = "ffmpeg";
/// Executable name searched for on `PATH` for the SILK encoder.
pub const ENCODER: &str = "encoder";

#[cfg(windows)]
const DEFAULT_TRANSCODER_PATH: &str = r"D:\ffmpeg-7.1.1-essentials_build\bin\ffmpeg.exe";
#[cfg(windows)]
const DEFAULT_ENCODER_PATH: &str = r"D:\silk\encoder.exe";
#[cfg(not(windows))]
const DEFAULT_TRANSCODER_PATH: &str = "/usr/bin/ffmpeg";
#[cfg(not(windows))]
const DEFAULT_ENCODER_PATH: &str = "/usr/local/bin/encoder";

/// Where a tool's path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToolSource {
    /// An explicit path from the tools config.
    Configured,
    /// Found by searching `PATH`.
    SearchPath,
    /// Nothing found; the platform default is assumed.
    PlatformDefault,
}

/// A resolved external tool.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Human-readable tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
    pub source: ToolSource,
    /// Maximum execution time before the tool is killed, if any.
    pub timeout: Option<Duration>,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the resolved path points at an existing file.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    #[schema(value_type = String)]
    pub path: PathBuf,
    pub source: ToolSource,
}

/// Registry holding the two tools the conversion pipeline needs.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    transcoder: ToolConfig,
    encoder: ToolConfig,
}

impl ToolRegistry {
    /// Resolve both tools.
    ///
    /// For each tool, a configured path is used when it exists; otherwise
    /// [`which::which`] searches `PATH`; otherwise the platform default path
    /// is assumed so that a later invocation fails with a clear spawn error.
    pub fn discover(tools_config: &sc_core::config::ToolsConfig) -> Self {
        let timeout = tools_config.timeout();
        let transcoder = resolve(
            TRANSCODER,
            tools_config.transcoder_path.as_deref(),
            DEFAULT_TRANSCODER_PATH,
            timeout,
        );
        let encoder = resolve(
            ENCODER,
            tools_config.encoder_path.as_deref(),
            DEFAULT_ENCODER_PATH,
            timeout,
        );

        tracing::debug!(path = %transcoder.path.display(), source = ?transcoder.source, "Transcoder resolved");
        tracing::debug!(path = %encoder.path.display(), source = ?encoder.source, "Encoder resolved");

        Self {
            transcoder,
            encoder,
        }
    }

    /// Use explicit executables without any discovery.
    pub fn with_paths(transcoder: PathBuf, encoder: PathBuf, timeout: Option<Duration>) -> Self {
        let tool = |name: &str, path: PathBuf| ToolConfig {
            name: name.to_string(),
            path,
            source: ToolSource::Configured,
            timeout,
        };
        Self {
            transcoder: tool(TRANSCODER, transcoder),
            encoder: tool(ENCODER, encoder),
        }
    }

    /// The decode-to-PCM tool.
    pub fn transcoder(&self) -> &ToolConfig {
        &self.transcoder
    }

    /// The PCM-to-SILK tool.
    pub fn encoder(&self) -> &ToolConfig {
        &self.encoder
    }

    /// Check both tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        [&self.transcoder, &self.encoder]
            .into_iter()
            .map(|cfg| {
                let available = cfg.path.is_file();
                let version = if available && cfg.name == TRANSCODER {
                    detect_version(&cfg.path)
                } else {
                    None
                };
                ToolInfo {
                    name: cfg.name.clone(),
                    available,
                    version,
                    path: cfg.path.clone(),
                    source: cfg.source,
                }
            })
            .collect()
    }
}

fn resolve(
    name: &str,
    configured: Option<&Path>,
    platform_default: &str,
    timeout: Option<Duration>,
) -> ToolConfig {
    let (path, source) = match configured {
        Some(p) if p.exists() => (p.to_path_buf(), ToolSource::Configured),
        configured => {
            if let Some(p) = configured {
                tracing::warn!(
                    "Configured {name} path {} does not exist; searching PATH",
                    p.display()
                );
            }
            match which::which(name) {
                Ok(found) => (found, ToolSource::SearchPath),
                Err(_) => (PathBuf::from(platform_default), ToolSource::PlatformDefault),
            }
        }
    };

    ToolConfig {
        name: name.to_string(),
        path,
        source,
        timeout,
    }
}

/// Run `ffmpeg -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
