//! Collision-free file names for staged inputs, intermediates and outputs.
//!
//! Names start with a high-resolution timestamp so they sort chronologically,
//! and end with a random token from a fresh UUID so two conversions started
//! within the same clock tick still get distinct names.

use chrono::{DateTime, Local};
use uuid::Uuid;

/// Extension of SILK output artifacts.
pub const SILK_EXTENSION: &str = "silk";
/// Extension of intermediate raw PCM files.
pub const PCM_EXTENSION: &str = "pcm";

/// File names reserved for a single conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    /// e.g. `20261016_153045_123456789_1f2e3d4c.silk`
    pub output: String,
    /// e.g. `1792157445123456789_1f2e3d4c.pcm`
    pub intermediate: String,
}

impl ArtifactNames {
    /// Generate names for a conversion starting now.
    pub fn generate() -> Self {
        Self::at(Local::now())
    }

    fn at(now: DateTime<Local>) -> Self {
        let token = short_token();
        Self {
            output: format!(
                "{}_{}.{SILK_EXTENSION}",
                now.format("%Y%m%d_%H%M%S_%9f"),
                token
            ),
            intermediate: format!("{}_{}.{PCM_EXTENSION}", nanos(&now), token),
        }
    }
}

/// A unique stem for a staged input file: `<unix nanos>_<token>`.
pub fn unique_stem() -> String {
    format!("{}_{}", nanos(&Local::now()), short_token())
}

/// Reduce a client-supplied file name or URL path to a safe extension.
///
/// Only ASCII alphanumeric extensions of at most 8 characters survive; the
/// result is lowercase and never contains path separators.
pub fn sanitize_extension(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?;
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 8 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn nanos(now: &DateTime<Local>) -> i64 {
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1000))
}

fn short_token() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
