//! Ownership of files a conversion creates and must remove.
//!
//! A [`ScratchFile`] is removed exactly once: either explicitly through
//! [`ScratchFile::cleanup`], or on drop if the owning future never got that
//! far. Removal failures are logged and never surface as errors.

use std::path::{Path, PathBuf};

/// A path that is deleted when the conversion owning it ends.
#[derive(Debug)]
pub struct ScratchFile {
    path: Option<PathBuf>,
    label: &'static str,
}

impl ScratchFile {
    /// Take ownership of `path`. The file does not need to exist yet.
    pub fn new(path: PathBuf, label: &'static str) -> Self {
        Self {
            path: Some(path),
            label,
        }
    }

    /// The owned path.
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Remove the file now. A file that was never created is not an error.
    pub fn cleanup(mut self) {
        if let Some(path) = self.path.take() {
            remove_logged(&path, self.label);
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            remove_logged(&path, self.label);
        }
    }
}

/// Remove `path`, logging anything other than success or "already gone".
pub(crate) fn remove_logged(path: &Path, label: &str) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed {label} file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {label} file {}: {e}", path.display()),
    }
}
