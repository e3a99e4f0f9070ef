//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which lays out upload, output and log
//! directories in a temp dir and builds a full [`AppContext`]. The
//! [`TestHarness::with_server`] constructor starts Axum on a random port for
//! HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sc_av::ToolRegistry;
use sc_core::config::Config;
use sc_server::context::AppContext;
use sc_server::router::build_router;

/// Writes `$*` into its last argument, standing in for the transcoder.
pub const FAKE_TRANSCODER: &str = r#"for last; do :; done
printf '%s\n' "$*" > "$last""#;

/// Copies the PCM into the output and appends the mode flag.
pub const FAKE_ENCODER: &str = r#"cat "$1" > "$2"
printf 'flag=%s\n' "$3" >> "$2""#;

/// Exits non-zero with a message on stderr.
pub const FAILING_TOOL: &str = r#"echo "unsupported codec" >&2
exit 1"#;

/// Test harness wrapping a fully-constructed [`AppContext`] over temp dirs.
pub struct TestHarness {
    pub ctx: AppContext,
    pub root: tempfile::TempDir,
}

impl TestHarness {
    /// Harness with tools that do not exist on disk.
    pub fn new() -> Self {
        Self::build(|_| {}, None)
    }

    /// Harness whose transcoder and encoder are the given shell scripts.
    pub fn with_scripts(transcoder: &str, encoder: &str) -> Self {
        Self::build(|_| {}, Some((transcoder, encoder)))
    }

    /// Harness with scripted tools and a config tweak.
    pub fn with_config(
        configure: impl FnOnce(&mut Config),
        scripts: Option<(&str, &str)>,
    ) -> Self {
        Self::build(configure, scripts)
    }

    fn build(configure: impl FnOnce(&mut Config), scripts: Option<(&str, &str)>) -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();
        config.storage.upload_dir = root.path().join("uploads");
        config.storage.output_dir = root.path().join("outputs");
        config.storage.log_dir = root.path().join("logs");
        config.server.static_dir = None;
        configure(&mut config);
        config.storage.ensure_dirs().expect("failed to create storage dirs");

        let (transcoder, encoder) = match scripts {
            Some((t, e)) => (
                write_script(root.path(), "ffmpeg", t),
                write_script(root.path(), "encoder", e),
            ),
            None => (
                root.path().join("missing-ffmpeg"),
                root.path().join("missing-encoder"),
            ),
        };
        let tools = Arc::new(ToolRegistry::with_paths(transcoder, encoder, None));
        let ctx = AppContext::with_tools(config, tools).expect("failed to build context");

        Self { ctx, root }
    }

    /// Start an Axum server on a random port and return the bound address.
    pub async fn serve(&self) -> SocketAddr {
        let app = build_router(self.ctx.clone(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        addr
    }

    /// Build the harness and serve it in one step.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let addr = harness.serve().await;
        (harness, addr)
    }

    pub fn upload_dir(&self) -> &Path {
        self.ctx.upload_dir()
    }

    pub fn output_dir(&self) -> &Path {
        self.ctx.output_dir()
    }
}

/// Sorted file names in `dir`.
pub fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("failed to read dir")
        .map(|e| e.expect("bad dir entry").file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.join("bin");
    std::fs::create_dir_all(&bin).expect("failed to create bin dir");
    let path = bin.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod script");
    path
}

#[cfg(not(unix))]
fn write_script(dir: &Path, name: &str, _body: &str) -> PathBuf {
    dir.join(name)
}
