//! sc-server: HTTP façade over the SILK conversion pipeline.
//!
//! This crate wires the sc-av pipeline into a running service. It provides:
//!
//! - Axum routes for upload, remote URL and content-type dispatched conversion
//! - Safe download of produced SILK files and directory listings
//! - Periodic housekeeping of staged inputs, outputs and logs
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod housekeeping;
pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;

use sc_core::config::Config;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Start the conversion server.
///
/// Creates the storage directories, resolves tools, spawns housekeeping and
/// serves HTTP until a shutdown signal is received.
pub async fn start(config: Config) -> sc_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    config.storage.ensure_dirs()?;
    tracing::info!(
        "Storage: uploads={} outputs={} logs={}",
        config.storage.upload_dir.display(),
        config.storage.output_dir.display(),
        config.storage.log_dir.display()
    );

    let ctx = AppContext::new(config.clone())?;
    log_tools(&ctx).await;

    let cancel = CancellationToken::new();

    let housekeeping_ctx = ctx.clone();
    let housekeeping_cancel = cancel.clone();
    let housekeeping_handle = tokio::spawn(async move {
        housekeeping::run_housekeeping(housekeeping_ctx, housekeeping_cancel).await;
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| sc_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let app = router::build_router(ctx, config.server.static_dir.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| sc_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Audio converter listening on http://{addr}");
    if config.server.debug {
        for (method, path) in router::ROUTES {
            tracing::debug!("  {method:<5} {path}");
        }
    }

    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await;

    cancel.cancel();
    if let Err(e) = housekeeping_handle.await {
        tracing::warn!("Housekeeping task ended abnormally: {e}");
    }

    if config.retention.sweep_on_shutdown {
        let report = housekeeping::run_sweep(&config).await;
        tracing::info!(
            "Shutdown sweep removed {} files ({} failures)",
            report.removed,
            report.failed
        );
    }

    serve_result.map_err(|e| sc_core::Error::Internal(format!("Server error: {e}")))?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Version detection runs the transcoder synchronously, so it stays off the
/// async workers.
async fn log_tools(ctx: &AppContext) {
    let tools = ctx.tools.clone();
    let infos = match tokio::task::spawn_blocking(move || tools.check_all()).await {
        Ok(infos) => infos,
        Err(e) => {
            tracing::warn!("Tool check failed: {e}");
            return;
        }
    };

    for info in infos {
        if info.available {
            tracing::info!(
                "Tool found: {} at {} ({})",
                info.name,
                info.path.display(),
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!(
                "Tool not found: {} (expected at {})",
                info.name,
                info.path.display()
            );
        }
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[tokio::test(flavor = "current_thread")]
    async fn tool_check_does_not_block_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let slow = dir.path().join("ffmpeg");
        std::fs::write(&slow, "#!/bin/sh\nsleep 1\necho 'ffmpeg version 7.1'\n").unwrap();
        std::fs::set_permissions(&slow, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = Config::default();
        config.storage.upload_dir = dir.path().join("uploads");
        config.storage.output_dir = dir.path().join("outputs");
        let tools = Arc::new(sc_av::ToolRegistry::with_paths(
            slow,
            PathBuf::from("/nonexistent/encoder"),
            None,
        ));
        let ctx = AppContext::with_tools(config, tools).unwrap();

        let started = Instant::now();
        let ticker = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            started.elapsed()
        };
        let ((), ticked_after) = tokio::join!(log_tools(&ctx), ticker);

        assert!(ticked_after < Duration::from_millis(500), "{ticked_after:?}");
        assert!(started.elapsed() >= Duration::from_millis(900));
    }
}
