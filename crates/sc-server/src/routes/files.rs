//! Listing of staged and converted files.

use std::path::Path;
use std::time::UNIX_EPOCH;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::context::AppContext;
use crate::error::AppError;

/// A file in one of the storage directories.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct FileEntry {
    pub name: String,
    /// Last modification, milliseconds since the Unix epoch.
    pub time: i64,
}

/// Response of `GET /api/files`.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FileListResponse {
    pub success: bool,
    pub uploads: Vec<FileEntry>,
    pub silk_files: Vec<FileEntry>,
}

/// GET /api/files
#[utoipa::path(
    get,
    path = "/api/files",
    responses((status = 200, description = "Files in the upload and output directories", body = FileListResponse))
)]
pub async fn list_files(State(ctx): State<AppContext>) -> Result<Json<FileListResponse>, AppError> {
    let uploads = list_dir(ctx.upload_dir()).await.map_err(|e| {
        tracing::error!("Failed to list upload directory: {e}");
        e
    })?;
    let silk_files = list_dir(ctx.output_dir()).await.map_err(|e| {
        tracing::error!("Failed to list output directory: {e}");
        e
    })?;

    Ok(Json(FileListResponse {
        success: true,
        uploads,
        silk_files,
    }))
}

/// Regular files directly inside `dir`, sorted by name.
pub async fn list_dir(dir: &Path) -> sc_core::Result<Vec<FileEntry>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let time = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        files.push(FileEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            time,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}
