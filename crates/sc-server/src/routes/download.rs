//! Download of finished SILK files.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;

use crate::context::AppContext;
use crate::error::AppError;

/// Reject names that could escape the output directory.
pub fn validate_filename(filename: &str) -> sc_core::Result<()> {
    if filename.is_empty() {
        return Err(sc_core::Error::Input("no file name given".into()));
    }
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(sc_core::Error::Input(format!("invalid file name: {filename}")));
    }
    Ok(())
}

/// GET /download/{filename}
#[utoipa::path(
    get,
    path = "/download/{filename}",
    params(("filename" = String, Path, description = "Name returned by a conversion")),
    responses(
        (status = 200, description = "SILK file", content_type = "application/octet-stream"),
        (status = 400, description = "File name contains a path component"),
        (status = 404, description = "No such file")
    )
)]
pub async fn download(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    validate_filename(&filename)?;

    let path = ctx.output_dir().join(&filename);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(sc_core::Error::not_found("file", &filename).into());
        }
        Err(e) => return Err(sc_core::Error::from(e).into()),
    };
    let meta = file.metadata().await.map_err(sc_core::Error::from)?;
    if !meta.is_file() {
        return Err(sc_core::Error::not_found("file", &filename).into());
    }

    tracing::info!(file = %filename, size = meta.len(), "Serving download");

    let disposition = HeaderValue::from_str(&format!("attachment; filename={filename}"))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(meta.len())),
        ],
        body,
    )
        .into_response())
}
