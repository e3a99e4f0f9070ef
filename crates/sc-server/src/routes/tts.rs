//! Text-to-speech placeholder.

use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// POST /tts
///
/// Always answers 501 whatever the body; no synthesis backend exists.
#[utoipa::path(
    post,
    path = "/tts",
    responses((status = 501, description = "Text-to-speech is not implemented"))
)]
pub async fn tts(request_id: RequestId) -> AppError {
    tracing::warn!("Text-to-speech requested but not implemented");
    AppError::new(sc_core::Error::NotImplemented(
        "text-to-speech is not implemented".into(),
    ))
    .with_request_id(request_id.0)
}
