//! External tool status.

use axum::extract::State;
use axum::Json;

use crate::context::AppContext;
use crate::error::AppError;

/// GET /api/tools
#[utoipa::path(
    get,
    path = "/api/tools",
    responses(
        (status = 200, description = "Resolved tools and their availability", body = Vec<sc_av::ToolInfo>)
    )
)]
pub async fn list_tools(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<sc_av::ToolInfo>>, AppError> {
    // Version detection runs the transcoder synchronously.
    let tools = ctx.tools.clone();
    let infos = tokio::task::spawn_blocking(move || tools.check_all())
        .await
        .map_err(|e| sc_core::Error::Internal(format!("tool check failed: {e}")))?;
    Ok(Json(infos))
}
