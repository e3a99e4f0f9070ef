//! Axum router construction.
//!
//! Builds the application router with the conversion endpoints, file
//! listing, the OpenAPI document, middleware layers and static file serving.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::middleware::request_id;
use crate::routes;

/// Headroom on top of the upload limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::convert::upload,
        routes::convert::from_url,
        routes::convert::convert,
        routes::download::download,
        routes::files::list_files,
        routes::tools::list_tools,
        routes::tts::tts,
        routes::health::health_check,
    ),
    components(schemas(
        routes::convert::UrlRequest,
        routes::convert::ConvertResponse,
        routes::files::FileEntry,
        routes::files::FileListResponse,
        sc_av::ToolInfo,
        sc_av::ToolSource,
    ))
)]
pub struct ApiDoc;

/// Route table printed at startup in debug mode.
pub const ROUTES: &[(&str, &str)] = &[
    ("POST", "/upload"),
    ("POST", "/url"),
    ("POST", "/convert"),
    ("POST", "/tts"),
    ("GET", "/download/{filename}"),
    ("GET", "/api/files"),
    ("GET", "/api/tools"),
    ("GET", "/api-docs/openapi.json"),
    ("GET", "/health"),
];

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = ctx
        .config
        .conversion
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    let api = Router::new()
        .route("/files", get(routes::files::list_files))
        .route("/tools", get(routes::tools::list_tools));

    let mut app = Router::new()
        .route("/upload", post(routes::convert::upload))
        .route("/url", post(routes::convert::from_url))
        .route("/convert", post(routes::convert::convert))
        .route("/tts", post(routes::tts::tts))
        // Catch-all so names with raw path separators reach validation.
        .route("/download/{*filename}", get(routes::download::download))
        .route("/health", get(routes::health::health_check))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api", api);

    // Static front page and assets.
    if let Some(dir) = static_dir {
        if dir.is_dir() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app
                .route_service("/", ServeFile::new(index_path))
                .nest_service("/static", ServeDir::new(&dir));
        } else {
            tracing::debug!("Static directory {:?} not found, skipping", dir);
        }
    }

    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http().make_span_with(request_id::make_span))
        .layer(cors)
        .layer(request_id::propagate_layer())
        .layer(request_id::set_layer())
        .with_state(ctx)
}
