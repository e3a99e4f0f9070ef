//! Conversion endpoints: multipart upload, remote URL, and the combined
//! content-type dispatching `/convert`.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use sc_av::{ConversionInput, ConversionOutput};
use sc_core::Error;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// Multipart field carrying the audio file.
const FILE_FIELD: &str = "file";

/// Request body for converting a remote file.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UrlRequest {
    /// `http` or `https` URL of the source audio.
    pub url: String,
}

/// Successful conversion response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ConvertResponse {
    pub success: bool,
    /// Absolute download link for the SILK file.
    pub url: String,
    pub filename: String,
    /// Processing time, e.g. `"1.27s"`.
    pub duration: String,
}

/// POST /upload
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content_type = "multipart/form-data", description = "Audio file in the `file` field"),
    responses(
        (status = 200, description = "Converted", body = ConvertResponse),
        (status = 400, description = "Missing or oversized file"),
        (status = 500, description = "Conversion failed")
    )
)]
pub async fn upload(
    State(ctx): State<AppContext>,
    request_id: RequestId,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConvertResponse>, AppError> {
    let parsed = match multipart {
        Ok(multipart) => read_upload(multipart, ctx.config.conversion.max_upload_bytes).await,
        Err(e) => Err(Error::Input(format!("expected a multipart upload: {e}"))),
    };
    let input = parsed.map_err(|e| AppError::new(e).with_request_id(request_id.0.clone()))?;

    convert_and_respond(&ctx, &headers, input, request_id).await
}

/// POST /url
#[utoipa::path(
    post,
    path = "/url",
    request_body = UrlRequest,
    responses(
        (status = 200, description = "Converted", body = ConvertResponse),
        (status = 400, description = "Missing or unsupported URL"),
        (status = 500, description = "Download or conversion failed")
    )
)]
pub async fn from_url(
    State(ctx): State<AppContext>,
    request_id: RequestId,
    headers: HeaderMap,
    payload: Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, AppError> {
    let input =
        url_input(payload).map_err(|e| AppError::new(e).with_request_id(request_id.0.clone()))?;
    convert_and_respond(&ctx, &headers, input, request_id).await
}

/// POST /convert
///
/// Accepts either a multipart upload (`file`) or a JSON body (`url`),
/// chosen by the request's Content-Type.
#[utoipa::path(
    post,
    path = "/convert",
    request_body(content = UrlRequest, description = "JSON `{url}` or multipart `file`"),
    responses(
        (status = 200, description = "Converted", body = ConvertResponse),
        (status = 400, description = "Bad or unsupported request"),
        (status = 500, description = "Conversion failed")
    )
)]
pub async fn convert(
    State(ctx): State<AppContext>,
    request_id: RequestId,
    request: Request,
) -> Result<Json<ConvertResponse>, AppError> {
    let headers = request.headers().clone();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let parsed = if content_type.starts_with("multipart/form-data") {
        match Multipart::from_request(request, &ctx).await {
            Ok(multipart) => read_upload(multipart, ctx.config.conversion.max_upload_bytes).await,
            Err(e) => Err(Error::Input(format!("invalid multipart body: {e}"))),
        }
    } else if content_type.starts_with("application/json") {
        url_input(Json::<UrlRequest>::from_request(request, &ctx).await)
    } else {
        Err(Error::UnsupportedInput(format!(
            "unsupported Content-Type '{content_type}'; use multipart/form-data or application/json"
        )))
    };
    let input = parsed.map_err(|e| AppError::new(e).with_request_id(request_id.0.clone()))?;

    convert_and_respond(&ctx, &headers, input, request_id).await
}

fn url_input(payload: Result<Json<UrlRequest>, JsonRejection>) -> sc_core::Result<ConversionInput> {
    let Json(req) = payload.map_err(|e| Error::Input(format!("invalid request body: {e}")))?;
    let url = req.url.trim();
    if url.is_empty() {
        return Err(Error::Input("url is required".into()));
    }
    Ok(ConversionInput::RemoteUrl(url.to_string()))
}

/// Pull the `file` field out of a multipart body, enforcing `max_bytes`.
async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> sc_core::Result<ConversionInput> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Input(format!("failed to read multipart field: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let mut data = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| Error::Input(format!("failed to read upload: {e}")))?
        {
            if data.len() + chunk.len() > max_bytes {
                return Err(Error::Input(format!(
                    "upload exceeds the {max_bytes} byte limit"
                )));
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Err(Error::Input("uploaded file is empty".into()));
        }

        tracing::info!(
            file_name = file_name.as_deref().unwrap_or("<unnamed>"),
            size_bytes = data.len(),
            "Received upload"
        );
        return Ok(ConversionInput::bytes(Bytes::from(data), file_name));
    }

    Err(Error::Input(format!("missing multipart field '{FILE_FIELD}'")))
}

/// Run the conversion on its own task and build the response.
///
/// The task is detached from the request future, so a client that hangs up
/// does not interrupt the external tools or the cleanup that follows them.
async fn convert_and_respond(
    ctx: &AppContext,
    headers: &HeaderMap,
    input: ConversionInput,
    request_id: RequestId,
) -> Result<Json<ConvertResponse>, AppError> {
    let kind = input.kind();
    tracing::info!(input = kind, "Starting conversion");

    let converter = Arc::clone(&ctx.converter);
    let output: ConversionOutput = tokio::spawn(async move { converter.convert(input).await })
        .await
        .map_err(|e| Error::Internal(format!("conversion task failed: {e}")))
        .and_then(|result| result)
        .map_err(|e| AppError::new(e).with_request_id(request_id.0.clone()))?;

    let url = format!(
        "{}/download/{}",
        base_url(ctx, headers).trim_end_matches('/'),
        output.filename
    );
    let duration = format!("{:.2}s", output.elapsed.as_secs_f64());
    tracing::info!(input = kind, filename = %output.filename, %duration, "Conversion succeeded");

    Ok(Json(ConvertResponse {
        success: true,
        url,
        filename: output.filename,
        duration,
    }))
}

/// Base for download links: the configured public URL, else scheme and host
/// from the request.
fn base_url(ctx: &AppContext, headers: &HeaderMap) -> String {
    if let Some(base) = &ctx.config.server.public_base_url {
        return base.clone();
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|p| *p == "https" || *p == "http")
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{}", ctx.config.server.port));

    format!("{scheme}://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use sc_core::config::Config;
    use std::path::PathBuf;

    fn ctx(config: Config) -> AppContext {
        let tools = Arc::new(sc_av::ToolRegistry::with_paths(
            PathBuf::from("ffmpeg"),
            PathBuf::from("encoder"),
            None,
        ));
        AppContext::with_tools(config, tools).unwrap()
    }

    #[test]
    fn base_url_from_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("audio.local:8080"));
        assert_eq!(base_url(&ctx(Config::default()), &headers), "http://audio.local:8080");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(base_url(&ctx(Config::default()), &headers), "https://audio.local:8080");
    }

    #[test]
    fn base_url_prefers_public_base() {
        let mut config = Config::default();
        config.server.public_base_url = Some("https://cdn.example.com/".into());
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8080"));
        assert_eq!(base_url(&ctx(config), &headers), "https://cdn.example.com/");
    }

    #[test]
    fn base_url_without_host_uses_port() {
        let headers = HeaderMap::new();
        assert_eq!(base_url(&ctx(Config::default()), &headers), "http://localhost:8080");
    }

    #[test]
    fn blank_url_is_rejected() {
        let err = url_input(Ok(Json(UrlRequest { url: "  ".into() }))).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn url_is_trimmed() {
        let input = url_input(Ok(Json(UrlRequest {
            url: " https://x.test/a.mp3 ".into(),
        })))
        .unwrap();
        assert!(matches!(input, ConversionInput::RemoteUrl(ref u) if u == "https://x.test/a.mp3"));
    }
}
