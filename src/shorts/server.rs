//! HTTP job submission.
//!
//! `POST /api/create` takes a multipart form and answers with the rendered
//! video, or with a JSON envelope when `response=json` is set.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::Serialize;
use serde_json::json;

use super::config::ServerConfig;
use super::error::{ShortsError, ShortsResult};
use super::pipeline::{JobOutput, JobRequest, JobSource, Pipeline};
use crate::ui::prelude::{Level, emit};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<EnvelopeData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeData {
    pub script: String,
    pub captions: String,
    pub video_base64: String,
    pub title: String,
}

impl Envelope {
    pub fn success(output: &JobOutput) -> Self {
        Self {
            success: true,
            data: Some(EnvelopeData {
                script: output.script.clone(),
                captions: output.captions.clone(),
                video_base64: STANDARD.encode(&output.video),
                title: output.title.clone(),
            }),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseMode {
    Video,
    Json,
}

pub fn router(pipeline: Arc<Pipeline>, body_limit: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/create",
            post(create).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(AppState { pipeline })
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, pipeline: Arc<Pipeline>) -> Result<()> {
    let addr: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    emit(
        Level::Success,
        "shorts.server.listening",
        &format!("Listening on http://{addr}"),
        Some(json!({ "bind": addr.to_string() })),
    );

    axum::serve(listener, router(pipeline, config.body_limit_bytes))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            emit(Level::Info, "shorts.server.shutdown", "Shutting down", None);
        })
        .await
        .context("Server error")
}

async fn healthz() -> &'static str {
    "ok"
}

async fn create(State(state): State<AppState>, multipart: Multipart) -> Response {
    let (request, mode) = match read_request(multipart).await {
        Ok(parsed) => parsed,
        Err(error) => {
            emit(
                Level::Warn,
                "shorts.server.bad_request",
                &error.to_string(),
                None,
            );
            return failure_response(&error.user_message());
        }
    };

    match state.pipeline.run(request).await {
        Ok(output) => match mode {
            ResponseMode::Json => (StatusCode::OK, Json(Envelope::success(&output))).into_response(),
            ResponseMode::Video => video_response(output),
        },
        Err(failure) => failure_response(&failure.user_message()),
    }
}

async fn read_request(mut multipart: Multipart) -> ShortsResult<(JobRequest, ResponseMode)> {
    let mut url = None;
    let mut script = None;
    let mut title = None;
    let mut mode = ResponseMode::Video;
    let mut images: Vec<Bytes> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" => {
                let data = field.bytes().await.map_err(invalid_form)?;
                if !data.is_empty() {
                    images.push(data);
                }
            }
            "url" => url = Some(field.text().await.map_err(invalid_form)?),
            "script" => script = Some(field.text().await.map_err(invalid_form)?),
            "title" => title = Some(field.text().await.map_err(invalid_form)?),
            "response" => {
                if field.text().await.map_err(invalid_form)?.trim() == "json" {
                    mode = ResponseMode::Json;
                }
            }
            _ => {}
        }
    }

    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let source = match (non_empty(script), non_empty(url)) {
        (Some(script), _) => JobSource::Script(script),
        (None, Some(url)) => JobSource::Url(url.trim().to_string()),
        (None, None) => {
            return Err(ShortsError::InvalidRequest(
                "An article URL or a script is required.".to_string(),
            ));
        }
    };

    let request = JobRequest {
        source,
        title: title.unwrap_or_default(),
        images,
    };
    request.validate()?;
    Ok((request, mode))
}

fn invalid_form(err: axum::extract::multipart::MultipartError) -> ShortsError {
    ShortsError::InvalidRequest(format!("Malformed form data: {}", err.body_text()))
}

fn video_response(output: JobOutput) -> Response {
    let mut response = Response::new(Body::from(output.video));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
    if let Ok(value) = HeaderValue::from_bytes(content_disposition(&output.title).as_bytes()) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

fn failure_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(Envelope::failure(message)),
    )
        .into_response()
}

/// `attachment; filename="<title>.mp4"` with characters that would break
/// the quoted string removed.
fn content_disposition(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '"' | '\\' | '/'))
        .collect();
    let stem = match cleaned.trim() {
        "" => "shorts",
        stem => stem,
    };
    format!("attachment; filename=\"{stem}.mp4\"")
}
