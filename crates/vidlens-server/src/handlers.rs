use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vidlens_common::{ImageAnalysis, ScoredResult, SearchWarning, VidlensError, Video};
use vidlens_core::{attach_thumbnails, QueryInput};

use crate::AppState;

/// A file part pulled out of a multipart form, plus the optional `name` field.
#[derive(Debug)]
pub(crate) struct Upload {
    pub(crate) file_name: String,
    pub(crate) data: Bytes,
    pub(crate) name: Option<String>,
}

/// Reads the `file` part and the optional `name` part.
///
/// `Ok(None)` means the form carried no file, or an empty one.
pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<Option<Upload>, MultipartError> {
    let mut file = None;
    let mut name = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await?;
                if !data.is_empty() {
                    file = Some((file_name, data));
                }
            }
            Some("name") => {
                let text = field.text().await?;
                let text = text.trim();
                if !text.is_empty() {
                    name = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(file.map(|(file_name, data)| Upload { file_name, data, name }))
}

fn client_error(status: StatusCode, message: &str) -> axum::response::Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn no_file() -> axum::response::Response {
    client_error(StatusCode::BAD_REQUEST, "No file uploaded")
}

fn error_response(context: &str, e: &VidlensError) -> axum::response::Response {
    if e.is_input() {
        tracing::warn!("{}: {}", context, e);
        return client_error(StatusCode::BAD_REQUEST, "Malformed upload");
    }
    match e.body() {
        Some(body) if !body.is_empty() => tracing::error!("{}: {} (body: {})", context, e, body),
        _ => tracing::error!("{}: {}", context, e),
    }
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Internal server error" })),
    )
        .into_response()
}

/// Shared front half of the upload endpoints. A request that is not
/// multipart, or carries no file, gets "No file uploaded"; a body over
/// `server.max_upload_bytes` gets 413.
async fn require_upload(
    context: &str,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Upload, axum::response::Response> {
    let multipart = multipart.map_err(|e| {
        tracing::warn!("{}: not a multipart request: {}", context, e);
        no_file()
    })?;
    match read_upload(multipart).await {
        Ok(Some(upload)) => Ok(upload),
        Ok(None) => Err(no_file()),
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::warn!("{}: upload rejected: {}", context, e);
            Err(client_error(StatusCode::PAYLOAD_TOO_LARGE, "File too large"))
        }
        Err(e) => Err(error_response(
            context,
            &VidlensError::Input(format!("Multipart field error: {}", e)),
        )),
    }
}

pub async fn root() -> &'static str {
    "vidlens video search is running"
}

pub async fn analyze_image(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> axum::response::Response {
    let context = "Error in analyze-image";
    let upload = match require_upload(context, multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    match state.vision.analyze(upload.data).await {
        Ok(analysis) => Json(analysis).into_response(),
        Err(e) => error_response(context, &e),
    }
}

#[derive(Serialize)]
pub(crate) struct ImageSearchResponse {
    analysis: ImageAnalysis,
    results: Vec<ScoredResult>,
    warnings: Vec<SearchWarning>,
}

pub async fn search_by_image(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> axum::response::Response {
    let context = "Error in search-by-image";
    let upload = match require_upload(context, multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    let analysis = match state.vision.analyze(upload.data).await {
        Ok(analysis) => analysis,
        Err(e) => return error_response(context, &e),
    };

    match state.orchestrator.search(&QueryInput::Image(analysis.clone())).await {
        Ok(outcome) => {
            let outcome = outcome.without_zero_scores();
            Json(ImageSearchResponse {
                analysis,
                results: outcome.results,
                warnings: outcome.warnings,
            })
            .into_response()
        }
        Err(e) => error_response(context, &e),
    }
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> axum::response::Response {
    match state.orchestrator.search(&QueryInput::Text(params.q)).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response("Error searching videos", &e),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoSummary {
    #[serde(flatten)]
    video: Video,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail_url: Option<String>,
}

pub async fn list_videos(State(state): State<Arc<AppState>>) -> axum::response::Response {
    let videos = match state.catalog.list_videos().await {
        Ok(videos) => videos,
        Err(e) => return error_response("Error fetching videos", &e),
    };

    let attached = attach_thumbnails(state.media.clone(), videos, state.config.search.max_in_flight).await;
    let summaries: Vec<VideoSummary> = attached
        .into_iter()
        .map(|(video, thumb)| VideoSummary {
            video,
            thumbnail_url: thumb.map(|t| t.to_data_url()),
        })
        .collect();
    Json(summaries).into_response()
}

pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> axum::response::Response {
    let context = "Error uploading video";
    let upload = match require_upload(context, multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    let name = upload.name.clone().unwrap_or_else(|| upload.file_name.clone());
    tracing::info!("Uploading video {} ({} bytes)", name, upload.data.len());
    match state.media.upload_video(&name, &upload.file_name, upload.data).await {
        Ok(id) => Json(serde_json::json!({ "id": id })).into_response(),
        Err(e) => error_response(context, &e),
    }
}

pub async fn video_insights(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match state.insights.video_insights(&id).await {
        Ok(insights) => Json(insights).into_response(),
        Err(e) => error_response("Error fetching video insights", &e),
    }
}

pub async fn keyframes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match state.media.keyframes(&id).await {
        Ok(keyframes) => Json(keyframes).into_response(),
        Err(e) => error_response("Error fetching keyframes", &e),
    }
}

pub async fn download_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match state.media.download_url(&id).await {
        Ok(url) => Json(serde_json::json!({ "url": url })).into_response(),
        Err(e) => error_response("Error fetching download URL", &e),
    }
}

pub async fn streaming_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match state.media.streaming_url(&id).await {
        Ok(url) => Json(serde_json::json!({ "url": url })).into_response(),
        Err(e) => error_response("Error fetching streaming URL", &e),
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod handlers_tests;
