use super::state::AppState;
use crate::podcast::{PlaybackStatus, PodcastController, PodcastError};
use crate::report::{ReportContext, ReportError, ReportKind};
use crate::settings::Availability;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionRequest {
    /// Target report date (YYYY-MM-DD); latest report when absent
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    pub position: f64,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    pub volume: f32,
}

#[derive(Debug, Default, Deserialize)]
pub struct MuteRequest {
    /// Explicit mute state; toggles when absent
    pub muted: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PodcastStatusResponse {
    pub kind: ReportKind,
    pub title: &'static str,
    pub target_date: Option<String>,
    pub status: PlaybackStatus,
    pub availability: Availability,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub position_label: String,
    pub duration_label: String,
    pub progress: f64,
    pub volume: f32,
    pub muted: bool,
    pub last_error: Option<String>,
    pub resource_uri: Option<String>,
    pub download_name: Option<String>,
}

impl PodcastStatusResponse {
    fn from_controller(controller: &PodcastController) -> Self {
        let snapshot = controller.snapshot();

        Self {
            kind: snapshot.report.kind,
            title: snapshot.report.kind.title(),
            target_date: snapshot.report.date_param(),
            status: snapshot.status,
            availability: controller.availability(),
            position_secs: snapshot.position_secs,
            duration_secs: snapshot.duration_secs,
            position_label: snapshot.position_label(),
            duration_label: snapshot.duration_label(),
            progress: snapshot.progress_ratio(),
            volume: snapshot.volume,
            muted: snapshot.muted,
            last_error: snapshot.last_error.clone(),
            resource_uri: snapshot.resource.as_ref().map(|r| r.uri().to_string()),
            download_name: controller.download_name(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn status_response(controller: &PodcastController) -> Response {
    (
        StatusCode::OK,
        Json(PodcastStatusResponse::from_controller(controller)),
    )
        .into_response()
}

fn podcast_error_response(e: PodcastError) -> Response {
    match e {
        PodcastError::Unavailable { reason } => {
            error_response(StatusCode::PRECONDITION_FAILED, reason)
        }
        PodcastError::NoAudio => error_response(StatusCode::NOT_FOUND, e.to_string()),
        PodcastError::Generation(_) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
        PodcastError::Io(_) => {
            error!("{}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn find_session(state: &AppState, kind: &str) -> Result<Arc<PodcastController>, Response> {
    let kind: ReportKind = kind
        .parse()
        .map_err(|e: ReportError| error_response(StatusCode::NOT_FOUND, e.to_string()))?;

    state.session(kind).await.ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            format!("No podcast session for {}", kind),
        )
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /podcast/:kind
/// Current session state
pub async fn get_podcast(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    match find_session(&state, &kind).await {
        Ok(controller) => status_response(&controller),
        Err(response) => response,
    }
}

/// POST /podcast/:kind/session
/// Start a fresh session for a (possibly dated) report, tearing down the old one
pub async fn open_session(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    body: Option<Json<OpenSessionRequest>>,
) -> Response {
    let kind: ReportKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return error_response(StatusCode::NOT_FOUND, e.to_string()),
    };

    let request = body.map(|Json(req)| req).unwrap_or_default();
    let target_date = match request.date.as_deref().map(ReportContext::parse_date) {
        None => None,
        Some(Ok(date)) => Some(date),
        Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let report = ReportContext::new(kind, target_date);
    info!("Opening podcast session for {}", report);

    let controller = state.open_session(report).await;
    status_response(&controller)
}

/// POST /podcast/:kind/play
pub async fn play(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    let controller = match find_session(&state, &kind).await {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    match controller.play() {
        Ok(_) => status_response(&controller),
        Err(e) => podcast_error_response(e),
    }
}

/// POST /podcast/:kind/pause
pub async fn pause(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    let controller = match find_session(&state, &kind).await {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    controller.pause();
    status_response(&controller)
}

/// POST /podcast/:kind/toggle
pub async fn toggle(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    let controller = match find_session(&state, &kind).await {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    match controller.toggle() {
        Ok(_) => status_response(&controller),
        Err(e) => podcast_error_response(e),
    }
}

/// POST /podcast/:kind/regenerate
pub async fn regenerate(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    let controller = match find_session(&state, &kind).await {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    match controller.regenerate() {
        Ok(_) => status_response(&controller),
        Err(e) => podcast_error_response(e),
    }
}

/// POST /podcast/:kind/seek
pub async fn seek(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<SeekRequest>,
) -> Response {
    let controller = match find_session(&state, &kind).await {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    match controller.seek(req.position) {
        Some(_) => status_response(&controller),
        None => podcast_error_response(PodcastError::NoAudio),
    }
}

/// POST /podcast/:kind/volume
/// The slider's range limit is enforced here, not by the controller
pub async fn volume(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<VolumeRequest>,
) -> Response {
    let controller = match find_session(&state, &kind).await {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    if !(0.0..=1.0).contains(&req.volume) {
        warn!("Rejecting out-of-range volume {}", req.volume);
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Volume must be between 0 and 1, got {}", req.volume),
        );
    }

    controller.set_volume(req.volume);
    status_response(&controller)
}

/// POST /podcast/:kind/mute
pub async fn mute(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    body: Option<Json<MuteRequest>>,
) -> Response {
    let controller = match find_session(&state, &kind).await {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    match body.and_then(|Json(req)| req.muted) {
        Some(muted) => controller.set_muted(muted),
        None => {
            controller.toggle_mute();
        }
    }

    status_response(&controller)
}

/// GET /podcast/:kind/download
/// The generated audio as an attachment named `<kind>_podcast.<ext>`
pub async fn download(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    let controller = match find_session(&state, &kind).await {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    let (name, payload) = match controller.download_payload() {
        Ok(download) => download,
        Err(e) => return podcast_error_response(e),
    };

    let content_type = controller
        .snapshot()
        .content_type
        .unwrap_or_else(|| "audio/mpeg".to_string());

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        payload,
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
