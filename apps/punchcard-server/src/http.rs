//! HTTP surface: thin handlers over the camera and store operations.

use std::{convert::Infallible, path::PathBuf, sync::Arc};

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::StreamExt;
use punchcard_camera::{mjpeg_content_type, open_mjpeg_stream, CameraArbiter, CaptureService, StreamSettings};
use punchcard_store::AttendanceStore;
use punchcard_types::{record::NewAttendance, PunchcardError};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

const DEFAULT_WINDOW_DAYS: i64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub arbiter: CameraArbiter,
    pub capture: Arc<CaptureService>,
    pub store: Arc<AttendanceStore>,
    pub stream_settings: StreamSettings,
    pub captures_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/video_feed", get(video_feed))
        .route("/capture", get(capture))
        .route("/captured/:filename", get(captured_file))
        .route("/api/attendance/save", post(save_attendance))
        .route("/api/attendance/:user_id", get(list_attendance))
        .route("/api/attendance/:user_id/stats", get(attendance_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Caller-visible failure envelope. Validation maps to 400, everything else
/// to 500; the body always carries a stable status plus a readable message.
struct ApiError(PunchcardError);

impl From<PunchcardError> for ApiError {
    fn from(err: PunchcardError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PunchcardError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "status": "error",
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

async fn video_feed(State(state): State<AppState>) -> impl IntoResponse {
    let stream = open_mjpeg_stream(state.arbiter.clone(), state.stream_settings.clone());
    let body = Body::from_stream(stream.map(Ok::<Bytes, Infallible>));
    ([(header::CONTENT_TYPE, mjpeg_content_type())], body)
}

async fn capture(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let captured = state.capture.capture_once().await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Image captured successfully",
        "image_url": captured.url,
        "filename": captured.filename,
    })))
}

async fn captured_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    if !is_safe_filename(&filename) {
        return StatusCode::NOT_FOUND.into_response();
    }
    match tokio::fs::read(state.captures_dir.join(&filename)).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn save_attendance(
    State(state): State<AppState>,
    Json(new): Json<NewAttendance>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = state.store.save(new)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "record_id": saved.record_id,
            "image_filename": saved.image_filename,
        })),
    ))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

async fn list_attendance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state.store.list_by_user(&user_id, query.limit)?;
    Ok(Json(json!({
        "status": "success",
        "user_id": user_id,
        "total_records": records.len(),
        "records": records,
    })))
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    days: Option<i64>,
}

async fn attendance_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let days = query.days.unwrap_or(DEFAULT_WINDOW_DAYS);
    let stats = state.store.stats_by_user(&user_id, days)?;
    Ok(Json(json!({
        "status": "success",
        "user_id": user_id,
        "period_days": days,
        "total_days_marked": stats.total_days_marked,
        "attendance_percentage": stats.attendance_percentage,
        "last_record": stats.last_record,
    })))
}

/// Only bare filenames may reach the captures directory.
fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains("..")
}
