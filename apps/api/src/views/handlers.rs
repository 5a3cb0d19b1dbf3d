use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::ResumeSummary;
use crate::state::AppState;
use crate::stores::DisplayHandle;
use crate::views::detail::DetailState;
use crate::views::home::HomeView;

#[derive(Debug, Serialize)]
pub struct ResumeListResponse {
    pub resumes: Vec<ResumeSummary>,
}

#[derive(Debug, Serialize)]
pub struct OpenViewResponse {
    pub view_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    pub resume_id: String,
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<ResumeListResponse>, AppError> {
    let resumes = HomeView::new(state.kv.clone())
        .list()
        .await
        .map_err(AppError::from_store)?;
    Ok(Json(ResumeListResponse { resumes }))
}

/// POST /api/v1/views
pub async fn handle_open_view(
    State(state): State<AppState>,
) -> (StatusCode, Json<OpenViewResponse>) {
    let view_id = state.sessions.open();
    (StatusCode::CREATED, Json(OpenViewResponse { view_id }))
}

/// GET /api/v1/views/:view_id
pub async fn handle_view_state(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Result<Json<DetailState>, AppError> {
    let view = state
        .sessions
        .get(&view_id)
        .ok_or_else(|| AppError::NotFound(format!("View {view_id} not found")))?;
    Ok(Json(view.state()))
}

/// POST /api/v1/views/:view_id/load
///
/// Load failures are part of the returned view state, not HTTP errors.
pub async fn handle_load(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
    Json(req): Json<LoadRequest>,
) -> Result<Json<DetailState>, AppError> {
    let resume_id = req.resume_id.trim();
    if resume_id.is_empty() {
        return Err(AppError::Validation("resume_id cannot be empty".to_string()));
    }
    let view = state
        .sessions
        .get(&view_id)
        .ok_or_else(|| AppError::NotFound(format!("View {view_id} not found")))?;
    Ok(Json(view.load(resume_id).await))
}

/// DELETE /api/v1/views/:view_id
pub async fn handle_close_view(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.close(&view_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("View {view_id} not found")))
    }
}

/// GET /api/v1/blobs/:handle
pub async fn handle_get_blob(
    State(state): State<AppState>,
    Path(handle): Path<Uuid>,
) -> Result<Response, AppError> {
    let handle = DisplayHandle::from_uuid(handle);
    let binary = state
        .registry
        .resolve(&handle)
        .ok_or_else(|| AppError::NotFound(format!("{handle} is not registered")))?;
    Ok((
        [
            (header::CONTENT_TYPE, binary.media_type),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        binary.data,
    )
        .into_response())
}
