use axum::{
    extract::State,
    response::{IntoResponse, Json},
};

use crate::{error::Result, identity::Identity, AppState};

#[axum::debug_handler]
pub async fn dashboard(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse> {
    let dashboard = state.dashboard_service.for_identity(&identity).await?;
    Ok(Json(dashboard))
}

#[axum::debug_handler]
pub async fn admin_dashboard(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse> {
    let stats = state.dashboard_service.admin(&identity).await?;
    Ok(Json(stats))
}

#[axum::debug_handler]
pub async fn teacher_dashboard(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse> {
    let overview = state.dashboard_service.teacher(&identity).await?;
    Ok(Json(overview))
}

#[axum::debug_handler]
pub async fn student_dashboard(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse> {
    let overview = state.dashboard_service.student(&identity).await?;
    Ok(Json(overview))
}
