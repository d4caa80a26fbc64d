use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::attempt_dto::{AttemptSheet, SubmitAttemptRequest, SubmitAttemptResponse},
    error::Result,
    identity::Identity,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/student/tests/{id}/start",
    params(
        ("id" = Uuid, Path, description = "Test ID")
    ),
    responses(
        (status = 200, description = "Questions to answer, correctness withheld", body = Json<AttemptSheet>),
        (status = 404, description = "Test does not exist or is not published"),
        (status = 409, description = "Already completed; a retake is required")
    )
)]
#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let sheet = state.attempt_service.start_attempt(&identity, id).await?;
    Ok(Json(sheet))
}

#[utoipa::path(
    post,
    path = "/api/student/tests/{id}/submit",
    params(
        ("id" = Uuid, Path, description = "Test ID")
    ),
    request_body = SubmitAttemptRequest,
    responses(
        (status = 200, description = "Submission scored", body = Json<SubmitAttemptResponse>),
        (status = 404, description = "Test does not exist or is not published"),
        (status = 409, description = "Already completed; a retake is required")
    )
)]
#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let response = state
        .attempt_service
        .submit_attempt(&identity, id, &payload.answers, payload.time_taken)
        .await?;
    Ok(Json(response))
}
