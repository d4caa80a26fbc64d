use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{dto::authoring_dto::CreateSubjectPayload, error::Result, identity::Identity, AppState};

#[axum::debug_handler]
pub async fn list_subjects(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse> {
    let subjects = state.subject_service.list_subjects(&identity).await?;
    Ok(Json(subjects))
}

#[axum::debug_handler]
pub async fn create_subject(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateSubjectPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let subject = state
        .subject_service
        .create_subject(&identity, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

#[utoipa::path(
    delete,
    path = "/api/subjects/{id}",
    params(
        ("id" = Uuid, Path, description = "Subject ID")
    ),
    responses(
        (status = 204, description = "Subject and its tests deleted"),
        (status = 404, description = "Subject not found or not owned by caller")
    )
)]
#[axum::debug_handler]
pub async fn delete_subject(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.subject_service.delete_subject(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
