use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::authoring_dto::{ConfirmQuery, CreateTestPayload, EditTestPayload},
    error::Result,
    identity::Identity,
    models::test::{Test, TestDetail},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/tests",
    responses(
        (status = 200, description = "Tests visible to the caller", body = Json<Vec<Test>>),
        (status = 403, description = "Caller may not author tests")
    )
)]
#[axum::debug_handler]
pub async fn list_tests(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse> {
    let tests = state.test_service.list_tests(&identity).await?;
    Ok(Json(tests))
}

#[utoipa::path(
    post,
    path = "/api/tests",
    request_body = CreateTestPayload,
    responses(
        (status = 201, description = "Test created", body = Json<TestDetail>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Subject not found")
    )
)]
#[axum::debug_handler]
pub async fn create_test(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateTestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let test = state.test_service.create_test(&identity, payload).await?;
    Ok((StatusCode::CREATED, Json(test)))
}

#[utoipa::path(
    get,
    path = "/api/tests/{id}",
    params(
        ("id" = Uuid, Path, description = "Test ID")
    ),
    responses(
        (status = 200, description = "Test with questions and answers", body = Json<TestDetail>),
        (status = 404, description = "Test not found")
    )
)]
#[axum::debug_handler]
pub async fn get_test(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let test = state.test_service.get_test(&identity, id).await?;
    Ok(Json(test))
}

#[utoipa::path(
    put,
    path = "/api/tests/{id}",
    params(
        ("id" = Uuid, Path, description = "Test ID")
    ),
    request_body = EditTestPayload,
    responses(
        (status = 200, description = "Test updated", body = Json<TestDetail>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Test not found")
    )
)]
#[axum::debug_handler]
pub async fn update_test(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditTestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let test = state.test_service.edit_test(&identity, id, payload).await?;
    Ok(Json(test))
}

#[utoipa::path(
    delete,
    path = "/api/tests/{id}",
    params(
        ("id" = Uuid, Path, description = "Test ID"),
        ("confirm" = bool, Query, description = "Must be true to delete")
    ),
    responses(
        (status = 204, description = "Test deleted"),
        (status = 400, description = "Deletion not confirmed"),
        (status = 404, description = "Test not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_test(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Query(query): Query<ConfirmQuery>,
) -> Result<impl IntoResponse> {
    state
        .test_service
        .delete_test(&identity, id, query.confirm)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
