use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    dto::results_dto::ExportQuery,
    error::Result,
    identity::Identity,
    models::test_result::{ResultListing, TestResult},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/results",
    responses(
        (status = 200, description = "Results visible to the caller", body = Json<Vec<ResultListing>>),
        (status = 403, description = "Caller may not review results")
    )
)]
#[axum::debug_handler]
pub async fn list_results(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse> {
    let results = state.result_service.list_results(&identity).await?;
    Ok(Json(results))
}

/// Download all visible results as results.xlsx or results.csv.
#[axum::debug_handler]
pub async fn export_results(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse> {
    let buffer = state
        .result_service
        .export_results(&identity, query.format)
        .await?;
    let disposition = format!("attachment; filename=\"{}\"", query.format.filename());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, query.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}

#[axum::debug_handler]
pub async fn delete_result(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.result_service.delete_result(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/results/{id}/retake",
    params(
        ("id" = Uuid, Path, description = "Result the retake is based on")
    ),
    responses(
        (status = 201, description = "Pending result open for the student", body = Json<TestResult>),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Result not found")
    )
)]
#[axum::debug_handler]
pub async fn initiate_retake(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let pending = state.result_service.initiate_retake(&identity, id).await?;
    Ok((StatusCode::CREATED, Json(pending)))
}
