use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::account_dto::CreateAccountPayload, error::Result, identity::Identity,
    models::account::Account, AppState,
};

#[utoipa::path(
    get,
    path = "/api/admin/accounts",
    responses(
        (status = 200, description = "All accounts", body = Json<Vec<Account>>),
        (status = 403, description = "Caller is not an administrator")
    )
)]
#[axum::debug_handler]
pub async fn list_accounts(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse> {
    let accounts = state.account_service.list_accounts(&identity).await?;
    Ok(Json(accounts))
}

#[utoipa::path(
    post,
    path = "/api/admin/accounts",
    request_body = CreateAccountPayload,
    responses(
        (status = 201, description = "Account created", body = Json<Account>),
        (status = 400, description = "Invalid payload or duplicate username"),
        (status = 403, description = "Caller is not an administrator")
    )
)]
#[axum::debug_handler]
pub async fn create_account(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateAccountPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let account = state
        .account_service
        .create_account(&identity, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[axum::debug_handler]
pub async fn delete_account(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.account_service.delete_account(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
