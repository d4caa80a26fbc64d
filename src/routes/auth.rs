use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    config::get_config,
    dto::auth_dto::{LoginRequest, LoginResponse},
    error::Result,
    identity::Identity,
    models::account::Account,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = Json<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let config = get_config();
    let response = state
        .account_service
        .login(&payload, &config.jwt_secret, config.jwt_ttl_hours)
        .await?;
    Ok(Json(response))
}

/// Tokens are stateless; the client discards its copy.
#[axum::debug_handler]
pub async fn logout(identity: Identity) -> impl IntoResponse {
    tracing::info!(account_id = %identity.account_id, "Logout");
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current account", body = Json<Account>),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler]
pub async fn me(State(state): State<AppState>, identity: Identity) -> Result<impl IntoResponse> {
    let account = state.account_service.me(&identity).await?;
    Ok(Json(account))
}
