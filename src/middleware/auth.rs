use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::utils::token::decode_token;

fn unauthorized(code: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": code, "message": "Authentication required"})),
    )
        .into_response()
}

/// Decodes the bearer token and stores the caller's `Identity` in the request
/// extensions. Role checks happen inside the services.
pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return unauthorized("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("unsupported_scheme");
    };

    let config = crate::config::get_config();
    match decode_token(token.trim(), &config.jwt_secret) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("Rejected bearer token: {}", e);
            unauthorized("invalid_token")
        }
    }
}
