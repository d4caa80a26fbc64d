use crate::error::{Error, Result};
use crate::models::account::Role;
use serde::Serialize;
use uuid::Uuid;

/// The authenticated caller, passed explicitly into every service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub account_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(account_id: Uuid, role: Role) -> Self {
        Self { account_id, role }
    }

    /// Capability check run at the start of every protected operation.
    pub fn require(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "role {} may not perform this operation",
                self.role
            )))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .ok_or_else(|| Error::Unauthorized("missing_authorization".into()))
    }
}
