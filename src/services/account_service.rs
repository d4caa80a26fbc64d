use crate::dto::account_dto::CreateAccountPayload;
use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::models::account::{Account, Role};
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::token::issue_token;
use sqlx::PgPool;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, username, password_hash, role, external_id, full_name, \
     student_group, course, direction, is_active, created_at";

#[derive(Clone)]
pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Unknown usernames and wrong passwords get the same answer.
    pub async fn login(
        &self,
        request: &LoginRequest,
        secret: &str,
        ttl_hours: i64,
    ) -> Result<LoginResponse> {
        let sql = format!("SELECT {} FROM accounts WHERE username = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(request.username.trim())
            .fetch_optional(&self.pool)
            .await?;

        let account = match account {
            Some(a) if a.is_active && verify_password(&request.password, &a.password_hash) => a,
            _ => {
                tracing::warn!(username = %request.username, "Rejected login attempt");
                return Err(Error::Unauthorized("invalid_credentials".into()));
            }
        };

        let identity = Identity::new(account.id, account.role()?);
        let (token, expires_at) = issue_token(&identity, secret, ttl_hours)?;
        tracing::info!(account_id = %account.id, role = %identity.role, "Login succeeded");
        Ok(LoginResponse {
            token,
            expires_at,
            account,
        })
    }

    pub async fn me(&self, identity: &Identity) -> Result<Account> {
        self.get_account(identity.account_id).await
    }

    pub async fn create_account(
        &self,
        identity: &Identity,
        payload: CreateAccountPayload,
    ) -> Result<Account> {
        identity.require(&[Role::Admin])?;

        let password_hash = hash_password(&payload.password)?;
        let sql = format!(
            r#"
            INSERT INTO accounts
                (username, password_hash, role, external_id, full_name, student_group, course, direction)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(payload.username.trim())
            .bind(password_hash)
            .bind(payload.role.as_str())
            .bind(trimmed(&payload.external_id))
            .bind(trimmed(&payload.full_name))
            .bind(trimmed(&payload.student_group))
            .bind(trimmed(&payload.course))
            .bind(trimmed(&payload.direction))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                Error::BadRequest("An account with this username or student id already exists".into())
            })?;

        tracing::info!(account_id = %account.id, role = %payload.role, "Account created");
        Ok(account)
    }

    pub async fn list_accounts(&self, identity: &Identity) -> Result<Vec<Account>> {
        identity.require(&[Role::Admin])?;
        let sql = format!(
            "SELECT {} FROM accounts ORDER BY role, username",
            ACCOUNT_COLUMNS
        );
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(accounts)
    }

    pub async fn delete_account(&self, identity: &Identity, account_id: Uuid) -> Result<()> {
        identity.require(&[Role::Admin])?;
        if account_id == identity.account_id {
            return Err(Error::BadRequest("You cannot delete your own account".into()));
        }
        let deleted = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(Error::NotFound("Account not found".into()));
        }
        tracing::info!(account_id = %account_id, by = %identity.account_id, "Account deleted");
        Ok(())
    }

    /// Creates the configured administrator when no account has that username.
    pub async fn ensure_bootstrap_admin(&self, username: &str, password: &str) -> Result<()> {
        let password_hash = hash_password(password)?;
        let created = sqlx::query(
            r#"
            INSERT INTO accounts (username, password_hash, role, full_name)
            VALUES ($1, $2, $3, $1)
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(Role::Admin.as_str())
        .execute(&self.pool)
        .await?;

        if created.rows_affected() > 0 {
            tracing::info!(username, "Bootstrap administrator created");
        }
        Ok(())
    }

    async fn get_account(&self, account_id: Uuid) -> Result<Account> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        sqlx::query_as::<_, Account>(&sql)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Account not found".into()))
    }
}

/// Optional profile text as stored: surrounding whitespace removed, blank as NULL.
fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_text_is_trimmed_and_blank_is_dropped() {
        assert_eq!(trimmed(&Some("  Ann Lee ".into())), Some("Ann Lee"));
        assert_eq!(trimmed(&Some("   ".into())), None);
        assert_eq!(trimmed(&None), None);
    }
}
