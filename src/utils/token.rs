use crate::error::{Error, Result};
use crate::identity::Identity;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: String,
}

pub fn issue_token(identity: &Identity, secret: &str, ttl_hours: i64) -> Result<(String, chrono::DateTime<Utc>)> {
    let expires_at = Utc::now() + Duration::hours(ttl_hours);
    let claims = Claims {
        sub: identity.account_id.to_string(),
        exp: expires_at.timestamp() as usize,
        role: identity.role.to_string(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, expires_at))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Identity> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    let account_id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| Error::Unauthorized("invalid_token".into()))?;
    let role = data
        .claims
        .role
        .parse()
        .map_err(|_| Error::Unauthorized("invalid_token".into()))?;
    Ok(Identity::new(account_id, role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::Role;

    #[test]
    fn issued_token_decodes_to_same_identity() {
        let identity = Identity::new(Uuid::new_v4(), Role::Teacher);
        let (token, _) = issue_token(&identity, "secret", 1).unwrap();
        assert_eq!(decode_token(&token, "secret").unwrap(), identity);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let identity = Identity::new(Uuid::new_v4(), Role::Student);
        let (token, _) = issue_token(&identity, "secret", 1).unwrap();
        assert!(decode_token(&token, "other").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let identity = Identity::new(Uuid::new_v4(), Role::Admin);
        let (token, _) = issue_token(&identity, "secret", -2).unwrap();
        assert!(decode_token(&token, "secret").is_err());
    }
}
