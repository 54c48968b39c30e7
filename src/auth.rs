//! Authentication for the admin tool.
//!
//! Credentials are argon2 hashes; sessions are short-lived JWTs; password
//! resets use single-use random tokens stored as sha256 digests. Accounts
//! are provisioned without a password and must set one on first login.

use std::sync::Arc;
use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::user,
    errors::ServiceError,
};

const RESET_TOKEN_LENGTH: usize = 48;
const TOKEN_ISSUER: &str = "stocktrack-api";
const TOKEN_AUDIENCE: &str = "stocktrack-clients";

/// Claim structure for session tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the business user id (`U###`)
    pub sub: String,
    pub email: String,
    pub role: String,
    /// JWT ID, unique per issued token
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated caller extracted from the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("Admin")
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub reset_token_ttl_minutes: i64,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, token_ttl: Duration, reset_token_ttl_minutes: i64) -> Self {
        Self {
            jwt_secret,
            token_ttl,
            reset_token_ttl_minutes,
        }
    }
}

/// Successful login payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginSession {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub expires_at: i64,
}

pub struct AuthService {
    config: AuthConfig,
    db: Arc<DbPool>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DbPool>) -> Self {
        Self { config, db }
    }

    /// Verifies the email/password pair and issues a session token.
    ///
    /// An account without a stored password is refused with a distinct
    /// message directing the caller to the first-login password flow.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, ServiceError> {
        let account = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::AuthError("Invalid Email or Password.".to_string()))?;

        let Some(stored_hash) = account.password_hash.as_deref() else {
            return Err(ServiceError::AuthError(
                "Password not set. Set your password before logging in.".to_string(),
            ));
        };

        if !verify_password(password, stored_hash)? {
            return Err(ServiceError::AuthError(
                "Invalid Email or Password.".to_string(),
            ));
        }

        self.issue_session(&account)
    }

    /// First-login flow: sets the password for an account provisioned
    /// without one. Refused once a password exists.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn set_initial_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginSession, ServiceError> {
        validate_password(password)?;

        let account = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound("No account for that email".to_string()))?;

        if account.password_hash.is_some() {
            return Err(ServiceError::Conflict(
                "A password is already set for this account.".to_string(),
            ));
        }

        let hash = hash_password(password)?;
        let mut active: user::ActiveModel = account.clone().into();
        active.password_hash = Set(Some(hash));
        let updated = active.update(self.db.as_ref()).await?;

        self.issue_session(&updated)
    }

    /// Starts a password reset: stores a sha256 digest of a fresh random
    /// token with an expiry and returns the plain token for delivery.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn request_password_reset(&self, email: &str) -> Result<String, ServiceError> {
        let account = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound("No account for that email".to_string()))?;

        let token: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RESET_TOKEN_LENGTH)
            .map(char::from)
            .collect();

        let expires = Utc::now() + ChronoDuration::minutes(self.config.reset_token_ttl_minutes);

        let mut active: user::ActiveModel = account.into();
        active.reset_token_hash = Set(Some(digest_token(&token)));
        active.reset_token_expires_at = Set(Some(expires));
        active.update(self.db.as_ref()).await?;

        Ok(token)
    }

    /// Completes a password reset with a previously issued token.
    #[instrument(skip(self, token, new_password))]
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        validate_password(new_password)?;

        let digest = digest_token(token);
        let account = user::Entity::find()
            .filter(user::Column::ResetTokenHash.eq(digest))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::AuthError("Invalid or expired reset token".to_string()))?;

        let still_valid = account
            .reset_token_expires_at
            .map(|at| at > Utc::now())
            .unwrap_or(false);
        if !still_valid {
            return Err(ServiceError::AuthError(
                "Invalid or expired reset token".to_string(),
            ));
        }

        let hash = hash_password(new_password)?;
        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(Some(hash));
        active.reset_token_hash = Set(None);
        active.reset_token_expires_at = Set(None);
        active.update(self.db.as_ref()).await?;

        Ok(())
    }

    /// Decodes and validates a bearer token.
    pub fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            debug!("token rejected: {}", e);
            ServiceError::Unauthorized("Invalid or expired token".to_string())
        })?;

        Ok(AuthenticatedUser {
            user_id: data.claims.sub,
            email: data.claims.email,
            role: data.claims.role,
        })
    }

    fn issue_session(&self, account: &user::Model) -> Result<LoginSession, ServiceError> {
        let now = Utc::now().timestamp();
        let exp = now + self.config.token_ttl.as_secs() as i64;

        let claims = Claims {
            sub: account.user_id.clone(),
            email: account.email.clone(),
            role: account.role.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp,
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {}", e)))?;

        Ok(LoginSession {
            token,
            user_id: account.user_id.clone(),
            email: account.email.clone(),
            role: account.role.clone(),
            expires_at: exp,
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        let normalized = email.trim().to_lowercase();
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(normalized))
            .one(self.db.as_ref())
            .await?;
        Ok(found)
    }
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::InternalError(format!("failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ServiceError::InternalError(format!("corrupt password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.len() < 8 {
        return Err(ServiceError::ValidationError(
            "Password must be at least 8 characters.".to_string(),
        ));
    }
    Ok(())
}

fn digest_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl FromRequestParts<crate::AppState> for AuthenticatedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &crate::AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized("Missing Authorization header".to_string())
            })?;

        let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
            ServiceError::Unauthorized("Authorization header must use the Bearer scheme".to_string())
        })?;

        state.auth.verify_token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip_verifies() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn token_digest_is_stable_and_hex() {
        let digest = digest_token("some-token");
        assert_eq!(digest, digest_token("some-token"));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
