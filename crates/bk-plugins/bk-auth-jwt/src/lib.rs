//! # bk-auth-jwt
//!
//! Argon2-based credential checks plus JWT session tokens: the concrete
//! Auth Gate. Engines only ever see the `AuthGate` and `CredentialHasher`
//! ports; registration and login live here because they belong to the gate,
//! not to the consistency core.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bk_core::error::{AppError, Result};
use bk_core::models::{Actor, Identity, Role};
use bk_core::traits::{AuthGate, CredentialHasher};
use bk_core::StoreHandle;

/// Argon2id implementation of the `CredentialHasher` port.
pub struct Argon2CredentialHasher;

impl CredentialHasher for Argon2CredentialHasher {
    fn hash_password(&self, raw: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(raw.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AppError::Internal(format!("password hashing failed: {err}")))
    }

    /// Verifies a candidate against a stored Argon2 hash.
    fn verify_password(&self, raw: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Identity id
    sub: String,
    role: Role,
    exp: usize,
}

/// An issued session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub identity_id: Uuid,
    pub role: Role,
}

/// JWT-issuing Auth Gate over the identity collection.
pub struct JwtAuthService {
    db: Arc<StoreHandle>,
    hasher: Argon2CredentialHasher,
    secret: String,
    ttl: chrono::Duration,
}

impl JwtAuthService {
    pub fn new(db: Arc<StoreHandle>, secret: impl Into<String>) -> Self {
        Self {
            db,
            hasher: Argon2CredentialHasher,
            secret: secret.into(),
            // Matches the platform's session length.
            ttl: chrono::Duration::hours(4),
        }
    }

    /// Creates a new identity. The handle is unique; the store reports a
    /// duplicate as `Conflict`.
    pub async fn register(&self, handle: &str, password: &str, role: Role) -> Result<Identity> {
        if handle.trim().is_empty() || password.is_empty() {
            return Err(AppError::ValidationError(
                "handle and password are required".to_string(),
            ));
        }
        let repos = self.db.repos().await?;
        let identity = Identity {
            id: Uuid::now_v7(),
            handle: handle.trim().to_string(),
            password_hash: self.hasher.hash_password(password)?,
            role,
            enabled: true,
        };
        let identity = repos.identities.insert(identity).await?;
        tracing::info!(identity_id = %identity.id, "identity registered");
        Ok(identity)
    }

    /// Validates credentials and issues a session token.
    /// Failures are deliberately indistinct: no handle/password oracle.
    pub async fn login(&self, handle: &str, password: &str) -> Result<Session> {
        let repos = self.db.repos().await?;
        let identity = repos
            .identities
            .find_by_handle(handle)
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_string()))?;
        if !self.hasher.verify_password(password, &identity.password_hash) {
            return Err(AppError::Unauthorized("invalid credentials".to_string()));
        }
        if !identity.enabled {
            return Err(AppError::Unauthorized("account disabled".to_string()));
        }

        let claims = Claims {
            sub: identity.id.to_string(),
            role: identity.role,
            exp: (Utc::now() + self.ttl).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|err| AppError::Internal(format!("token signing failed: {err}")))?;

        Ok(Session {
            token,
            identity_id: identity.id,
            role: identity.role,
        })
    }
}

#[async_trait]
impl AuthGate for JwtAuthService {
    /// Validates the token and re-checks the identity is still enabled; the
    /// role comes from the current identity row, not the (possibly stale)
    /// claim.
    async fn verify_actor(&self, token: &str) -> Result<Actor> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized("invalid or expired token".to_string()))?;

        let identity_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Unauthorized("invalid or expired token".to_string()))?;

        let repos = self.db.repos().await?;
        let identity = repos
            .identities
            .find_one(identity_id)
            .await?
            .filter(|i| i.enabled)
            .ok_or_else(|| AppError::Unauthorized("account unknown or disabled".to_string()))?;

        Ok(Actor {
            identity_id: identity.id,
            role: identity.role,
        })
    }
}
