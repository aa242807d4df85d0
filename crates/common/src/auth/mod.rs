//! Authentication utilities
//!
//! Provides:
//! - Email OTP issuance and verification
//! - JWT token generation and validation
//! - Owner context extraction for handlers
//!
//! A request without an Authorization header is not rejected: it runs in
//! legacy unscoped mode (`owner = None`), which the document store treats as
//! a deliberately permissive fallback rather than a security boundary.

use crate::errors::{AppError, Result};
use crate::models::Owner;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Derive a stable owner id from a verified email address
pub fn owner_id_for_email(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (owner id)
    pub sub: String,

    /// Verified email address
    pub email: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a token for a verified owner
    pub fn generate_token(&self, owner: &Owner) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: owner.id.clone(),
            email: owner.email.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::Unauthorized {
                    message: "Invalid token".to_string(),
                },
            })
    }
}

/// Extract a bearer token from an Authorization header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// One pending one-time code
struct PendingCode {
    code_hash: String,
    expires_at: DateTime<Utc>,
    attempts: u32,
}

/// In-memory store of pending one-time codes, keyed by email.
///
/// Codes are stored hashed and consumed on successful verification. State
/// does not survive a restart; the user simply requests a new code.
pub struct OtpStore {
    codes: RwLock<HashMap<String, PendingCode>>,
    ttl_secs: i64,
    max_attempts: u32,
}

impl OtpStore {
    pub fn new(ttl_secs: u64, max_attempts: u32) -> Self {
        Self {
            codes: RwLock::new(HashMap::new()),
            ttl_secs: ttl_secs as i64,
            max_attempts,
        }
    }

    fn hash_code(email: &str, code: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(email.trim().to_lowercase().as_bytes());
        hasher.update(b"\x00");
        hasher.update(code.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Issue a fresh 6-digit code for an email, replacing any pending one.
    /// Returns the code so the caller can hand it to the mailer.
    pub async fn issue(&self, email: &str) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        let pending = PendingCode {
            code_hash: Self::hash_code(email, &code),
            expires_at: Utc::now() + Duration::seconds(self.ttl_secs),
            attempts: 0,
        };

        let key = email.trim().to_lowercase();
        self.codes.write().await.insert(key, pending);
        code
    }

    /// Verify a code, consuming it on success.
    ///
    /// Expired codes, unknown emails, and exhausted attempts all surface as
    /// the same `InvalidOtp` error so callers cannot probe which emails have
    /// pending codes.
    pub async fn verify(&self, email: &str, code: &str) -> Result<()> {
        let key = email.trim().to_lowercase();
        let mut codes = self.codes.write().await;

        let pending = codes.get_mut(&key).ok_or(AppError::InvalidOtp)?;

        if pending.expires_at < Utc::now() {
            codes.remove(&key);
            return Err(AppError::InvalidOtp);
        }

        pending.attempts += 1;
        if pending.attempts > self.max_attempts {
            codes.remove(&key);
            return Err(AppError::InvalidOtp);
        }

        if pending.code_hash != Self::hash_code(email, code) {
            return Err(AppError::InvalidOtp);
        }

        codes.remove(&key);
        Ok(())
    }
}

/// Delivery channel for one-time codes
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, email: &str, code: &str) -> Result<()>;
}

/// Mailer that logs codes instead of sending email. Used in development and
/// tests; real deployments plug in an SMTP-backed implementation.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(&self, email: &str, code: &str) -> Result<()> {
        tracing::info!(email = %email, code = %code, "OTP issued (log mailer)");
        Ok(())
    }
}

/// Extracted owner context available to handlers.
///
/// `owner` is `None` when no Authorization header was sent (legacy mode).
/// A present but invalid token is rejected with 401.
#[derive(Debug, Clone, Default)]
pub struct OwnerContext {
    pub owner: Option<Owner>,
}

impl OwnerContext {
    /// Owner id, if authenticated
    pub fn owner_id(&self) -> Option<&str> {
        self.owner.as_ref().map(|o| o.id.as_str())
    }

    /// Require an authenticated owner, for operations that must be
    /// attributable (deletion)
    pub fn require_owner(&self) -> Result<&Owner> {
        self.owner.as_ref().ok_or_else(|| AppError::AuthRequired {
            message: "this operation requires an authenticated owner".to_string(),
        })
    }
}

impl<S> FromRequestParts<S> for OwnerContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let Some(auth_header) = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(OwnerContext::default());
        };

        let token = extract_bearer(auth_header).ok_or_else(|| AppError::Unauthorized {
            message: "Authorization header must use the Bearer scheme".to_string(),
        })?;

        let jwt = parts
            .extensions
            .get::<Arc<JwtManager>>()
            .ok_or_else(|| AppError::Internal {
                message: "JwtManager extension not installed".to_string(),
            })?;

        let claims = jwt.validate_token(token)?;
        Ok(OwnerContext {
            owner: Some(Owner {
                id: claims.sub,
                email: claims.email,
            }),
        })
    }
}
