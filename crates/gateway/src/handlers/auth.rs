//! Email OTP authentication handlers

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use linkstash_common::{
    auth::owner_id_for_email,
    errors::{AppError, Result},
    models::Owner,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request a one-time code for an email address
#[derive(Debug, Deserialize, Validate)]
pub struct OtpRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OtpVerifyRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(equal = 6))]
    pub code: String,
}

#[derive(Serialize)]
pub struct OtpVerifyResponse {
    pub token: String,
    pub owner_id: String,
}

/// Issue a one-time code and hand it to the mailer.
///
/// Always responds 204 for a valid email, whether or not a code was already
/// pending, so the endpoint leaks nothing about prior requests.
pub async fn request_otp(
    State(state): State<AppState>,
    Json(request): Json<OtpRequest>,
) -> Result<StatusCode> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("email".to_string()),
    })?;

    let code = state.otp.issue(&request.email).await;
    state.mailer.send_otp(&request.email, &code).await?;

    tracing::info!(email = %request.email, "OTP requested");
    Ok(StatusCode::NO_CONTENT)
}

/// Verify a one-time code and mint a JWT for the owner
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<OtpVerifyRequest>,
) -> Result<Json<OtpVerifyResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    state.otp.verify(&request.email, &request.code).await?;

    let email = request.email.trim().to_lowercase();
    let owner = Owner {
        id: owner_id_for_email(&email),
        email,
    };
    let token = state.jwt.generate_token(&owner)?;

    tracing::info!(owner = %owner.id, "OTP verified, token issued");
    Ok(Json(OtpVerifyResponse {
        token,
        owner_id: owner.id,
    }))
}
