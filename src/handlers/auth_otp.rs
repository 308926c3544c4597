use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use validator::Validate;

use crate::dtos::auth_dtos::{
    ForgotPasswordRequest, MessageResponse, ResetPasswordRequest, VerifyOtpRequest,
    VerifyOtpResponse,
};
use crate::errors::{AppError, Result};
use crate::state::AppState;

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    state.auth.forgot_password(&payload.email).await?;

    Ok(Json(MessageResponse::new("OTP sent to email")))
}

pub async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    state.auth.resend_otp(&payload.email).await?;

    Ok(Json(MessageResponse::new("OTP resent successfully")))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>> {
    let reset_token = state.auth.verify_otp(&payload.otp).await?;

    Ok(Json(VerifyOtpResponse {
        success: true,
        message: "OTP verified".to_string(),
        reset_token,
    }))
}

/// The reset token travels as a Bearer header, not in the body: it was
/// handed out by verify-otp and is the sole authorization for this write.
pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse> {
    let reset_token = headers
        .get("authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::authentication("Reset token required"))?;

    state
        .auth
        .reset_password(reset_token, &payload.new_password, &payload.confirm_password)
        .await?;

    Ok(Json(MessageResponse::new(
        "Password reset successful. Please login with your new password.",
    )))
}
