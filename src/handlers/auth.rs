use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use validator::Validate;

use crate::dtos::auth_dtos::{
    AuthResponse, ChangePasswordRequest, CreateUserRequest, LoginRequest, LogoutRequest,
    MessageResponse, RefreshTokenRequest, UserResponse,
};
use crate::errors::{AppError, Result};
use crate::models::user::{AccessClaims, Role};
use crate::services::auth_service::RegisterInput;
use crate::state::AppState;

pub(crate) fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let user = state
        .auth
        .register(RegisterInput {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            confirm_password: payload.confirm_password,
            user_name: payload.user_name,
            role: payload.role,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User Created Successfully",
            "data": UserResponse::from(&user),
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let (user, pair) = state
        .auth
        .login(
            payload.email.as_deref(),
            payload.user_name.as_deref(),
            &payload.password,
        )
        .await?;

    let jar = jar
        .add(session_cookie(
            "accessToken",
            pair.access_token.clone(),
            state.secure_cookies,
        ))
        .add(session_cookie(
            "refreshToken",
            pair.refresh_token.clone(),
            state.secure_cookies,
        ));

    let message = match user.role {
        Role::Host => "Host login successfully",
        Role::Influencer => "Influencer login successfully",
    };

    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            message: message.to_string(),
            data: UserResponse::from(&user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

/// Always succeeds: the cookies are cleared no matter what, and clearing
/// the stored refresh token is best-effort.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Option<Json<LogoutRequest>>,
) -> impl IntoResponse {
    let from_body = payload.and_then(|Json(p)| p.refresh_token);
    let token = jar
        .get("refreshToken")
        .map(|c| c.value().to_string())
        .or(from_body);

    state.auth.logout(token.as_deref()).await;

    let jar = jar
        .remove(expired_cookie("token"))
        .remove(expired_cookie("accessToken"))
        .remove(expired_cookie("refreshToken"));

    (jar, Json(MessageResponse::new("Logged out successfully")))
}

pub async fn refresh_access_token(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Option<Json<RefreshTokenRequest>>,
) -> Result<impl IntoResponse> {
    let from_body = payload.and_then(|Json(p)| p.refresh_token);
    let presented = jar
        .get("refreshToken")
        .map(|c| c.value().to_string())
        .or(from_body)
        .ok_or_else(|| AppError::authentication("Unauthorized request"))?;

    let (_, pair) = state.auth.refresh_access_token(&presented).await?;

    let jar = jar
        .add(session_cookie(
            "accessToken",
            pair.access_token.clone(),
            state.secure_cookies,
        ))
        .add(session_cookie(
            "refreshToken",
            pair.refresh_token.clone(),
            state.secure_cookies,
        ));

    Ok((
        jar,
        Json(json!({
            "success": true,
            "message": "Access token refreshed",
            "data": {
                "accessToken": pair.access_token,
                "refreshToken": pair.refresh_token,
            },
        })),
    ))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .auth
        .change_password(
            &claims,
            &payload.current_password,
            &payload.new_password,
            &payload.confirm_password,
        )
        .await?;

    Ok(Json(MessageResponse::new("Password changed successfully")))
}

pub async fn current_user_login(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<impl IntoResponse> {
    let user = state.auth.current_user(&claims).await?;

    Ok(Json(json!({
        "success": true,
        "data": UserResponse::from(&user),
    })))
}
