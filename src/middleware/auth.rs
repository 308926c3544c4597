use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Collection;

use crate::models::admin::{Admin, AdminRole};
use crate::state::AppState;

/// Requires a valid Bearer access token and exposes its claims to the
/// handler through request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = headers
        .get("authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = state
        .auth
        .tokens()
        .verify_access(token)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Guards admin creation: only a logged-in super admin may pass. The access
/// token travels in the `token` cookie (set by admin login) or as a Bearer
/// header. Every denial is a 403, matching the admin surface's behavior for
/// missing, invalid and under-privileged tokens alike.
pub async fn super_admin_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let bearer = headers
        .get("authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::to_string);
    let token = jar
        .get("token")
        .map(|c| c.value().to_string())
        .or(bearer)
        .ok_or(StatusCode::FORBIDDEN)?;

    let claims = state
        .auth
        .tokens()
        .verify_access(&token)
        .map_err(|_| StatusCode::FORBIDDEN)?;

    if claims.role != "superAdmin" {
        return Err(StatusCode::FORBIDDEN);
    }

    // The role claim alone could be stale; confirm against the store.
    let id = ObjectId::parse_str(&claims.sub).map_err(|_| StatusCode::FORBIDDEN)?;
    let admins: Collection<Admin> = state.db.collection("admins");
    let admin = admins
        .find_one(doc! { "_id": id })
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::FORBIDDEN)?;

    if admin.role != AdminRole::SuperAdmin {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::{middleware, routing::post, Router};
    use tower::ServiceExt;

    use super::super_admin_middleware;
    use crate::config::AppConfig;
    use crate::repository::{MongoCredentialStore, MongoOtpStore};
    use crate::services::auth_service::AuthService;
    use crate::services::email_service::EmailService;
    use crate::services::otp_service::ScanVerifier;
    use crate::services::password_service::PasswordHasher;
    use crate::services::token_service::TokenService;
    use crate::state::AppState;

    fn test_config() -> AppConfig {
        AppConfig {
            database_url: "mongodb://localhost:27017".to_string(),
            database_name: "guard_test".to_string(),
            access_token_secret: "access-secret".to_string(),
            refresh_token_secret: "refresh-secret".to_string(),
            reset_token_secret: "reset-secret".to_string(),
            access_token_ttl_min: 15,
            refresh_token_ttl_min: 7 * 24 * 60,
            reset_token_ttl_min: 10,
            mail_api_url: "http://localhost".to_string(),
            mail_api_key: "key".to_string(),
            mail_from: "no-reply@test".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            environment: "development".to_string(),
        }
    }

    // The Mongo client connects lazily, so denial paths (which never reach
    // the store) are testable without a running server.
    async fn test_state(config: &AppConfig) -> AppState {
        let client = mongodb::Client::with_uri_str(&config.database_url)
            .await
            .unwrap();
        let db = client.database(&config.database_name);

        let users = Arc::new(MongoCredentialStore::new(&db));
        let resets = Arc::new(MongoOtpStore::new(&db));
        let mailer = Arc::new(EmailService::new(config));
        let hasher = PasswordHasher;
        let verifier = Arc::new(ScanVerifier::new(resets.clone(), hasher));
        let auth = Arc::new(AuthService::new(
            users,
            resets,
            mailer,
            verifier,
            TokenService::new(config),
            hasher,
        ));
        AppState::new(db, auth, config)
    }

    async fn guarded_app(state: AppState) -> Router {
        Router::new()
            .route("/guarded", post(|| async { StatusCode::OK }))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                super_admin_middleware,
            ))
            .with_state(state)
    }

    fn request(authorization: Option<String>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().method("POST").uri("/guarded");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn guard_rejects_missing_token() {
        let state = test_state(&test_config()).await;
        let app = guarded_app(state).await;

        let response = app.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn guard_rejects_garbage_token() {
        let state = test_state(&test_config()).await;
        let app = guarded_app(state).await;

        let response = app
            .oneshot(request(Some("Bearer not-a-jwt".to_string())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn guard_rejects_plain_admin_role() {
        let config = test_config();
        let state = test_state(&config).await;
        let tokens = TokenService::new(&config);
        let token = tokens
            .issue_access_token_for("656e6f7567682d696421", "admin@x.com", "admin")
            .unwrap();

        let app = guarded_app(state).await;
        let response = app
            .oneshot(request(Some(format!("Bearer {}", token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
