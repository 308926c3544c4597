use axum::{middleware, routing::post, Router};

use crate::handlers::{auth, auth_otp};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let guarded = Router::new()
        .route("/change-password", post(auth::change_password))
        .route("/current-user-login", post(auth::current_user_login))
        .layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/create-user", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/refresh-token", post(auth::refresh_access_token))
        .route("/forgot-password", post(auth_otp::forgot_password))
        .route("/resend-otp", post(auth_otp::resend_otp))
        .route("/verify-reset-otp", post(auth_otp::verify_otp))
        .route("/reset-password", post(auth_otp::reset_password))
        .merge(guarded)
}
