use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::admin;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    // Only an existing super admin can mint new admin accounts.
    let super_admin_only = Router::new()
        .route("/create-admin", post(admin::create_admin))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::super_admin_middleware,
        ));

    let guarded = Router::new()
        .route("/me", get(admin::me))
        .layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/admin-login", post(admin::admin_login))
        .merge(super_admin_only)
        .merge(guarded)
}
