use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::{http::Method, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod config;
mod database;
mod dtos;
mod errors;
mod handlers;
mod middleware;
mod models;
mod repository;
mod routes;
mod services;
mod state;

use config::AppConfig;
use database::connection::get_db_client;
use repository::{MongoCredentialStore, MongoOtpStore};
use services::auth_service::AuthService;
use services::email_service::EmailService;
use services::otp_service::ScanVerifier;
use services::password_service::PasswordHasher;
use services::token_service::TokenService;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env()?;
    let db = get_db_client(&config.database_url, &config.database_name).await?;

    let app_state = initialize_app_state(db, &config);
    let app = build_router(app_state);

    start_server(app, &config).await
}

fn initialize_app_state(db: mongodb::Database, config: &AppConfig) -> AppState {
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

    tracing::info!("Auth services initialized");
    AppState::new(db, auth, config)
}

fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/api/health", get(api_health_check))
        .nest("/api/v1/auth", routes::auth::routes(app_state.clone()))
        .nest("/api/v1/admin", routes::admin::routes(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn start_server(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn root_handler() -> &'static str {
    "Account & Auth API"
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn api_health_check(State(state): State<AppState>) -> Json<Value> {
    use mongodb::bson::doc;

    let db_status = match state.db.run_command(doc! {"ping": 1}).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    Json(json!({
        "status": "healthy",
        "database": db_status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
