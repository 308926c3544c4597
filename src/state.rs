use std::sync::Arc;

use mongodb::Database;

use crate::config::AppConfig;
use crate::services::auth_service::AuthService;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: Arc<AuthService>,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(db: Database, auth: Arc<AuthService>, config: &AppConfig) -> Self {
        AppState {
            db,
            auth,
            secure_cookies: config.is_production(),
        }
    }
}
