//! Application state shared by all handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::db::DbPool;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared database (users, sessions, histories, analyses)
    pub db: DbPool,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Session idle timeout as configured
    pub fn session_idle(&self) -> chrono::Duration {
        self.config.session_idle_timeout()
    }
}
