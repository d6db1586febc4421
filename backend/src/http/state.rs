//! Application state for the HTTP server.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::repository::FullRepository;
use crate::notify::Mailer;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn FullRepository>,
    /// Outgoing email transport
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        mailer: Arc<dyn Mailer>,
        config: AppConfig,
    ) -> Self {
        Self {
            repository,
            mailer,
            config: Arc::new(config),
        }
    }

    pub fn repo(&self) -> &dyn FullRepository {
        self.repository.as_ref()
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }
}
