//! Application state
//!
//! Shared state for the HTTP surface: configuration, the relay gateway, the
//! upload store and, when a database is configured, the user store.

use std::sync::Arc;

use relay_common::{AppConfig, AppError, PasswordService};
use relay_db::UserRepository;
use relay_gateway::{Gateway, GatewayState};

use crate::upload::UploadStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    gateway: Arc<Gateway>,
    uploads: Arc<UploadStore>,
    /// `None` when no database is configured
    users: Option<Arc<dyn UserRepository>>,
    passwords: PasswordService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        gateway: Arc<Gateway>,
        uploads: UploadStore,
        users: Option<Arc<dyn UserRepository>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
            uploads: Arc::new(uploads),
            users,
            passwords: PasswordService::new(),
        }
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// State for the WebSocket routes
    pub fn gateway_state(&self) -> GatewayState {
        GatewayState::new(self.gateway.clone())
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    pub fn passwords(&self) -> &PasswordService {
        &self.passwords
    }

    /// User store, or `Unavailable` when auth is switched off
    pub fn users(&self) -> Result<&dyn UserRepository, AppError> {
        self.users
            .as_deref()
            .ok_or_else(|| AppError::Unavailable("user accounts require a database".to_string()))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gateway", &self.gateway)
            .field("uploads", &self.uploads.root())
            .field("users", &self.users.is_some())
            .field("config", &"AppConfig")
            .finish()
    }
}
