//! Application state shared across handlers.

use std::sync::Arc;

use crate::registry::SessionRegistry;

/// Cross-origin settings for the API layer.
#[derive(Clone, Debug)]
pub struct CorsState {
    /// Explicitly allowed origins.
    pub allowed_origins: Vec<String>,
    /// With no configured origins, allow common localhost origins instead of
    /// denying every cross-origin request.
    pub dev_mode: bool,
}

impl Default for CorsState {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            dev_mode: true,
        }
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session registry.
    pub registry: Arc<SessionRegistry>,
    /// CORS configuration.
    pub cors: CorsState,
}

impl AppState {
    /// Create new application state.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            cors: CorsState::default(),
        }
    }

    /// Set CORS configuration.
    pub fn with_cors(mut self, cors: CorsState) -> Self {
        self.cors = cors;
        self
    }
}
