//! Shared application state.

use std::sync::Arc;
use warden_auth::AuthService;

/// State handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}
