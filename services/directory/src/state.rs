//! Application state shared across handlers

use anyhow::Result;
use std::sync::Arc;

use crate::store::DocumentRepository;
use crate::token::TokenService;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener
    pub bind_addr: String,
    /// Whether unauthenticated callers get the public view
    pub allow_anonymous: bool,
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SHELFMARK_BIND`: listen address (default: "0.0.0.0:3000")
    /// - `SHELFMARK_ALLOW_ANONYMOUS`: anonymous browsing toggle (default: true)
    pub fn from_env() -> Result<Self> {
        let bind_addr =
            std::env::var("SHELFMARK_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let allow_anonymous = std::env::var("SHELFMARK_ALLOW_ANONYMOUS")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(ServerConfig {
            bind_addr,
            allow_anonymous,
        })
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn DocumentRepository>,
    pub tokens: TokenService,
    pub allow_anonymous: bool,
}
