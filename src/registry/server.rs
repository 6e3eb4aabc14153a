//! Reference bed registry server
//!
//! Serves an `InMemoryRegistry` over the REST API in [`super::api`]. Used for
//! local development and end-to-end tests of the client.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

use super::api::create_router;
use super::memory::InMemoryRegistry;

// ============================================================================
// Auth State
// ============================================================================

/// Credentials accepted by the server and the tokens it has issued
pub struct AuthState {
    access_token: Option<String>,
    credentials: Option<(String, String)>,
    issued: RwLock<HashMap<String, String>>,
}

impl AuthState {
    pub fn new(access_token: Option<String>, credentials: Option<(String, String)>) -> Self {
        Self {
            access_token,
            credentials,
            issued: RwLock::new(HashMap::new()),
        }
    }

    /// Open server: every request is accepted
    pub fn open() -> Self {
        Self::new(None, None)
    }

    /// Whether bed routes need a bearer token
    pub fn is_required(&self) -> bool {
        self.access_token.is_some() || self.credentials.is_some()
    }

    /// Check a presented bearer token
    pub async fn accepts(&self, token: &str) -> bool {
        if self.access_token.as_deref() == Some(token) {
            return true;
        }
        self.issued.read().await.contains_key(token)
    }

    /// Issue a token for matching credentials.
    ///
    /// An open server issues a token to anyone.
    pub async fn login(&self, email: &str, password: &str) -> Option<String> {
        if let Some((expected_email, expected_password)) = &self.credentials {
            if email != expected_email || password != expected_password {
                return None;
            }
        } else if self.access_token.is_some() {
            // Static-token servers have no login
            return None;
        }

        let token = uuid::Uuid::new_v4().to_string();
        self.issued
            .write()
            .await
            .insert(token.clone(), email.to_string());
        Some(token)
    }

    /// Forget an issued token. Returns whether it was known.
    pub async fn revoke(&self, token: &str) -> bool {
        self.issued.write().await.remove(token).is_some()
    }

    pub async fn issued_count(&self) -> usize {
        self.issued.read().await.len()
    }

    /// Email the token was issued to; the configured account for the
    /// static token
    pub async fn email_for(&self, token: &str) -> Option<String> {
        if let Some(email) = self.issued.read().await.get(token) {
            return Some(email.clone());
        }
        self.credentials.as_ref().map(|(email, _)| email.clone())
    }
}

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Authoritative bed store
    pub registry: Arc<InMemoryRegistry>,

    /// Authentication
    pub auth: Arc<AuthState>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(registry: Arc<InMemoryRegistry>, auth: AuthState) -> Self {
        Self {
            registry,
            auth: Arc::new(auth),
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Registry Server
// ============================================================================

/// HTTP server in front of an in-memory registry
pub struct RegistryServer {
    config: ServerConfig,
    state: AppState,
}

impl RegistryServer {
    /// Create a new registry server
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        if config.bed_count == 0 {
            return Err(ServerError::Config(
                "bed_count must be greater than 0".to_string(),
            ));
        }

        let credentials = match (&config.login_email, &config.login_password) {
            (Some(email), Some(password)) => Some((email.clone(), password.clone())),
            (None, None) => None,
            _ => {
                return Err(ServerError::Config(
                    "login_email and login_password must be set together".to_string(),
                ))
            }
        };

        let registry = Arc::new(InMemoryRegistry::new(config.bed_count));
        let auth = AuthState::new(config.access_token.clone(), credentials);

        Ok(Self {
            state: AppState::new(registry, auth),
            config,
        })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr: SocketAddr = self
            .config
            .bind_address
            .parse()
            .map_err(|_| ServerError::Config(format!("Invalid address: {}", self.config.bind_address)))?;

        TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))
    }

    /// Serve on the configured address until the process ends
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Serve on the configured address with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal).await
    }

    /// Serve on an already bound listener with graceful shutdown
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        tracing::info!(
            address = %addr,
            bed_count = self.config.bed_count,
            auth_required = self.state.auth.is_required(),
            "Starting bed registry server"
        );

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("Bed registry server shutdown complete");
        Ok(())
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Error, Debug, Clone)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to bind to address
    #[error("Failed to bind: {0}")]
    Bind(String),

    /// Server error
    #[error("Server error: {0}")]
    Serve(String),
}
