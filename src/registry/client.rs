//! HTTP client for a remote bed registry
//!
//! Every request carries the session's bearer token (when one is set). Failed
//! calls are never retried; the caller decides what to do next.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;

use crate::models::{Bed, BedStats, BookingRequest};

use super::{BedRegistry, RegistryError};

/// Fallback message when the registry gives no reason for a failure
const GENERIC_FAILURE: &str = "Something went wrong";

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the registry client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Registry API base URL, e.g. `http://localhost:8080/api`
    pub base_url: String,

    /// Transport timeout; `None` leaves requests unbounded
    pub timeout: Option<Duration>,

    /// Bearer token sent with every request
    pub token: Option<String>,
}

impl ClientConfig {
    /// Create a new client config
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            token: None,
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

// ============================================================================
// Auth Types
// ============================================================================

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ============================================================================
// Registry Client
// ============================================================================

/// Client for communicating with a bed registry over HTTP
pub struct RegistryClient {
    base_url: String,
    http_client: Client,
    token: RwLock<Option<String>>,
}

impl RegistryClient {
    /// Create a new registry client
    pub fn new(config: ClientConfig) -> Result<Self, RegistryError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| RegistryError::InvalidUrl(format!("{base_url}: {e}")))?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        Ok(Self {
            base_url,
            http_client,
            token: RwLock::new(config.token),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the bearer token
    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
        }
    }

    /// Drop the bearer token
    pub fn clear_token(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.read().map(|t| t.is_some()).unwrap_or(false)
    }

    /// Exchange credentials for a token and keep it for later calls
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, RegistryError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self
            .send(self.request(Method::POST, "/auth/login").json(&body))
            .await?;

        self.set_token(response.token.clone());
        tracing::info!(email = %email, "Logged in to bed registry");
        Ok(response)
    }

    /// Revoke the current token on the server, then drop it locally.
    ///
    /// The local token is dropped even when the server call fails.
    pub async fn logout(&self) -> Result<(), RegistryError> {
        if !self.has_token() {
            return Ok(());
        }
        let result = self
            .send::<serde_json::Value>(self.request(Method::POST, "/auth/logout"))
            .await
            .map(|_| ());
        self.clear_token();
        result
    }

    /// Profile of the authenticated user
    pub async fn profile(&self) -> Result<UserProfile, RegistryError> {
        self.send(self.request(Method::GET, "/auth/profile")).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self
            .http_client
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        match self.token.read().ok().and_then(|t| t.clone()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, RegistryError> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = %e, "Registry request failed");
            RegistryError::Transport(e.to_string())
        })?;

        let response = Self::check_status(response).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| RegistryError::Decode(e.to_string()))
    }

    async fn check_status(response: Response) -> Result<Response, RegistryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Registry rejected credentials");
            return Err(RegistryError::Unauthorized);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());

        tracing::error!(status = status.as_u16(), message = %message, "Registry error");

        Err(RegistryError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl BedRegistry for RegistryClient {
    async fn initialize(&self) -> Result<(), RegistryError> {
        let response = self
            .request(Method::POST, "/beds/initialize")
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        // Body is informational only
        Self::check_status(response).await.map(|_| ())
    }

    async fn get_all(&self) -> Result<Vec<Bed>, RegistryError> {
        self.send(self.request(Method::GET, "/beds")).await
    }

    async fn get_available(&self) -> Result<Vec<Bed>, RegistryError> {
        self.send(self.request(Method::GET, "/beds/available")).await
    }

    async fn get_booked(&self) -> Result<Vec<Bed>, RegistryError> {
        self.send(self.request(Method::GET, "/beds/booked")).await
    }

    async fn book(&self, id: u32, request: &BookingRequest) -> Result<Bed, RegistryError> {
        let path = format!("/beds/{id}/book");
        self.send(self.request(Method::POST, &path).json(request))
            .await
    }

    async fn unbook(&self, id: u32) -> Result<Bed, RegistryError> {
        let path = format!("/beds/{id}/unbook");
        self.send(self.request(Method::POST, &path)).await
    }

    async fn get_stats(&self) -> Result<BedStats, RegistryError> {
        self.send(self.request(Method::GET, "/beds/stats")).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_creation() {
        let config = ClientConfig::new("http://localhost:8080/api");

        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert!(config.timeout.is_none());
        assert!(config.token.is_none());
    }

    #[test]
    fn test_client_config_builders() {
        let config = ClientConfig::new("http://localhost:8080/api")
            .with_timeout(Duration::from_secs(30))
            .with_token("abc");

        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_client_creation_trims_trailing_slash() {
        let client = RegistryClient::new(ClientConfig::new("http://localhost:8080/api/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api");
    }

    #[test]
    fn test_client_rejects_invalid_url() {
        let result = RegistryClient::new(ClientConfig::new("not a url"));
        assert!(matches!(result, Err(RegistryError::InvalidUrl(_))));
    }

    #[test]
    fn test_token_lifecycle() {
        let client = RegistryClient::new(ClientConfig::new("http://localhost:8080/api")).unwrap();
        assert!(!client.has_token());

        client.set_token("t");
        assert!(client.has_token());

        client.clear_token();
        assert!(!client.has_token());
    }
}
