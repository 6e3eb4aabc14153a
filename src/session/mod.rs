//! Authenticated session context
//!
//! Owns the bearer credential and the idle deadline. A session is created at
//! login (or from a configured token) and torn down at logout, idle expiry, or
//! when the registry rejects the credential.

use std::sync::Arc;

use tokio::time::{Duration, Instant};

use crate::registry::client::{RegistryClient, UserProfile};
use crate::registry::RegistryError;

/// Idle time before a session ends
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(4 * 60);

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// User logged out
    Logout,
    /// No activity within the idle timeout
    IdleTimeout,
    /// Registry answered 401
    Unauthorized,
}

/// Live session bound to a registry client
pub struct Session {
    client: Arc<RegistryClient>,
    idle_timeout: Duration,
    last_activity: Instant,
    user: Option<UserProfile>,
    ended: Option<SessionEnd>,
}

impl Session {
    /// Log in with credentials
    pub async fn login(
        client: Arc<RegistryClient>,
        email: &str,
        password: &str,
        idle_timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let response = client.login(email, password).await?;

        Ok(Self {
            client,
            idle_timeout,
            last_activity: Instant::now(),
            user: response.user,
            ended: None,
        })
    }

    /// Resume with an existing token
    pub fn from_token(client: Arc<RegistryClient>, token: &str, idle_timeout: Duration) -> Self {
        client.set_token(token);
        Self {
            client,
            idle_timeout,
            last_activity: Instant::now(),
            user: None,
            ended: None,
        }
    }

    /// Session over a registry that needs no credential
    pub fn anonymous(client: Arc<RegistryClient>, idle_timeout: Duration) -> Self {
        Self {
            client,
            idle_timeout,
            last_activity: Instant::now(),
            user: None,
            ended: None,
        }
    }

    pub fn client(&self) -> Arc<RegistryClient> {
        self.client.clone()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Record user activity, pushing the idle deadline out
    pub fn touch(&mut self) {
        if self.ended.is_none() {
            self.last_activity = Instant::now();
        }
    }

    /// When the session expires without further activity
    pub fn deadline(&self) -> Instant {
        self.last_activity + self.idle_timeout
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline()
    }

    pub fn is_active(&self) -> bool {
        self.ended.is_none() && !self.is_expired()
    }

    pub fn ended(&self) -> Option<SessionEnd> {
        self.ended
    }

    /// Tear the session down and drop the credential. Ending twice keeps the
    /// first reason.
    pub fn end(&mut self, reason: SessionEnd) {
        if self.ended.is_some() {
            return;
        }
        self.client.clear_token();
        self.ended = Some(reason);
        tracing::info!(reason = ?reason, "Session ended");
    }

    /// Revoke the token on the registry, then end the session.
    ///
    /// A failed revoke is logged; the local credential is dropped regardless.
    pub async fn logout(&mut self) {
        if self.ended.is_some() {
            return;
        }
        if let Err(e) = self.client.logout().await {
            tracing::warn!(error = %e, "Token revoke failed");
        }
        self.end(SessionEnd::Logout);
    }
}
