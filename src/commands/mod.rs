pub mod beds;
pub mod serve;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};

use wardbeds::config::Config;
use wardbeds::registry::{ClientConfig, RegistryClient};
use wardbeds::session::Session;

// Re-export command functions for convenience
pub use beds::{available, book, booked, initialize, list, login, stats, unbook};
pub use serve::{serve, ServeParams};
pub use watch::watch;

/// Registry client for the configured base URL, without a credential
pub fn build_client(config: &Config) -> Result<Arc<RegistryClient>> {
    let mut client_config = ClientConfig::new(&config.registry.base_url);
    if let Some(timeout) = config.request_timeout() {
        client_config = client_config.with_timeout(timeout);
    }

    let client = RegistryClient::new(client_config).context("Failed to create registry client")?;
    Ok(Arc::new(client))
}

/// Build a registry client and open a session: configured token first,
/// then configured credentials, otherwise no credential at all.
pub async fn connect(config: &Config) -> Result<Session> {
    let client = build_client(config)?;
    let idle_timeout = config.idle_timeout();

    let session = match (
        &config.registry.token,
        &config.registry.email,
        &config.registry.password,
    ) {
        (Some(token), _, _) => Session::from_token(client, token, idle_timeout),
        (None, Some(email), Some(password)) => {
            Session::login(client, email, password, idle_timeout)
                .await
                .with_context(|| format!("Login failed for {email}"))?
        }
        _ => Session::anonymous(client, idle_timeout),
    };

    Ok(session)
}
