use anyhow::{Context, Result};

use wardbeds::config::{Config, ServerConfig};
use wardbeds::registry::RegistryServer;

/// Overrides for the reference registry server
#[derive(Debug, Clone, Default)]
pub struct ServeParams {
    pub bind: Option<String>,
    pub beds: Option<u32>,
    pub access_token: Option<String>,
}

impl ServeParams {
    fn apply(self, config: &ServerConfig) -> ServerConfig {
        ServerConfig {
            bind_address: self.bind.unwrap_or_else(|| config.bind_address.clone()),
            bed_count: self.beds.unwrap_or(config.bed_count),
            access_token: self.access_token.or_else(|| config.access_token.clone()),
            ..config.clone()
        }
    }
}

/// Run the reference bed registry until Ctrl-C
pub async fn serve(config: &Config, params: ServeParams) -> Result<()> {
    let server_config = params.apply(&config.server);

    println!("Starting Bed Registry");
    println!("=====================");
    println!("  Bind Address: {}", server_config.bind_address);
    println!("  Beds: {}", server_config.bed_count);
    println!(
        "  Auth: {}",
        if server_config.access_token.is_some() || server_config.login_email.is_some() {
            "required"
        } else {
            "open"
        }
    );
    println!();

    let server = RegistryServer::new(server_config).context("Failed to create registry server")?;

    server
        .start_with_shutdown(shutdown_signal())
        .await
        .context("Registry server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
