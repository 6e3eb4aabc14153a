//! Common test utilities

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use wardbeds::config::ServerConfig;
use wardbeds::registry::server::AppState;
use wardbeds::registry::{ClientConfig, RegistryClient, RegistryServer};

/// Reference registry running on an ephemeral port
pub struct TestRegistry {
    pub base_url: String,
    pub state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestRegistry {
    /// Stop accepting connections and wait for the server to exit
    #[allow(dead_code)]
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.handle).await;
    }

    /// Client pointed at this registry, without a credential
    #[allow(dead_code)]
    pub fn client(&self) -> Arc<RegistryClient> {
        Arc::new(RegistryClient::new(ClientConfig::new(&self.base_url)).unwrap())
    }
}

/// Spawn an open registry with `bed_count` beds
#[allow(dead_code)]
pub async fn spawn_registry(bed_count: u32) -> TestRegistry {
    spawn_registry_with(ServerConfig {
        bed_count,
        ..Default::default()
    })
    .await
}

/// Spawn a registry with custom server settings
pub async fn spawn_registry_with(config: ServerConfig) -> TestRegistry {
    let server = RegistryServer::new(ServerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        enable_request_logging: false,
        ..config
    })
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = server.state();
    let (tx, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        server
            .serve(listener, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    TestRegistry {
        base_url: format!("http://{addr}/api"),
        state,
        shutdown: Some(tx),
        handle,
    }
}
