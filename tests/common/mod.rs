use std::sync::Arc;
use std::time::Duration;

use menu_rs::{
    config::ServerConfig, create_app, repositories::InMemoryMenuItemStore,
    services::MenuItemService, Metrics,
};
use reqwest::Client;
use tokio::net::TcpListener;

pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
}

pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 3010,
        request_timeout_seconds: 30,
        max_request_size: 1024 * 1024,
        expose_error_details: true,
    }
}

impl TestEnvironment {
    pub async fn new() -> Self {
        Self::with_server_config(test_server_config()).await
    }

    /// Serve the real router backed by an empty in-memory store
    pub async fn with_server_config(server: ServerConfig) -> Self {
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let service = Arc::new(MenuItemService::with_metrics(
            Arc::new(InMemoryMenuItemStore::new()),
            metrics.clone(),
        ));
        let app = create_app(metrics, service, &server);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to serve app");
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
