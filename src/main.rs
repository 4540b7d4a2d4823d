use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use menu_rs::{
    create_app, init_observability,
    repositories::{
        DynamoDbMenuItemStore, InMemoryMenuItemStore, MenuItemStore, MeteredMenuItemStore,
        TableManager,
    },
    services::MenuItemService,
    shutdown_observability, Config, Metrics, StoreBackend,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_environment()
        .await
        .context("Failed to load configuration")?;

    init_observability(
        &config.observability.service_name,
        &config.observability.service_version,
        config.observability.otlp_endpoint.as_deref(),
        &config.observability.log_level,
        config.observability.enable_json_logging,
    )?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );

    let metrics = Arc::new(Metrics::new()?);

    let store = build_store(&config).await?;
    let store: Arc<dyn MenuItemStore> = Arc::new(MeteredMenuItemStore::new(
        store,
        metrics.clone(),
        config.database.table_name.clone(),
    ));
    let menu_service = Arc::new(MenuItemService::with_metrics(store, metrics.clone()));

    let app = create_app(metrics, menu_service, &config.server);

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .with_context(|| format!("Invalid host address: {}", config.server.host))?,
        config.server.port,
    );
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_observability().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Build the configured store. For DynamoDB the table must be reachable
/// (or creatable) before the server starts.
async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn MenuItemStore>> {
    match config.database.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory menu item store");
            Ok(Arc::new(InMemoryMenuItemStore::new()))
        }
        StoreBackend::Dynamodb => {
            let client = Arc::new(
                config
                    .dynamodb_client
                    .clone()
                    .context("DynamoDB client was not configured")?,
            );

            TableManager::new(client.clone())
                .ensure_menu_table(&config.database.table_name, config.database.create_table)
                .await
                .with_context(|| {
                    format!(
                        "Failed to connect to table {}",
                        config.database.table_name
                    )
                })?;

            info!(
                "Using DynamoDB table {} in {}",
                config.database.table_name, config.database.region
            );
            Ok(Arc::new(DynamoDbMenuItemStore::new(
                client,
                config.database.table_name.clone(),
                config.database.region.clone(),
            )))
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await
        }
    }
}
