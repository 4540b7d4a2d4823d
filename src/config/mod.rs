use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const ENV_PREFIX: &str = "MENU";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub observability: ObservabilityConfig,
    /// Present only for the DynamoDB backend
    pub dynamodb_client: Option<DynamoDbClient>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    /// Include the underlying cause in 500 response bodies
    #[serde(default = "default_expose_error_details")]
    pub expose_error_details: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Dynamodb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,
    #[serde(default = "default_table_name")]
    pub table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Overrides the DynamoDB endpoint, e.g. `http://localhost:8000` for DynamoDB Local
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub create_table: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

impl Config {
    /// Load `MENU_*` settings from the process environment
    pub async fn from_environment() -> Result<Self, ConfigError> {
        let environment = config::Environment::with_prefix(ENV_PREFIX);
        Self::from_source(environment).await
    }

    pub(crate) async fn from_source(environment: config::Environment) -> Result<Self, ConfigError> {
        let server: ServerConfig = load_section("server", environment.clone())?;
        let mut database: DatabaseConfig = load_section("database", environment.clone())?;
        let mut observability: ObservabilityConfig =
            load_section("observability", environment)?;

        database.endpoint_url = non_empty(database.endpoint_url);
        observability.otlp_endpoint = non_empty(observability.otlp_endpoint);

        let mut config = Config {
            server,
            database,
            observability,
            dynamodb_client: None,
        };
        config.validate()?;

        if config.database.store_backend == StoreBackend::Dynamodb {
            config.dynamodb_client = Some(build_dynamodb_client(&config.database).await);
        }

        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Request timeout cannot be 0".to_string(),
            });
        }

        if self.server.max_request_size == 0 {
            return Err(ConfigError::ValidationError {
                message: "Maximum request size cannot be 0".to_string(),
            });
        }

        if self.database.table_name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Table name cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn load_section<T: DeserializeOwned>(
    section: &str,
    environment: config::Environment,
) -> Result<T, ConfigError> {
    let settings = config::Config::builder()
        .add_source(environment)
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn build_dynamodb_client(database: &DatabaseConfig) -> DynamoDbClient {
    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(database.region.clone()))
        .load()
        .await;

    let mut builder = aws_sdk_dynamodb::config::Builder::from(&aws_config);
    if let Some(endpoint_url) = &database.endpoint_url {
        info!("Using DynamoDB endpoint override: {}", endpoint_url);
        builder = builder.endpoint_url(endpoint_url);
    }

    DynamoDbClient::from_conf(builder.build())
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    3010
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    1024 * 1024 // 1MB
}

pub(crate) fn default_expose_error_details() -> bool {
    true
}

pub(crate) fn default_store_backend() -> StoreBackend {
    StoreBackend::Dynamodb
}

pub(crate) fn default_table_name() -> String {
    "MenuItems".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_service_name() -> String {
    "menu-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
