use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::models::{RepositoryError, RepositoryResult};

/// Checks and provisions the menu items table
pub struct TableManager {
    client: Arc<DynamoDbClient>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl TableManager {
    /// Create a new table manager
    pub fn new(client: Arc<DynamoDbClient>) -> Self {
        Self {
            client,
            poll_interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }

    /// Make sure the table is reachable. Creates it when `create_if_missing`
    /// is set, otherwise a missing table is an error.
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn ensure_menu_table(
        &self,
        table_name: &str,
        create_if_missing: bool,
    ) -> RepositoryResult<()> {
        if self.table_exists(table_name).await? {
            info!("Table {} is reachable", table_name);
            return Ok(());
        }

        if !create_if_missing {
            error!("Table {} does not exist", table_name);
            return Err(RepositoryError::TableNotFound {
                table_name: table_name.to_string(),
            });
        }

        self.create_menu_table(table_name).await
    }

    /// Create the menu items table keyed by `id`
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_menu_table(&self, table_name: &str) -> RepositoryResult<()> {
        info!("Creating menu items table");

        let (attribute_definitions, key_schema) = menu_table_schema()?;

        self.client
            .create_table()
            .table_name(table_name)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| self.map_dynamodb_error(e.into()))?;

        info!("Table creation initiated, waiting for table to become active");
        self.wait_for_table_active(table_name).await?;
        info!("Menu items table created successfully");

        Ok(())
    }

    /// Check if a table exists
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let error: DynamoDbError = e.into();
                if matches!(error, DynamoDbError::ResourceNotFoundException(_)) {
                    info!("Table {} does not exist", table_name);
                    Ok(false)
                } else {
                    error!("Error checking table existence: {}", error);
                    Err(self.map_dynamodb_error(error))
                }
            }
        }
    }

    /// Wait for a table to become active
    #[instrument(skip(self), fields(table_name = %table_name))]
    async fn wait_for_table_active(&self, table_name: &str) -> RepositoryResult<()> {
        for _ in 0..self.max_attempts {
            let response = self
                .client
                .describe_table()
                .table_name(table_name)
                .send()
                .await
                .map_err(|e| self.map_dynamodb_error(e.into()))?;

            match response.table.and_then(|table| table.table_status) {
                Some(TableStatus::Active) => {
                    info!("Table {} is now active", table_name);
                    return Ok(());
                }
                Some(status) => {
                    info!("Table {} status: {:?}, waiting...", table_name, status);
                }
                None => {
                    warn!("Table {} status unknown, waiting...", table_name);
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        error!("Timeout waiting for table {} to become active", table_name);
        Err(RepositoryError::Timeout)
    }

    /// Convert DynamoDB error to RepositoryError
    fn map_dynamodb_error(&self, error: DynamoDbError) -> RepositoryError {
        error!("DynamoDB error: {:?}", error);
        RepositoryError::AwsSdk {
            message: error.to_string(),
        }
    }
}

/// Attribute definitions and key schema of the menu items table
fn menu_table_schema() -> RepositoryResult<(Vec<AttributeDefinition>, Vec<KeySchemaElement>)> {
    let attribute_definitions = vec![AttributeDefinition::builder()
        .attribute_name("id")
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(|e| RepositoryError::AwsSdk {
            message: format!("Failed to build attribute definition: {}", e),
        })?];

    let key_schema = vec![KeySchemaElement::builder()
        .attribute_name("id")
        .key_type(KeyType::Hash)
        .build()
        .map_err(|e| RepositoryError::AwsSdk {
            message: format!("Failed to build key schema: {}", e),
        })?];

    Ok((attribute_definitions, key_schema))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_table_schema() {
        let (attributes, keys) = menu_table_schema().unwrap();

        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].attribute_name(), "id");
        assert_eq!(attributes[0].attribute_type(), &ScalarAttributeType::S);

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].attribute_name(), "id");
        assert_eq!(keys[0].key_type(), &KeyType::Hash);
    }

    #[test]
    fn test_table_manager_creation() {
        let config = aws_sdk_dynamodb::Config::builder()
            .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        let client = Arc::new(aws_sdk_dynamodb::Client::from_conf(config));
        let manager = TableManager::new(client);

        assert_eq!(manager.max_attempts, 60);
        assert_eq!(manager.poll_interval, Duration::from_secs(2));
    }
}
