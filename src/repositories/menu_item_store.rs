use async_trait::async_trait;
use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue, Select};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn, Instrument};

use super::enforce_invariants;
use crate::models::{
    MenuItem, MenuItemId, MenuItemPatch, NewMenuItem, RepositoryError, RepositoryResult,
};

/// Trait defining the interface for menu item persistence.
///
/// `None` from the lookup operations means no record with that id exists.
#[async_trait]
pub trait MenuItemStore: Send + Sync {
    /// Persist a new item under a freshly assigned id
    async fn insert(&self, item: NewMenuItem) -> RepositoryResult<MenuItem>;

    /// Return every stored item, in store-defined order
    async fn find_all(&self) -> RepositoryResult<Vec<MenuItem>>;

    /// Apply a partial update and return the item as it is after the update
    async fn find_by_id_and_update(
        &self,
        id: &str,
        patch: MenuItemPatch,
    ) -> RepositoryResult<Option<MenuItem>>;

    /// Remove an item and return what was removed
    async fn find_by_id_and_delete(&self, id: &str) -> RepositoryResult<Option<MenuItem>>;
}

/// DynamoDB implementation of the MenuItemStore trait
pub struct DynamoDbMenuItemStore {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbMenuItemStore {
    /// Create a new DynamoDB menu item store
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    /// Create a client span for one DynamoDB call
    fn create_dynamodb_span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "DynamoDB",
            "aws.service" = "DynamoDB",
            "aws.operation" = operation,
            "aws.region" = %self.region,
            "aws.dynamodb.table_name" = %self.table_name,
            "aws.request_id" = tracing::field::Empty,
            "otel.kind" = "client",
            "otel.name" = format!("DynamoDB.{}", operation),
            "rpc.system" = "aws-api",
            "rpc.service" = "AmazonDynamoDBv2",
            "rpc.method" = operation,
            "db.system" = "dynamodb",
            "db.name" = %self.table_name,
            "db.operation" = operation,
        )
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Convert a MenuItem to DynamoDB attribute values
    pub fn menu_item_to_item(&self, menu_item: &MenuItem) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();

        item.insert(
            "id".to_string(),
            AttributeValue::S(menu_item.id.as_str().to_string()),
        );
        item.insert(
            "name".to_string(),
            AttributeValue::S(menu_item.name.clone()),
        );
        if let Some(ref description) = menu_item.description {
            item.insert(
                "description".to_string(),
                AttributeValue::S(description.clone()),
            );
        }
        item.insert(
            "price".to_string(),
            AttributeValue::N(price_to_attribute(&menu_item.price)),
        );

        item
    }

    /// Convert a DynamoDB item to a MenuItem
    pub fn item_to_menu_item(
        &self,
        item: HashMap<String, AttributeValue>,
    ) -> RepositoryResult<MenuItem> {
        let id = item
            .get("id")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| RepositoryError::MalformedRecord {
                message: "Missing id".to_string(),
            })?;

        let name = item
            .get("name")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| RepositoryError::MalformedRecord {
                message: format!("Missing name on item {}", id),
            })?
            .clone();

        let description = item
            .get("description")
            .and_then(|v| v.as_s().ok())
            .cloned();

        let price = item
            .get("price")
            .and_then(|v| v.as_n().ok())
            .and_then(|s| {
                Decimal::from_str(s)
                    .or_else(|_| Decimal::from_scientific(s))
                    .ok()
            })
            .ok_or_else(|| RepositoryError::MalformedRecord {
                message: format!("Invalid price on item {}", id),
            })?;

        Ok(MenuItem {
            id: MenuItemId::new(id.clone()),
            name,
            description,
            price,
        })
    }

    /// Build the UpdateItem expression for a non-empty patch
    pub fn update_expression(
        &self,
        patch: &MenuItemPatch,
    ) -> (
        String,
        HashMap<String, String>,
        HashMap<String, AttributeValue>,
    ) {
        let mut set_clauses = Vec::new();
        let mut remove_clauses = Vec::new();
        let mut names = HashMap::new();
        let mut values = HashMap::new();

        names.insert("#id".to_string(), "id".to_string());

        if let Some(ref name) = patch.name {
            set_clauses.push("#name = :name");
            names.insert("#name".to_string(), "name".to_string());
            values.insert(":name".to_string(), AttributeValue::S(name.clone()));
        }

        match patch.description {
            Some(Some(ref description)) => {
                set_clauses.push("#description = :description");
                names.insert("#description".to_string(), "description".to_string());
                values.insert(
                    ":description".to_string(),
                    AttributeValue::S(description.clone()),
                );
            }
            Some(None) => {
                remove_clauses.push("#description");
                names.insert("#description".to_string(), "description".to_string());
            }
            None => {}
        }

        if let Some(ref price) = patch.price {
            set_clauses.push("#price = :price");
            names.insert("#price".to_string(), "price".to_string());
            values.insert(
                ":price".to_string(),
                AttributeValue::N(price_to_attribute(price)),
            );
        }

        let mut expression = Vec::new();
        if !set_clauses.is_empty() {
            expression.push(format!("SET {}", set_clauses.join(", ")));
        }
        if !remove_clauses.is_empty() {
            expression.push(format!("REMOVE {}", remove_clauses.join(", ")));
        }

        (expression.join(" "), names, values)
    }

    /// Read one item with a strongly consistent GetItem
    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<MenuItem>> {
        let get_span = self.create_dynamodb_span("GetItem");

        let response = async {
            let result = self
                .client
                .get_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id.to_string()))
                .consistent_read(true)
                .send()
                .await;

            match &result {
                Ok(output) => {
                    if let Some(request_id) = output.request_id() {
                        tracing::Span::current().record("aws.request_id", request_id);
                    }
                }
                Err(e) => {
                    error!("DynamoDB GetItem failed: {}", e);
                }
            }

            result.map_err(|e| self.map_dynamodb_error(e.into()))
        }
        .instrument(get_span)
        .await?;

        response
            .item
            .map(|item| self.item_to_menu_item(item))
            .transpose()
    }

    /// Convert DynamoDB error to RepositoryError
    fn map_dynamodb_error(&self, error: DynamoDbError) -> RepositoryError {
        error!("DynamoDB error: {:?}", error);

        if matches!(error, DynamoDbError::ResourceNotFoundException(_)) {
            return RepositoryError::TableNotFound {
                table_name: self.table_name.clone(),
            };
        }

        RepositoryError::AwsSdk {
            message: error.to_string(),
        }
    }
}

/// DynamoDB numbers are sent as strings; zero is normalised so `-0` never lands
fn price_to_attribute(price: &Decimal) -> String {
    price.normalize().to_string()
}

#[async_trait]
impl MenuItemStore for DynamoDbMenuItemStore {
    #[instrument(skip(self, item), fields(table = %self.table_name))]
    async fn insert(&self, item: NewMenuItem) -> RepositoryResult<MenuItem> {
        info!("Inserting new menu item");

        let menu_item = MenuItem::from_new(MenuItemId::generate(), item);
        enforce_invariants(&menu_item)?;

        let attributes = self.menu_item_to_item(&menu_item);
        let put_span = self.create_dynamodb_span("PutItem");

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(attributes))
                .condition_expression("attribute_not_exists(id)")
                .send()
                .await
                .map_err(|e| self.map_dynamodb_error(e.into()))
        }
        .instrument(put_span)
        .await?;

        info!(id = %menu_item.id, "Menu item inserted");
        Ok(menu_item)
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(&self) -> RepositoryResult<Vec<MenuItem>> {
        info!("Scanning all menu items");

        let mut menu_items = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let scan_span = self.create_dynamodb_span("Scan");
            let response = async {
                self.client
                    .scan()
                    .table_name(&self.table_name)
                    .select(Select::AllAttributes)
                    .set_exclusive_start_key(exclusive_start_key.take())
                    .send()
                    .await
                    .map_err(|e| self.map_dynamodb_error(e.into()))
            }
            .instrument(scan_span)
            .await?;

            for item in response.items.unwrap_or_default() {
                match self.item_to_menu_item(item) {
                    Ok(menu_item) => menu_items.push(menu_item),
                    Err(e) => {
                        warn!("Skipping unreadable menu item: {}", e);
                    }
                }
            }

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        info!("Found {} menu items", menu_items.len());
        Ok(menu_items)
    }

    #[instrument(skip(self, patch), fields(table = %self.table_name, id = %id))]
    async fn find_by_id_and_update(
        &self,
        id: &str,
        patch: MenuItemPatch,
    ) -> RepositoryResult<Option<MenuItem>> {
        if patch.is_empty() {
            info!("Empty patch, returning current menu item");
            return self.find_by_id(id).await;
        }

        enforce_invariants(&patch)?;

        info!("Updating menu item");
        let (expression, names, values) = self.update_expression(&patch);
        let update_span = self.create_dynamodb_span("UpdateItem");

        let result = async {
            self.client
                .update_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id.to_string()))
                .update_expression(expression)
                .condition_expression("attribute_exists(#id)")
                .set_expression_attribute_names(Some(names))
                .set_expression_attribute_values(if values.is_empty() {
                    None
                } else {
                    Some(values)
                })
                .return_values(ReturnValue::AllNew)
                .send()
                .await
        }
        .instrument(update_span)
        .await;

        match result {
            Ok(output) => output
                .attributes
                .map(|item| self.item_to_menu_item(item))
                .transpose(),
            Err(e) => {
                let error: DynamoDbError = e.into();
                if matches!(error, DynamoDbError::ConditionalCheckFailedException(_)) {
                    info!("Menu item not found for update");
                    Ok(None)
                } else {
                    Err(self.map_dynamodb_error(error))
                }
            }
        }
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn find_by_id_and_delete(&self, id: &str) -> RepositoryResult<Option<MenuItem>> {
        info!("Deleting menu item");

        let delete_span = self.create_dynamodb_span("DeleteItem");

        let response = async {
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id.to_string()))
                .return_values(ReturnValue::AllOld)
                .send()
                .await
                .map_err(|e| self.map_dynamodb_error(e.into()))
        }
        .instrument(delete_span)
        .await?;

        match response.attributes {
            Some(item) if !item.is_empty() => self.item_to_menu_item(item).map(Some),
            _ => {
                info!("Menu item not found for delete");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn create_test_store() -> DynamoDbMenuItemStore {
        let config = aws_sdk_dynamodb::Config::builder()
            .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        let client = Arc::new(aws_sdk_dynamodb::Client::from_conf(config));
        DynamoDbMenuItemStore::new(client, "test-menu".to_string(), "us-east-1".to_string())
    }

    fn create_test_item() -> MenuItem {
        MenuItem::from_new(
            MenuItemId::generate(),
            NewMenuItem {
                name: "Burger".to_string(),
                description: Some("Beef patty, brioche bun".to_string()),
                price: dec!(8.50),
            },
        )
    }

    #[test]
    fn test_menu_item_to_item_conversion() {
        let store = create_test_store();
        let menu_item = create_test_item();

        let item = store.menu_item_to_item(&menu_item);

        assert_eq!(item.len(), 4);
        assert_eq!(
            item.get("id"),
            Some(&AttributeValue::S(menu_item.id.to_string()))
        );
        assert_eq!(
            item.get("price"),
            Some(&AttributeValue::N("8.5".to_string()))
        );
    }

    #[test]
    fn test_menu_item_to_item_omits_missing_description() {
        let store = create_test_store();
        let mut menu_item = create_test_item();
        menu_item.description = None;

        let item = store.menu_item_to_item(&menu_item);

        assert!(!item.contains_key("description"));
    }

    #[test]
    fn test_item_to_menu_item_conversion() {
        let store = create_test_store();
        let menu_item = create_test_item();

        let converted = store
            .item_to_menu_item(store.menu_item_to_item(&menu_item))
            .unwrap();

        assert_eq!(converted.id, menu_item.id);
        assert_eq!(converted.name, menu_item.name);
        assert_eq!(converted.description, menu_item.description);
        assert_eq!(converted.price, menu_item.price);
    }

    #[test]
    fn test_item_to_menu_item_rejects_bad_price() {
        let store = create_test_store();
        let mut item = store.menu_item_to_item(&create_test_item());
        item.insert("price".to_string(), AttributeValue::S("cheap".to_string()));

        let result = store.item_to_menu_item(item);

        assert!(matches!(
            result,
            Err(RepositoryError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_item_to_menu_item_requires_id() {
        let store = create_test_store();
        let mut item = store.menu_item_to_item(&create_test_item());
        item.remove("id");

        assert!(store.item_to_menu_item(item).is_err());
    }

    #[test]
    fn test_zero_price_is_normalised() {
        assert_eq!(price_to_attribute(&dec!(-0.00)), "0");
        assert_eq!(price_to_attribute(&dec!(9.0)), "9");
    }

    #[test]
    fn test_update_expression_for_price_only() {
        let store = create_test_store();
        let patch = MenuItemPatch {
            price: Some(dec!(9.0)),
            ..Default::default()
        };

        let (expression, names, values) = store.update_expression(&patch);

        assert_eq!(expression, "SET #price = :price");
        assert_eq!(names.get("#price").map(String::as_str), Some("price"));
        assert_eq!(names.get("#id").map(String::as_str), Some("id"));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_update_expression_set_and_remove() {
        let store = create_test_store();
        let patch = MenuItemPatch {
            name: Some("Cheeseburger".to_string()),
            description: Some(None),
            price: None,
        };

        let (expression, names, values) = store.update_expression(&patch);

        assert_eq!(expression, "SET #name = :name REMOVE #description");
        assert!(names.contains_key("#description"));
        assert!(!values.contains_key(":description"));
    }

    #[test]
    fn test_store_creation() {
        let store = create_test_store();
        assert_eq!(store.table_name(), "test-menu");
        assert_eq!(store.region, "us-east-1");
    }
}
