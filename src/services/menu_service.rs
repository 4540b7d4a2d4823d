use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    CreateMenuItemRequest, MenuItem, MenuItemPatch, NewMenuItem, ServiceError, ServiceResult,
    UpdateMenuItemRequest,
};
use crate::observability::Metrics;
use crate::repositories::MenuItemStore;

/// Business operations on menu items
pub struct MenuItemService {
    store: Arc<dyn MenuItemStore>,
    metrics: Option<Arc<Metrics>>,
}

impl MenuItemService {
    pub fn new(store: Arc<dyn MenuItemStore>) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    /// Create a service that also counts operations in `menu_operations_total`
    pub fn with_metrics(store: Arc<dyn MenuItemStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            metrics: Some(metrics),
        }
    }

    /// Validate the request and persist a new menu item
    #[instrument(skip(self, request))]
    pub async fn create(&self, request: CreateMenuItemRequest) -> ServiceResult<MenuItem> {
        let result = self.try_create(request).await;
        self.record("create", &result);
        result
    }

    async fn try_create(&self, request: CreateMenuItemRequest) -> ServiceResult<MenuItem> {
        let new_item = NewMenuItem::try_from(request).map_err(|e| {
            crate::warn_with_trace!(error = %e, "Rejected menu item creation");
            e
        })?;

        let item = self.store.insert(new_item).await?;

        crate::info_with_trace!(id = %item.id, "Menu item created");
        Ok(item)
    }

    /// Every persisted menu item, in store order
    #[instrument(skip(self))]
    pub async fn list(&self) -> ServiceResult<Vec<MenuItem>> {
        let result = self.store.find_all().await.map_err(ServiceError::from);
        self.record("list", &result);

        let items = result?;
        crate::info_with_trace!("Found {} menu items", items.len());
        Ok(items)
    }

    /// Apply a partial update. Only the supplied fields change.
    #[instrument(skip(self, request), fields(id = %id))]
    pub async fn update(
        &self,
        id: &str,
        request: UpdateMenuItemRequest,
    ) -> ServiceResult<MenuItem> {
        let result = self.try_update(id, request).await;
        self.record("update", &result);
        result
    }

    async fn try_update(&self, id: &str, request: UpdateMenuItemRequest) -> ServiceResult<MenuItem> {
        let patch = MenuItemPatch::try_from(request).map_err(|e| {
            crate::warn_with_trace!(error = %e, "Rejected menu item update");
            e
        })?;

        match self.store.find_by_id_and_update(id, patch).await? {
            Some(item) => {
                crate::info_with_trace!("Menu item updated");
                Ok(item)
            }
            None => {
                crate::info_with_trace!("Menu item not found for update");
                Err(ServiceError::MenuItemNotFound { id: id.to_string() })
            }
        }
    }

    /// Permanently remove a menu item, returning the removed record
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete(&self, id: &str) -> ServiceResult<MenuItem> {
        let result = match self.store.find_by_id_and_delete(id).await {
            Ok(Some(item)) => Ok(item),
            Ok(None) => Err(ServiceError::MenuItemNotFound { id: id.to_string() }),
            Err(e) => Err(e.into()),
        };
        self.record("delete", &result);

        if result.is_ok() {
            crate::info_with_trace!("Menu item deleted");
        }
        result
    }

    fn record<T>(&self, operation: &str, result: &ServiceResult<T>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_menu_operation(operation, result.is_ok());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MenuItemId, RepositoryError, ValidationError};
    use crate::repositories::MenuItemStore;
    use async_trait::async_trait;
    use mockall::mock;
    use rust_decimal_macros::dec;
    use serde_json::json;

    mock! {
        TestMenuItemStore {}

        #[async_trait]
        impl MenuItemStore for TestMenuItemStore {
            async fn insert(&self, item: NewMenuItem) -> Result<MenuItem, RepositoryError>;
            async fn find_all(&self) -> Result<Vec<MenuItem>, RepositoryError>;
            async fn find_by_id_and_update(&self, id: &str, patch: MenuItemPatch) -> Result<Option<MenuItem>, RepositoryError>;
            async fn find_by_id_and_delete(&self, id: &str) -> Result<Option<MenuItem>, RepositoryError>;
        }
    }

    fn burger() -> MenuItem {
        MenuItem {
            id: MenuItemId::new("abc123"),
            name: "Burger".to_string(),
            description: Some("Beef".to_string()),
            price: dec!(8.5),
        }
    }

    fn create_request(body: serde_json::Value) -> CreateMenuItemRequest {
        serde_json::from_value(body).unwrap()
    }

    fn update_request(body: serde_json::Value) -> UpdateMenuItemRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn test_create_persists_validated_item() {
        let mut mock_store = MockTestMenuItemStore::new();
        mock_store
            .expect_insert()
            .withf(|item| {
                item.name == "Burger"
                    && item.description.as_deref() == Some("Beef")
                    && item.price == dec!(8.5)
            })
            .times(1)
            .returning(|item| Ok(MenuItem::from_new(MenuItemId::new("abc123"), item)));

        let service = MenuItemService::new(Arc::new(mock_store));
        let created = service
            .create(create_request(
                json!({"name": "Burger", "description": "Beef", "price": 8.5}),
            ))
            .await
            .unwrap();

        assert_eq!(created, burger());
    }

    #[tokio::test]
    async fn test_create_with_invalid_input_never_reaches_store() {
        let mut mock_store = MockTestMenuItemStore::new();
        mock_store.expect_insert().times(0);

        let service = MenuItemService::new(Arc::new(mock_store));

        let missing_price = service.create(create_request(json!({"name": "Soda"}))).await;
        let negative_price = service
            .create(create_request(json!({"name": "Soda", "price": -1})))
            .await;
        let empty_name = service
            .create(create_request(json!({"name": "", "price": 1})))
            .await;

        assert!(matches!(
            missing_price,
            Err(ServiceError::Validation(ValidationError::InvalidOrMissingPrice))
        ));
        assert!(matches!(
            negative_price,
            Err(ServiceError::Validation(ValidationError::InvalidOrMissingPrice))
        ));
        assert!(matches!(
            empty_name,
            Err(ServiceError::Validation(ValidationError::InvalidOrMissingName))
        ));
    }

    #[tokio::test]
    async fn test_create_surfaces_storage_error() {
        let mut mock_store = MockTestMenuItemStore::new();
        mock_store.expect_insert().times(1).returning(|_| {
            Err(RepositoryError::AwsSdk {
                message: "connection refused".to_string(),
            })
        });

        let service = MenuItemService::new(Arc::new(mock_store));
        let result = service
            .create(create_request(json!({"name": "Burger", "price": 8.5})))
            .await;

        assert!(matches!(result, Err(ServiceError::Storage { .. })));
    }

    #[tokio::test]
    async fn test_list_returns_store_contents() {
        let mut mock_store = MockTestMenuItemStore::new();
        mock_store
            .expect_find_all()
            .times(1)
            .returning(|| Ok(vec![burger()]));

        let service = MenuItemService::new(Arc::new(mock_store));

        assert_eq!(service.list().await.unwrap(), vec![burger()]);
    }

    #[tokio::test]
    async fn test_update_passes_patch_to_store() {
        let mut mock_store = MockTestMenuItemStore::new();
        mock_store
            .expect_find_by_id_and_update()
            .withf(|id, patch| {
                id == "abc123"
                    && *patch
                        == MenuItemPatch {
                            price: Some(dec!(9)),
                            ..Default::default()
                        }
            })
            .times(1)
            .returning(|_, patch| {
                let mut item = burger();
                item.apply(&patch);
                Ok(Some(item))
            });

        let service = MenuItemService::new(Arc::new(mock_store));
        let updated = service
            .update("abc123", update_request(json!({"price": 9})))
            .await
            .unwrap();

        assert_eq!(updated.price, dec!(9));
        assert_eq!(updated.name, "Burger");
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let mut mock_store = MockTestMenuItemStore::new();
        mock_store
            .expect_find_by_id_and_update()
            .times(1)
            .returning(|_, _| Ok(None));

        let service = MenuItemService::new(Arc::new(mock_store));
        let result = service
            .update("nonexistent", update_request(json!({"price": 1})))
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::MenuItemNotFound { ref id }) if id == "nonexistent"
        ));
    }

    #[tokio::test]
    async fn test_update_with_invalid_input_never_reaches_store() {
        let mut mock_store = MockTestMenuItemStore::new();
        mock_store.expect_find_by_id_and_update().times(0);

        let service = MenuItemService::new(Arc::new(mock_store));

        let negative = service
            .update("abc123", update_request(json!({"price": -5})))
            .await;
        let unknown_field = service
            .update("abc123", update_request(json!({"calories": 500})))
            .await;

        assert!(matches!(
            negative,
            Err(ServiceError::Validation(ValidationError::InvalidValue { ref field })) if field == "price"
        ));
        assert!(matches!(
            unknown_field,
            Err(ServiceError::Validation(ValidationError::UnrecognizedField { ref field })) if field == "calories"
        ));
    }

    #[tokio::test]
    async fn test_delete_twice_reports_not_found() {
        let mut mock_store = MockTestMenuItemStore::new();
        let mut deleted = false;
        mock_store
            .expect_find_by_id_and_delete()
            .withf(|id| id == "abc123")
            .times(2)
            .returning(move |_| {
                if deleted {
                    Ok(None)
                } else {
                    deleted = true;
                    Ok(Some(burger()))
                }
            });

        let service = MenuItemService::new(Arc::new(mock_store));

        assert_eq!(service.delete("abc123").await.unwrap(), burger());
        assert!(matches!(
            service.delete("abc123").await,
            Err(ServiceError::MenuItemNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_operations_are_counted() {
        let mut mock_store = MockTestMenuItemStore::new();
        mock_store.expect_find_all().returning(|| Ok(vec![]));
        mock_store
            .expect_find_by_id_and_delete()
            .returning(|_| Ok(None));

        let metrics = Arc::new(Metrics::new().unwrap());
        let service = MenuItemService::with_metrics(Arc::new(mock_store), metrics.clone());

        service.list().await.unwrap();
        let _ = service.delete("missing").await;

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("menu_operations_total{operation=\"list\",status=\"success\"} 1"));
        assert!(encoded.contains("menu_operations_total{operation=\"delete\",status=\"error\"} 1"));
    }
}
