use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::{enforce_invariants, MenuItemStore};
use crate::models::{MenuItem, MenuItemId, MenuItemPatch, NewMenuItem, RepositoryResult};

/// Process-local store kept in insertion order. Used for local runs
/// (`MENU_STORE_BACKEND=memory`) and tests.
#[derive(Default)]
pub struct InMemoryMenuItemStore {
    items: RwLock<Vec<MenuItem>>,
}

impl InMemoryMenuItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl MenuItemStore for InMemoryMenuItemStore {
    #[instrument(skip(self, item))]
    async fn insert(&self, item: NewMenuItem) -> RepositoryResult<MenuItem> {
        let menu_item = MenuItem::from_new(MenuItemId::generate(), item);
        enforce_invariants(&menu_item)?;

        self.items.write().await.push(menu_item.clone());
        debug!(id = %menu_item.id, "Menu item stored in memory");
        Ok(menu_item)
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> RepositoryResult<Vec<MenuItem>> {
        Ok(self.items.read().await.clone())
    }

    #[instrument(skip(self, patch), fields(id = %id))]
    async fn find_by_id_and_update(
        &self,
        id: &str,
        patch: MenuItemPatch,
    ) -> RepositoryResult<Option<MenuItem>> {
        let mut items = self.items.write().await;
        let Some(slot) = items.iter_mut().find(|item| item.id.as_str() == id) else {
            return Ok(None);
        };

        let mut updated = slot.clone();
        updated.apply(&patch);
        enforce_invariants(&updated)?;

        *slot = updated.clone();
        Ok(Some(updated))
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn find_by_id_and_delete(&self, id: &str) -> RepositoryResult<Option<MenuItem>> {
        let mut items = self.items.write().await;
        let position = items.iter().position(|item| item.id.as_str() == id);
        Ok(position.map(|index| items.remove(index)))
    }
}
