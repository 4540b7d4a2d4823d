// Repositories module - data access layer

pub mod memory_store;
pub mod menu_item_store;
pub mod metered_store;
pub mod table_manager;

pub use memory_store::InMemoryMenuItemStore;
pub use menu_item_store::{DynamoDbMenuItemStore, MenuItemStore};
pub use metered_store::MeteredMenuItemStore;
pub use table_manager::TableManager;

use crate::models::{RepositoryError, Validate};

/// Re-check record invariants right before a write reaches storage
pub(crate) fn enforce_invariants<T: Validate>(record: &T) -> Result<(), RepositoryError> {
    record
        .validate()
        .map_err(|e| RepositoryError::ConstraintViolation {
            message: e.to_string(),
        })
}
