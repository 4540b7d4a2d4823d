use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of a stored menu item. Only store adapters create one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuItemId(String);

impl MenuItemId {
    /// Wrap an identifier read back from storage
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Allocate a fresh identifier for an insert
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MenuItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MenuItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Core menu item model, as persisted and returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// A validated menu item that has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewMenuItem {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
}

/// A validated partial update. `description: Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
}

/// Raw create payload. Fields keep their JSON shape until validated so that
/// a string price or a numeric name is reported instead of coerced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMenuItemRequest {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
}

/// Raw partial-update payload. A field that is present with `null` is
/// `Some(Value::Null)`; an absent field is `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMenuItemRequest {
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Value>,
    #[serde(flatten)]
    pub unrecognized: Map<String, Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl MenuItem {
    /// Build the stored form of a validated item under a store-assigned id
    pub fn from_new(id: MenuItemId, item: NewMenuItem) -> Self {
        Self {
            id,
            name: item.name,
            description: item.description,
            price: item.price,
        }
    }

    /// Apply a partial update, leaving absent fields untouched
    pub fn apply(&mut self, patch: &MenuItemPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
    }
}

impl MenuItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.price.is_none()
    }
}
