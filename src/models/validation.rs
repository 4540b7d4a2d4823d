use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use super::{
    CreateMenuItemRequest, MenuItem, MenuItemPatch, NewMenuItem, UpdateMenuItemRequest,
    ValidationError, ValidationResult,
};

/// Trait for checking the stored-record invariants of a model
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

impl Validate for NewMenuItem {
    fn validate(&self) -> ValidationResult<()> {
        validate_menu_item_name(&self.name)?;
        validate_menu_item_price(&self.price)?;
        Ok(())
    }
}

impl Validate for MenuItem {
    fn validate(&self) -> ValidationResult<()> {
        validate_menu_item_name(&self.name)?;
        validate_menu_item_price(&self.price)?;
        Ok(())
    }
}

impl Validate for MenuItemPatch {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_menu_item_name(name).map_err(|_| invalid_value("name"))?;
        }
        if let Some(price) = &self.price {
            validate_menu_item_price(price).map_err(|_| invalid_value("price"))?;
        }
        Ok(())
    }
}

impl TryFrom<CreateMenuItemRequest> for NewMenuItem {
    type Error = ValidationError;

    fn try_from(request: CreateMenuItemRequest) -> ValidationResult<Self> {
        let name = request
            .name
            .as_ref()
            .and_then(text_value)
            .ok_or(ValidationError::InvalidOrMissingName)?;
        validate_menu_item_name(&name)?;

        let price = match request.price.as_ref().map(price_from_json) {
            Some(Ok(price)) => price,
            Some(Err(PriceParseError::OutOfRange)) => {
                return Err(price_out_of_range(ValidationError::InvalidOrMissingPrice))
            }
            Some(Err(_)) | None => return Err(ValidationError::InvalidOrMissingPrice),
        };
        validate_menu_item_price(&price)?;

        let description = match request.description {
            None | Some(Value::Null) => None,
            Some(value) => Some(text_value(&value).ok_or_else(|| invalid_value("description"))?),
        };

        Ok(NewMenuItem {
            name,
            description,
            price,
        })
    }
}

impl TryFrom<UpdateMenuItemRequest> for MenuItemPatch {
    type Error = ValidationError;

    fn try_from(request: UpdateMenuItemRequest) -> ValidationResult<Self> {
        // Unknown keys are rejected rather than silently dropped
        if let Some(field) = request.unrecognized.keys().min() {
            return Err(ValidationError::UnrecognizedField {
                field: field.clone(),
            });
        }

        let price = request
            .price
            .map(|value| {
                price_from_json(&value).map_err(|e| match e {
                    PriceParseError::OutOfRange => price_out_of_range(invalid_value("price")),
                    _ => invalid_value("price"),
                })
            })
            .transpose()?;

        let name = request
            .name
            .map(|value| text_value(&value).ok_or_else(|| invalid_value("name")))
            .transpose()?;

        let description = match request.description {
            None => None,
            Some(Value::Null) => Some(None),
            Some(value) => Some(Some(
                text_value(&value).ok_or_else(|| invalid_value("description"))?,
            )),
        };

        let patch = MenuItemPatch {
            name,
            description,
            price,
        };
        patch.validate()?;
        Ok(patch)
    }
}

/// Validate menu item name
pub fn validate_menu_item_name(name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::InvalidOrMissingName);
    }

    Ok(())
}

/// Validate menu item price
pub fn validate_menu_item_price(price: &Decimal) -> ValidationResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::InvalidOrMissingPrice);
    }

    Ok(())
}

/// Reasons a JSON value is not a usable price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceParseError {
    NotANumber,
    Negative,
    OutOfRange,
}

/// Read a JSON number as a decimal. The number's text is used when it fits
/// exactly; finer fractions are rounded to the 28 digits a decimal holds.
/// Strings and booleans are not prices.
pub fn price_from_json(value: &Value) -> Result<Decimal, PriceParseError> {
    let Value::Number(number) = value else {
        return Err(PriceParseError::NotANumber);
    };

    let text = number.to_string();
    if let Ok(price) = Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
        return Ok(price);
    }

    let approx = number.as_f64().ok_or(PriceParseError::NotANumber)?;
    if approx.is_sign_negative() {
        return Err(PriceParseError::Negative);
    }
    match Decimal::from_f64(approx) {
        Some(price) => Ok(price),
        // Below the smallest representable step
        None if approx < 1.0 => Ok(Decimal::ZERO),
        None => Err(PriceParseError::OutOfRange),
    }
}

fn price_out_of_range(rejected: ValidationError) -> ValidationError {
    ValidationError::PriceOutOfRange {
        summary: rejected.to_string(),
    }
}

fn text_value(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

fn invalid_value(field: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
    }
}
