// Re-export all model types
pub use self::errors::*;
pub use self::menu_item::*;
pub use self::validation::*;

mod errors;
mod menu_item;
mod validation;
