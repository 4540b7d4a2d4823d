pub mod health;
pub mod menu;
pub mod metrics;
pub mod middleware;

pub use health::*;
pub use menu::*;
pub use metrics::*;
pub use middleware::*;
