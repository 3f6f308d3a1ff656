pub mod admin;
pub mod error_code;
pub mod health;
pub mod helpers;
pub mod public;
pub mod routes;
pub mod types;

pub use error_code::ErrorCode;
pub use health::health_routes;
pub use routes::{RouteContext, api_routes};
pub use types::{ApiResponse, PageQuery};
