pub mod auth;
pub mod response;
pub mod roles;

pub use auth::{api_key_auth_middleware, authenticate, extract_api_key};
pub use response::{ApiResponse, ApiResult};
pub use roles::require_roles;
