pub mod auth;
pub mod json;

pub use auth::{CurrentUser, ensure_authorized, user_from_headers};
pub use json::{ApiJson, ApiPath, ApiQuery};
