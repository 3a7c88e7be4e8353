pub mod auth;

pub use auth::{require_api_key, require_jwt};
