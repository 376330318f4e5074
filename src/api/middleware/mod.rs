pub mod auth;

pub use auth::{ApiKeyAuth, AuthUser, Role};
