//! Request middleware

pub mod auth;

pub use auth::{auth_middleware, decode_jwt, AuthUser, Claims, CurrentUser};
