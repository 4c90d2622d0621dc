//! HTTP handlers

pub mod categories;
pub mod dashboard;
pub mod health;
pub mod stock;

pub use categories::*;
pub use dashboard::*;
pub use health::*;
pub use stock::*;
