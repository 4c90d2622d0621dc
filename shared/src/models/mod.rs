//! Domain models for Stockroom

mod category;
mod movement;
mod stock;
mod user;

pub use category::*;
pub use movement::*;
pub use stock::*;
pub use user::*;
