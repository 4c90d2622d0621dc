//! Shared types and domain logic for Stockroom
//!
//! This crate contains the models, the movement ledger arithmetic and the
//! category tree aggregator shared between the backend and the browser
//! bindings (via WASM). Nothing in here performs I/O.

pub mod ledger;
pub mod models;
pub mod tree;
pub mod types;
pub mod validation;

pub use ledger::*;
pub use models::*;
pub use tree::*;
pub use types::*;
pub use validation::*;
