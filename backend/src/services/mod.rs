//! Business logic services for the Stockroom server

pub mod catalog;
pub mod dashboard;
pub mod ledger;
pub mod rules;

pub use catalog::CatalogService;
pub use dashboard::DashboardService;
pub use ledger::InventoryLedger;
