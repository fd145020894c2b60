//! Tenant-scoped listing and export endpoints for systems, advisories and
//! packages.

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;
pub mod module;

pub use api::rest::identity::{AccountId, ACCOUNT_HEADER};
pub use config::InventoryConfig;
pub use module::Inventory;
