//! # Toolgate Registry
//!
//! Administrative services over the storage layer: service CRUD with
//! duplicate-name auto-renaming and best-effort discovery on create,
//! group CRUD with weight and alias management, access-token lifecycle,
//! service testing, and Claude-Desktop-style MCP-JSON import with a
//! bounded worker pool. Short-lived list caches absorb repeated admin
//! reads; every write invalidates them.

pub mod group;
pub mod import;
pub mod naming;
pub mod service;
pub mod token;

pub use group::{GroupRegistry, NewGroup, UpdateGroup};
pub use import::{ImportOutcome, ImportReport, McpJsonImporter};
pub use naming::{sanitize_import_name, unique_service_name};
pub use service::{NewService, ServiceRegistry, UpdateService};
pub use token::mint_access_token;
