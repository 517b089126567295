//! # Toolgate Storage
//!
//! Thin typed wrapper over the relational engine. Entities mirror the
//! persisted schema; repositories expose the operations the services
//! need, converting between rows and domain types at the boundary.
//! Collection-valued attributes (id lists, tool arrays, alias maps) are
//! stored as JSON text so the same code runs on SQLite, MySQL and
//! Postgres.

pub mod connection;
pub mod entities;
pub mod error;
pub mod filters;
pub mod migrations;
pub mod repositories;
pub mod testing;

pub use connection::DatabaseConnection;
pub use error::{StorageError, StorageResult};
pub use filters::{ListPage, ListQuery};
pub use repositories::{
    CallLogRepository, GroupRepository, ServiceRepository, ToolCacheRepository,
};
