//! Repository layer over the entities

pub mod call_log_repository;
pub mod group_repository;
pub mod service_repository;
pub mod tool_cache_repository;

pub use call_log_repository::CallLogRepository;
pub use group_repository::GroupRepository;
pub use service_repository::ServiceRepository;
pub use tool_cache_repository::ToolCacheRepository;
