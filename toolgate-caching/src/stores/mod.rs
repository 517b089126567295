//! Cache store implementations

pub mod ttl;

pub use ttl::TtlCache;
