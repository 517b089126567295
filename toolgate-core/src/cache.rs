//! Cached discovery payloads

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::ToolDefinition;

/// Default soft expiry: stale-but-usable after 30 minutes
pub const DEFAULT_SOFT_TTL_SECS: i64 = 30 * 60;

/// Default hard expiry: treated as absent after 24 hours
pub const DEFAULT_HARD_TTL_SECS: i64 = 24 * 60 * 60;

/// One service's discovered tools plus server metadata, as held in both
/// cache tiers. Freshness is monotone: past `hard_expiry` the entry is
/// absent even if a tier still stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedServiceTools {
    pub service_id: i32,
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub server_version: String,
    #[serde(default)]
    pub server_description: String,
    pub cached_at: DateTime<Utc>,
    pub soft_expiry: DateTime<Utc>,
    pub hard_expiry: DateTime<Utc>,
}

impl CachedServiceTools {
    /// Build an entry freshly cached at `now` with the default expiries
    pub fn new(service_id: i32, tools: Vec<ToolDefinition>, now: DateTime<Utc>) -> Self {
        Self {
            service_id,
            tools,
            server_name: String::new(),
            server_version: String::new(),
            server_description: String::new(),
            cached_at: now,
            soft_expiry: now + Duration::seconds(DEFAULT_SOFT_TTL_SECS),
            hard_expiry: now + Duration::seconds(DEFAULT_HARD_TTL_SECS),
        }
    }

    /// Past the soft expiry but still usable
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now >= self.soft_expiry
    }

    /// Past the hard expiry: must be refetched synchronously
    pub fn is_hard_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.hard_expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_windows() {
        let now = Utc::now();
        let entry = CachedServiceTools::new(1, vec![], now);
        assert!(!entry.is_stale(now));
        assert!(entry.is_stale(now + Duration::seconds(DEFAULT_SOFT_TTL_SECS)));
        assert!(!entry.is_hard_expired(now + Duration::seconds(DEFAULT_SOFT_TTL_SECS)));
        assert!(entry.is_hard_expired(now + Duration::seconds(DEFAULT_HARD_TTL_SECS)));
    }
}
