//! Service groups, weights, and tool aliases

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DEFAULT_SERVICE_WEIGHT;

/// Alias entry in the extended shape: a canonical tool name maps to its
/// per-service spellings plus an optional user-provided description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolAliasEntry {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Map from canonical tool name to its alias entry.
///
/// Two stored shapes exist: the extended
/// `{"canonical":{"aliases":[...],"description":"..."}}` and the legacy
/// `{"canonical":["alias",...]}`. Reads accept both; writes always emit
/// the extended shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolAliasMap(pub HashMap<String, ToolAliasEntry>);

impl ToolAliasMap {
    /// Decode stored alias JSON. The extended shape is tried first; if no
    /// decoded entry carries aliases or a description, the text is
    /// re-decoded as the legacy shape and converted. Malformed or empty
    /// text yields an empty map.
    pub fn from_json(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::default();
        }
        let extended = serde_json::from_str::<HashMap<String, ToolAliasEntry>>(text).ok();
        if let Some(map) = &extended {
            let populated = map
                .values()
                .any(|e| !e.aliases.is_empty() || e.description.is_some());
            if populated || map.is_empty() {
                return Self(map.clone());
            }
            // Every entry decoded empty: the text may be the legacy shape.
            // Retry below, keeping the extended decode as the fallback so
            // canonical keys are never dropped.
        }
        if let Ok(legacy) = serde_json::from_str::<HashMap<String, Vec<String>>>(text) {
            let converted = legacy
                .into_iter()
                .map(|(canonical, aliases)| {
                    (
                        canonical,
                        ToolAliasEntry {
                            aliases,
                            description: None,
                        },
                    )
                })
                .collect();
            return Self(converted);
        }
        Self(extended.unwrap_or_default())
    }

    /// Encode in the extended shape
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    /// Resolve a tool name to its canonical form. A name that is neither a
    /// canonical key nor a listed alias resolves to itself.
    pub fn canonical_of(&self, name: &str) -> String {
        if self.0.contains_key(name) {
            return name.to_string();
        }
        for (canonical, entry) in &self.0 {
            if entry.aliases.iter().any(|a| a == name) {
                return canonical.clone();
            }
        }
        name.to_string()
    }

    /// All names a canonical tool may appear under across services: the
    /// canonical name itself plus every alias.
    pub fn expansion_of(&self, canonical: &str) -> Vec<String> {
        let mut names = vec![canonical.to_string()];
        if let Some(entry) = self.0.get(canonical) {
            for alias in &entry.aliases {
                if !names.iter().any(|n| n == alias) {
                    names.push(alias.clone());
                }
            }
        }
        names
    }

    /// User-supplied description for a canonical name, if any
    pub fn description_of(&self, canonical: &str) -> Option<&str> {
        self.0
            .get(canonical)
            .and_then(|e| e.description.as_deref())
            .filter(|d| !d.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A named collection of services sharing one aggregation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceGroup {
    pub id: i32,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub enabled: bool,

    /// Whether the aggregation endpoint is exposed
    #[serde(default)]
    pub aggregation_enabled: bool,

    /// Bearer credential for the aggregation endpoint
    #[serde(default)]
    pub access_token: String,

    /// Ordered member service ids, duplicates forbidden
    #[serde(default)]
    pub service_ids: Vec<i32>,

    /// Per-service selection weight, default 100, minimum 1
    #[serde(default)]
    pub weights: HashMap<i32, u32>,

    #[serde(default)]
    pub tool_aliases: ToolAliasMap,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceGroup {
    /// Effective selection weight of a member, clamped to ≥1
    pub fn weight_of(&self, service_id: i32) -> u32 {
        self.weights
            .get(&service_id)
            .copied()
            .unwrap_or(DEFAULT_SERVICE_WEIGHT)
            .max(1)
    }
}

/// Decode a stored `service_ids` JSON-text column; malformed text is
/// treated as an empty list.
pub fn service_ids_from_json(text: &str) -> Vec<i32> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(text).unwrap_or_default()
}

/// Encode a `service_ids` list for storage
pub fn service_ids_to_json(ids: &[i32]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_shape_round_trip() {
        let text = r#"{"search":{"aliases":["web_search_exa","exa_search"],"description":"Web search"}}"#;
        let map = ToolAliasMap::from_json(text);
        assert_eq!(map.canonical_of("web_search_exa"), "search");
        assert_eq!(map.canonical_of("search"), "search");
        assert_eq!(map.description_of("search"), Some("Web search"));

        let reserialized = ToolAliasMap::from_json(&map.to_json());
        assert_eq!(map, reserialized);
    }

    #[test]
    fn test_legacy_shape_is_converted() {
        let text = r#"{"search":["web_search_exa","exa_search"]}"#;
        let map = ToolAliasMap::from_json(text);
        assert_eq!(map.canonical_of("exa_search"), "search");
        assert_eq!(map.description_of("search"), None);
        // The rewrite emits the extended shape
        assert!(map.to_json().contains("aliases"));
    }

    #[test]
    fn test_unknown_name_resolves_to_itself() {
        let map = ToolAliasMap::from_json(r#"{"search":["s"]}"#);
        assert_eq!(map.canonical_of("fetch"), "fetch");
        assert_eq!(map.expansion_of("fetch"), vec!["fetch".to_string()]);
    }

    #[test]
    fn test_expansion_includes_canonical_and_aliases() {
        let map = ToolAliasMap::from_json(r#"{"search":["a","b"]}"#);
        let names = map.expansion_of("search");
        assert_eq!(names, vec!["search", "a", "b"]);
    }

    #[test]
    fn test_malformed_alias_json_is_empty() {
        assert!(ToolAliasMap::from_json("not json").is_empty());
        assert!(ToolAliasMap::from_json("").is_empty());
    }

    #[test]
    fn test_weight_default_and_floor() {
        let mut group = ServiceGroup {
            id: 1,
            name: "g".into(),
            description: String::new(),
            enabled: true,
            aggregation_enabled: true,
            access_token: String::new(),
            service_ids: vec![1, 2],
            weights: HashMap::new(),
            tool_aliases: ToolAliasMap::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(group.weight_of(1), 100);
        group.weights.insert(1, 0);
        assert_eq!(group.weight_of(1), 1);
        group.weights.insert(2, 250);
        assert_eq!(group.weight_of(2), 250);
    }

    #[test]
    fn test_service_ids_round_trip() {
        let ids = vec![3, 1, 2];
        assert_eq!(service_ids_from_json(&service_ids_to_json(&ids)), ids);
        assert!(service_ids_from_json("garbage").is_empty());
    }
}
