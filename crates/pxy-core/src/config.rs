//! Shared configuration records
//!
//! The binary owns file loading; these are the parsed records the core
//! consumes. `TargetConfig` values are built once at startup and shared
//! read-only between trie nodes.

use serde::{Deserialize, Serialize};

/// Basic-auth credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

/// A configured resource, possibly with nested resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Path relative to the parent resource, e.g. `/posts/:id`
    pub name: String,
    /// TTL override in seconds. Absent or zero inherits the parent TTL
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl: None,
            resources: Vec::new(),
        }
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_children(mut self, resources: Vec<Resource>) -> Self {
        self.resources = resources;
        self
    }

    /// The TTL this resource sets for its subtree, if any
    pub fn ttl_override(&self) -> Option<i64> {
        self.ttl.filter(|ttl| *ttl != 0)
    }
}

/// Where and for how long a resolved path is proxied and cached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub target_scheme: String,
    pub target_host: String,
    /// Seconds a cached response stays fresh
    pub ttl: i64,
    pub auth: Auth,
}

impl TargetConfig {
    /// Copy of this configuration with the TTL replaced
    pub fn with_ttl(&self, ttl: i64) -> Self {
        Self {
            ttl,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_deserializes_nested_definitions() {
        let json = r#"{
            "name": "/posts",
            "resources": [
                { "name": "/:id", "ttl": 10 },
                { "name": "/latest", "ttl": 0, "resources": [] }
            ]
        }"#;

        let resource: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.name, "/posts");
        assert_eq!(resource.ttl_override(), None);
        assert_eq!(resource.resources.len(), 2);
        assert_eq!(resource.resources[0].ttl_override(), Some(10));
        // Zero means "inherit", same as absent
        assert_eq!(resource.resources[1].ttl_override(), None);
    }

    #[test]
    fn test_with_ttl_leaves_original_untouched() {
        let base = TargetConfig {
            target_scheme: "http".to_string(),
            target_host: "127.0.0.1:6666".to_string(),
            ttl: 60,
            auth: Auth {
                user: "flush".to_string(),
                password: "abc".to_string(),
            },
        };

        let derived = base.with_ttl(10);
        assert_eq!(base.ttl, 60);
        assert_eq!(derived.ttl, 10);
        assert_eq!(derived.target_host, base.target_host);
        assert_eq!(derived.auth, base.auth);
    }
}
