//! Path trie for per-resource target resolution
//!
//! Maps request paths to the upstream target and TTL configured for the
//! deepest matching resource. Each node holds a shared, immutable
//! `TargetConfig`; a TTL override derives a new one for its subtree and for
//! any node created on the way to it, while existing nodes keep theirs.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Resource, TargetConfig};

/// Path segment matching any segment without a literal match
pub const WILDCARD_SEGMENT: &str = ":id";

#[derive(Debug)]
struct Node {
    children: HashMap<String, Node>,
    config: Arc<TargetConfig>,
}

impl Node {
    fn new(config: Arc<TargetConfig>) -> Self {
        Self {
            children: HashMap::new(),
            config,
        }
    }
}

/// Resource trie built once at startup
#[derive(Debug)]
pub struct ResourceTrie {
    default: Arc<TargetConfig>,
    root: HashMap<String, Node>,
}

fn segments(path: &str) -> std::str::Split<'_, char> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

impl ResourceTrie {
    /// Build a trie from the top-level resource definitions
    pub fn build(default: TargetConfig, resources: &[Resource]) -> Self {
        let default = Arc::new(default);
        let mut root = HashMap::new();

        for resource in resources {
            add_node(resource, &mut root, &default);
        }

        Self { default, root }
    }

    /// The top-level configuration used when nothing deeper matches
    pub fn default_config(&self) -> &Arc<TargetConfig> {
        &self.default
    }

    /// Resolve the configuration for a request path.
    ///
    /// Descends one segment at a time, preferring a literal child over the
    /// wildcard, and stops at the first segment with neither. Never fails:
    /// an unmatched path resolves to the default configuration.
    pub fn lookup(&self, path: &str) -> Arc<TargetConfig> {
        let mut config = &self.default;
        let mut tree = &self.root;

        for segment in segments(path) {
            let Some(node) = tree.get(segment).or_else(|| tree.get(WILDCARD_SEGMENT)) else {
                break;
            };

            config = &node.config;
            tree = &node.children;
        }

        config.clone()
    }
}

/// Insert a resource and its nested resources below `tree`.
///
/// Every node created on the way carries the resource's configuration: the
/// derived one if the resource overrides the TTL, `inherited` otherwise.
/// Existing nodes keep theirs, except the resource's own node, which takes
/// an override.
fn add_node(resource: &Resource, tree: &mut HashMap<String, Node>, inherited: &Arc<TargetConfig>) {
    let overridden = resource
        .ttl_override()
        .map(|ttl| Arc::new(inherited.with_ttl(ttl)));
    let config = overridden.as_ref().unwrap_or(inherited);

    let mut segments = segments(&resource.name).peekable();
    let mut current = tree;

    while let Some(segment) = segments.next() {
        let is_last = segments.peek().is_none();

        let node = current
            .entry(segment.to_string())
            .or_insert_with(|| Node::new(config.clone()));

        if is_last && overridden.is_some() {
            node.config = config.clone();
        }

        current = &mut node.children;
    }

    for child in &resource.resources {
        add_node(child, current, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Auth;

    fn default_config() -> TargetConfig {
        TargetConfig {
            target_scheme: "http".to_string(),
            target_host: "127.0.0.1:6666".to_string(),
            ttl: 60,
            auth: Auth {
                user: "flush".to_string(),
                password: "abc".to_string(),
            },
        }
    }

    #[test]
    fn test_wildcard_resource_ttl() {
        let trie = ResourceTrie::build(
            default_config(),
            &[
                Resource::new("/posts"),
                Resource::new("/posts/:id").with_ttl(10),
            ],
        );

        assert_eq!(trie.lookup("/posts/5").ttl, 10);
        assert_eq!(trie.lookup("/posts").ttl, 60);
        assert_eq!(trie.lookup("/unknown").ttl, 60);
    }

    #[test]
    fn test_literal_beats_wildcard() {
        let trie = ResourceTrie::build(
            default_config(),
            &[Resource::new("/posts").with_children(vec![
                Resource::new("/:id").with_ttl(10),
                Resource::new("/latest").with_ttl(5),
            ])],
        );

        assert_eq!(trie.lookup("/posts/latest").ttl, 5);
        assert_eq!(trie.lookup("/posts/42").ttl, 10);
    }

    #[test]
    fn test_nested_resources_inherit_override() {
        let trie = ResourceTrie::build(
            default_config(),
            &[Resource::new("/users/:id").with_ttl(30).with_children(vec![
                Resource::new("/posts"),
                Resource::new("/avatar").with_ttl(3600),
            ])],
        );

        assert_eq!(trie.lookup("/users/7").ttl, 30);
        assert_eq!(trie.lookup("/users/7/posts").ttl, 30);
        assert_eq!(trie.lookup("/users/7/avatar").ttl, 3600);
        // Created on the way to /users/:id, so it carries that override too
        assert_eq!(trie.lookup("/users").ttl, 30);
    }

    #[test]
    fn test_nodes_created_on_the_way_take_the_override() {
        let trie = ResourceTrie::build(default_config(), &[Resource::new("/posts/:id").with_ttl(10)]);

        assert_eq!(trie.lookup("/posts").ttl, 10);
        assert!(Arc::ptr_eq(&trie.lookup("/posts"), &trie.lookup("/posts/5")));
        assert_eq!(trie.lookup("/other").ttl, 60);
    }

    #[test]
    fn test_existing_intermediate_node_keeps_its_config() {
        let trie = ResourceTrie::build(
            default_config(),
            &[
                Resource::new("/posts"),
                Resource::new("/posts/:id/comments").with_ttl(5),
            ],
        );

        assert_eq!(trie.lookup("/posts").ttl, 60);
        assert_eq!(trie.lookup("/posts/5").ttl, 5);
        assert_eq!(trie.lookup("/posts/5/comments").ttl, 5);
    }

    #[test]
    fn test_lookup_stops_at_first_unmatched_segment() {
        let trie = ResourceTrie::build(
            default_config(),
            &[Resource::new("/posts/:id").with_ttl(10).with_children(vec![
                Resource::new("/comments").with_ttl(2),
            ])],
        );

        // "likes" has no child: resolution stays at /posts/:id
        assert_eq!(trie.lookup("/posts/5/likes").ttl, 10);
        assert_eq!(trie.lookup("/posts/5/likes/comments").ttl, 10);
        assert_eq!(trie.lookup("/posts/5/comments").ttl, 2);
    }

    #[test]
    fn test_later_definition_overrides_existing_node() {
        let trie = ResourceTrie::build(
            default_config(),
            &[
                Resource::new("/posts/:id").with_ttl(10),
                Resource::new("/posts").with_ttl(20),
                Resource::new("/posts"),
            ],
        );

        assert_eq!(trie.lookup("/posts").ttl, 20);
        assert_eq!(trie.lookup("/posts/1").ttl, 10);
    }

    #[test]
    fn test_configs_are_shared_not_copied() {
        let trie = ResourceTrie::build(
            default_config(),
            &[
                Resource::new("/a"),
                Resource::new("/b").with_ttl(10).with_children(vec![Resource::new("/c")]),
            ],
        );

        assert!(Arc::ptr_eq(&trie.lookup("/a"), trie.default_config()));
        assert!(Arc::ptr_eq(&trie.lookup("/b"), &trie.lookup("/b/c")));
        assert!(!Arc::ptr_eq(&trie.lookup("/b"), trie.default_config()));
        assert_eq!(trie.default_config().ttl, 60);
    }

    #[test]
    fn test_override_keeps_target_and_auth() {
        let trie = ResourceTrie::build(default_config(), &[Resource::new("/posts/:id").with_ttl(10)]);

        let config = trie.lookup("/posts/5");
        assert_eq!(config.target_host, "127.0.0.1:6666");
        assert_eq!(config.target_scheme, "http");
        assert_eq!(config.auth.user, "flush");
    }
}
