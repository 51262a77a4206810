//! Resource resolution module

mod trie;

pub use trie::{ResourceTrie, WILDCARD_SEGMENT};
