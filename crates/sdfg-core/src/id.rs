//! Stable ID newtypes for graph entities, plus the name service.
//!
//! All IDs are distinct newtype wrappers over `u32`, so a `NodeId` cannot be
//! accidentally used where a `StateId` is expected. Node and edge IDs are
//! sequential per state and map one-to-one onto petgraph indices.
//!
//! [`NameService`] hands out globally unique numeric IDs (used for
//! `sdfg_list_id`) and collision-free, sanitized names for generated
//! containers and nodes (`tmp_3`, `map_7`, ...).

use std::collections::HashSet;
use std::fmt;

use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

/// Node identifier inside one state's dataflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Edge identifier inside one state's dataflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

/// State identity within an SDFG. Equal to the state's emitted `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateId(pub u32);

/// Scope identity within a state. `ScopeId::STATE` is the state itself;
/// every map or consume region opened in the state gets the next ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The top-level scope of every state.
    pub const STATE: ScopeId = ScopeId(0);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Bridge between the ID newtypes and petgraph's indices.

impl From<NodeIndex<u32>> for NodeId {
    fn from(idx: NodeIndex<u32>) -> Self {
        NodeId(idx.index() as u32)
    }
}

impl From<NodeId> for NodeIndex<u32> {
    fn from(id: NodeId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

impl From<EdgeIndex<u32>> for EdgeId {
    fn from(idx: EdgeIndex<u32>) -> Self {
        EdgeId(idx.index() as u32)
    }
}

impl From<EdgeId> for EdgeIndex<u32> {
    fn from(id: EdgeId) -> Self {
        EdgeIndex::new(id.0 as usize)
    }
}

/// Replaces every character that is not ASCII alphanumeric or `_` with `_`,
/// and prefixes names that would start with a digit.
///
/// `%0` becomes `_0`, `arg#1` becomes `arg_1`, the empty string becomes `_`.
pub fn sanitize_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    match out.chars().next() {
        None => out.push('_'),
        Some(c) if c.is_ascii_digit() => out.insert(0, '_'),
        _ => {}
    }

    out
}

/// Generator for unique numeric IDs and collision-free names.
///
/// One service is owned by each translation, which keeps the output
/// deterministic for a given input.
#[derive(Debug, Clone, Default)]
pub struct NameService {
    next_id: u32,
    used: HashSet<String>,
}

impl NameService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unique numeric ID.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Marks a user-provided name as taken so generated names never collide
    /// with it. Returns `false` if the name was already reserved.
    pub fn reserve(&mut self, name: &str) -> bool {
        self.used.insert(sanitize_name(name))
    }

    /// Generates a fresh name of the form `<prefix>_<n>`.
    pub fn generate_name(&mut self, prefix: &str) -> String {
        let prefix = sanitize_name(prefix);
        loop {
            let candidate = format!("{}_{}", prefix, self.next_id());
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn node_id_to_node_index_roundtrip() {
        let idx = NodeIndex::<u32>::new(42);
        let node_id = NodeId::from(idx);
        assert_eq!(node_id.0, 42);

        let back: NodeIndex<u32> = node_id.into();
        assert_eq!(back.index(), 42);
    }

    #[test]
    fn id_display() {
        assert_eq!(format!("{}", NodeId(7)), "7");
        assert_eq!(format!("{}", StateId(2)), "2");
        assert_eq!(format!("{}", ScopeId::STATE), "0");
    }

    #[test]
    fn sanitize_replaces_value_sigils() {
        assert_eq!(sanitize_name("%0"), "_0");
        assert_eq!(sanitize_name("arg#1"), "arg_1");
        assert_eq!(sanitize_name("A"), "A");
        assert_eq!(sanitize_name("3d"), "_3d");
        assert_eq!(sanitize_name(""), "_");
    }

    #[test]
    fn generated_names_are_unique() {
        let mut names = NameService::new();
        let a = names.generate_name("tmp");
        let b = names.generate_name("tmp");
        assert_ne!(a, b);
        assert!(a.starts_with("tmp_"));
    }

    #[test]
    fn generated_names_skip_reserved() {
        let mut names = NameService::new();
        assert!(names.reserve("tmp_0"));
        assert!(!names.reserve("tmp_0"));
        assert_eq!(names.generate_name("tmp"), "tmp_1");
    }

    #[test]
    fn numeric_ids_are_sequential() {
        let mut names = NameService::new();
        assert_eq!(names.next_id(), 0);
        assert_eq!(names.next_id(), 1);
    }

    proptest! {
        #[test]
        fn sanitized_names_are_identifiers(name in ".{0,24}") {
            let clean = sanitize_name(&name);
            prop_assert!(!clean.is_empty());
            prop_assert!(clean.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            prop_assert!(!clean.chars().next().unwrap().is_ascii_digit());
        }

        #[test]
        fn sanitize_is_idempotent(name in ".{0,24}") {
            let once = sanitize_name(&name);
            prop_assert_eq!(sanitize_name(&once), once.clone());
        }
    }
}
