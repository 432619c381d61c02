//! Edge types for both graph levels.
//!
//! [`MultiEdge`] connects two ports inside a state; its memlet (the data it
//! moves) is derived from the endpoint connectors. [`InterstateEdge`]
//! connects two states of an SDFG.

use serde::{Deserialize, Serialize};

use crate::connector::Connector;
use crate::id::{ScopeId, StateId};
use crate::types::{subset_volume, Location, Range};

// ---------------------------------------------------------------------------
// Dataflow edges
// ---------------------------------------------------------------------------

/// A directed edge between two connectors, owned by one scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiEdge {
    pub src: Connector,
    pub dst: Connector,
    pub scope: ScopeId,
    /// Ordering-only edge; carries no data.
    pub dependency: bool,
    pub location: Location,
}

impl MultiEdge {
    pub fn new(src: Connector, dst: Connector, location: Location) -> Self {
        MultiEdge {
            src,
            dst,
            scope: ScopeId::STATE,
            dependency: false,
            location,
        }
    }

    /// An ordering-only edge.
    pub fn dependency(src: Connector, dst: Connector, location: Location) -> Self {
        MultiEdge {
            dependency: true,
            ..MultiEdge::new(src, dst, location)
        }
    }

    /// Container moved along this edge: the source binding, else the
    /// destination binding. Dependency edges move nothing.
    pub fn data(&self) -> Option<&str> {
        if self.dependency {
            return None;
        }
        self.src.data.as_deref().or(self.dst.data.as_deref())
    }

    /// Subset read at the source.
    pub fn src_subset(&self) -> &[Range] {
        &self.src.ranges
    }

    /// Subset written at the destination.
    pub fn dst_subset(&self) -> &[Range] {
        &self.dst.ranges
    }

    /// Number of elements moved.
    pub fn volume(&self) -> String {
        if self.dependency {
            return "1".to_string();
        }
        if !self.src.ranges.is_empty() {
            subset_volume(&self.src.ranges)
        } else {
            subset_volume(&self.dst.ranges)
        }
    }
}

// ---------------------------------------------------------------------------
// Interstate edges
// ---------------------------------------------------------------------------

/// A symbol assignment performed when an interstate edge is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub key: String,
    pub value: String,
}

impl Assignment {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Assignment {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parses `"key: value"`, splitting at the first `:` and trimming both
    /// sides. Returns `None` without a `:` or with an empty key.
    pub fn parse(text: &str) -> Option<Assignment> {
        let (key, value) = text.split_once(':')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Assignment::new(key, value.trim()))
    }
}

/// A guarded control edge between two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterstateEdge {
    pub src: StateId,
    pub dst: StateId,
    /// Python guard expression.
    pub condition: String,
    pub assignments: Vec<Assignment>,
    pub location: Location,
}

impl InterstateEdge {
    /// An unconditional edge.
    pub fn new(src: StateId, dst: StateId, location: Location) -> Self {
        InterstateEdge {
            src,
            dst,
            condition: "1".to_string(),
            assignments: Vec::new(),
            location,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    pub fn add_assignment(&mut self, assignment: Assignment) {
        self.assignments.push(assignment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;

    #[test]
    fn memlet_data_prefers_source() {
        let e = MultiEdge::new(
            Connector::null(NodeId(0)).with_data("A"),
            Connector::named(NodeId(1), "a").with_data("B"),
            Location::default(),
        );
        assert_eq!(e.data(), Some("A"));

        let e = MultiEdge::new(
            Connector::named(NodeId(1), "__out0"),
            Connector::null(NodeId(2)).with_data("tmp_0"),
            Location::default(),
        );
        assert_eq!(e.data(), Some("tmp_0"));
    }

    #[test]
    fn dependency_edges_carry_no_data() {
        let e = MultiEdge::dependency(
            Connector::null(NodeId(0)).with_data("A"),
            Connector::null(NodeId(1)),
            Location::default(),
        );
        assert_eq!(e.data(), None);
        assert_eq!(e.volume(), "1");
    }

    #[test]
    fn volume_from_subset() {
        let e = MultiEdge::new(
            Connector::null(NodeId(0))
                .with_data("A")
                .with_ranges(vec![Range::new("0", "9", "1"), Range::new("0", "1", "1")]),
            Connector::named(NodeId(1), "IN_A"),
            Location::default(),
        );
        assert_eq!(e.volume(), "20");
    }

    #[test]
    fn assignment_parse_splits_at_first_colon() {
        assert_eq!(
            Assignment::parse(" i : i + 1 "),
            Some(Assignment::new("i", "i + 1"))
        );
        assert_eq!(
            Assignment::parse("x: a ? b : c"),
            Some(Assignment::new("x", "a ? b : c"))
        );
        assert_eq!(Assignment::parse("no colon"), None);
        assert_eq!(Assignment::parse(": 3"), None);
    }

    #[test]
    fn interstate_edge_defaults_to_true_guard() {
        let e = InterstateEdge::new(StateId(0), StateId(1), Location::default());
        assert_eq!(e.condition, "1");
        assert!(e.assignments.is_empty());
    }
}
