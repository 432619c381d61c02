//! Connectors: named ports on graph nodes.
//!
//! A [`Connector`] is a handle used while wiring: it names its owning node,
//! an optional port name, an optional bound data container and the subset of
//! that container it refers to. The node itself only records the port
//! definition ([`ConnectorDef`]); the subset travels with the handle and ends
//! up on the edges built from it.
//!
//! Connectors without a name are *null connectors*. They are never emitted
//! as ports and show up as `null` endpoints on edges.

use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::types::Range;

/// A port definition as stored on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorDef {
    pub name: Option<String>,
    pub data: Option<String>,
}

impl ConnectorDef {
    pub fn is_null(&self) -> bool {
        self.name.is_none()
    }
}

/// A port handle on a node.
///
/// Equality considers only the owning node and the port name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    pub node: NodeId,
    pub name: Option<String>,
    pub data: Option<String>,
    pub ranges: Vec<Range>,
}

impl PartialEq for Connector {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.name == other.name
    }
}

impl Eq for Connector {}

impl Connector {
    /// A named port with no bound data.
    pub fn named(node: NodeId, name: impl Into<String>) -> Self {
        Connector {
            node,
            name: Some(name.into()),
            data: None,
            ranges: Vec::new(),
        }
    }

    /// A null port.
    pub fn null(node: NodeId) -> Self {
        Connector {
            node,
            name: None,
            data: None,
            ranges: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Replaces the subset this connector refers to.
    pub fn with_ranges(mut self, ranges: Vec<Range>) -> Self {
        self.ranges = ranges;
        self
    }

    pub fn is_null(&self) -> bool {
        self.name.is_none()
    }

    /// `true` for the unbound null ports used only to keep scopes connected.
    pub fn is_structural(&self) -> bool {
        self.name.is_none() && self.data.is_none()
    }

    /// The definition recorded on the owning node.
    pub fn def(&self) -> ConnectorDef {
        ConnectorDef {
            name: self.name.clone(),
            data: self.data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_data_and_ranges() {
        let a = Connector::named(NodeId(1), "IN_a").with_data("A");
        let b = Connector::named(NodeId(1), "IN_a").with_ranges(vec![Range::index("i")]);
        assert_eq!(a, b);
        assert_ne!(a, Connector::named(NodeId(2), "IN_a"));
        assert_ne!(a, Connector::named(NodeId(1), "OUT_a"));
    }

    #[test]
    fn null_and_structural() {
        let bound = Connector::null(NodeId(0)).with_data("A");
        assert!(bound.is_null());
        assert!(!bound.is_structural());
        assert!(Connector::null(NodeId(0)).is_structural());
        assert!(!Connector::named(NodeId(0), "x").is_null());
    }

    #[test]
    fn def_drops_ranges() {
        let c = Connector::named(NodeId(4), "OUT_A")
            .with_data("A")
            .with_ranges(vec![Range::index("i")]);
        assert_eq!(
            c.def(),
            ConnectorDef {
                name: Some("OUT_A".into()),
                data: Some("A".into()),
            }
        );
    }
}
