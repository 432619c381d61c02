//! A state of an SDFG and the dataflow multigraph it owns.
//!
//! All nodes of a state, including those nested inside map and consume
//! scopes, live in a single flat `StableGraph`. Scope membership is recorded
//! on each node and edge as a [`ScopeId`], and the scope tree itself is a
//! small arena (`scopes`) indexed by that ID. The scope resolution engine
//! operating on this graph lives in [`crate::scope`].

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::Directed;
use serde::{Deserialize, Serialize};

use crate::connector::Connector;
use crate::edge::MultiEdge;
use crate::error::GraphError;
use crate::id::{EdgeId, NodeId, ScopeId};
use crate::node::ConnectorNode;
use crate::scope::Scope;
use crate::types::Location;

/// One state of an SDFG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub label: String,
    pub location: Location,
    graph: StableGraph<ConnectorNode, MultiEdge, Directed, u32>,
    pub(crate) scopes: Vec<Scope>,
}

impl State {
    /// Creates an empty state holding only its top-level scope.
    pub fn new(label: &str, location: Location) -> Self {
        State {
            label: crate::id::sanitize_name(label),
            scopes: vec![Scope::state(location.clone())],
            location,
            graph: StableGraph::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Inserts a node into `scope`. The node's scope is fixed here.
    pub fn add_node(
        &mut self,
        scope: ScopeId,
        mut node: ConnectorNode,
    ) -> Result<NodeId, GraphError> {
        self.scope(scope)?;
        node.scope = scope;
        let idx = self.graph.add_node(node);
        Ok(NodeId::from(idx))
    }

    pub fn node(&self, id: NodeId) -> Result<&ConnectorNode, GraphError> {
        let idx: NodeIndex<u32> = id.into();
        self.graph
            .node_weight(idx)
            .ok_or(GraphError::NodeNotFound { id })
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut ConnectorNode, GraphError> {
        let idx: NodeIndex<u32> = id.into();
        self.graph
            .node_weight_mut(idx)
            .ok_or(GraphError::NodeNotFound { id })
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ConnectorNode)> {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx).map(|n| (NodeId::from(idx), n)))
    }

    /// Nodes inserted directly into `scope`.
    pub fn nodes_in(&self, scope: ScopeId) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, n)| n.scope == scope)
            .map(|(id, _)| id)
            .collect()
    }

    /// Adds an input port described by `connector` to its owning node.
    pub fn add_in_connector(&mut self, connector: &Connector) -> Result<(), GraphError> {
        let node = connector.node;
        self.node_mut(node)?.add_in_connector(node, connector.def())
    }

    /// Adds an output port described by `connector` to its owning node.
    pub fn add_out_connector(&mut self, connector: &Connector) -> Result<(), GraphError> {
        let node = connector.node;
        self.node_mut(node)?.add_out_connector(node, connector.def())
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    /// Inserts an edge into `scope`. Both endpoint nodes must exist.
    pub fn add_edge(&mut self, scope: ScopeId, mut edge: MultiEdge) -> Result<EdgeId, GraphError> {
        self.scope(scope)?;
        let from = edge.src.node;
        let to = edge.dst.node;
        self.node(from)?;
        self.node(to)?;

        edge.scope = scope;
        let idx = self.graph.add_edge(from.into(), to.into(), edge);
        Ok(EdgeId::from(idx))
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &MultiEdge)> {
        self.graph
            .edge_indices()
            .filter_map(|idx| self.graph.edge_weight(idx).map(|e| (EdgeId::from(idx), e)))
    }

    /// Edges owned by `scope`.
    pub fn edges_in(&self, scope: ScopeId) -> impl Iterator<Item = &MultiEdge> {
        self.edges()
            .map(|(_, e)| e)
            .filter(move |e| e.scope == scope)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    pub fn scope(&self, id: ScopeId) -> Result<&Scope, GraphError> {
        self.scopes
            .get(id.0 as usize)
            .ok_or(GraphError::ScopeNotFound { id })
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> Result<&mut Scope, GraphError> {
        self.scopes
            .get_mut(id.0 as usize)
            .ok_or(GraphError::ScopeNotFound { id })
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_get_sequential_ids_and_fixed_scope() {
        let mut state = State::new("s0", Location::default());
        let a = state
            .add_node(ScopeId::STATE, ConnectorNode::access("A", false, Location::default()))
            .unwrap();
        let b = state
            .add_node(ScopeId::STATE, ConnectorNode::access("B", false, Location::default()))
            .unwrap();
        assert_eq!(a, NodeId(0));
        assert_eq!(b, NodeId(1));
        assert_eq!(state.node(b).unwrap().scope, ScopeId::STATE);
        assert_eq!(state.nodes_in(ScopeId::STATE), vec![a, b]);
    }

    #[test]
    fn edge_requires_existing_nodes() {
        let mut state = State::new("s0", Location::default());
        let a = state
            .add_node(ScopeId::STATE, ConnectorNode::access("A", false, Location::default()))
            .unwrap();
        let err = state
            .add_edge(
                ScopeId::STATE,
                MultiEdge::new(Connector::null(a), Connector::null(NodeId(7)), Location::default()),
            )
            .unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound { id: NodeId(7) });
        assert_eq!(state.edge_count(), 0);
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let mut state = State::new("s0", Location::default());
        let err = state
            .add_node(ScopeId(3), ConnectorNode::access("A", false, Location::default()))
            .unwrap_err();
        assert_eq!(err, GraphError::ScopeNotFound { id: ScopeId(3) });
    }

    #[test]
    fn state_label_is_sanitized() {
        let state = State::new("loop.body", Location::default());
        assert_eq!(state.label, "loop_body");
        assert_eq!(state.scope_count(), 1);
    }
}
