//! Core error types for sdfg-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! structural and reference failures the graph model can detect on its own.
//! Location context is attached by the translation layer.

use thiserror::Error;

use crate::id::{NodeId, ScopeId, StateId};

/// Errors produced while building or querying an SDFG.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A connector with the same name but a different data binding already
    /// exists on the node.
    #[error("conflicting duplicate connector '{name}' on node {node}")]
    ConflictingConnector { node: NodeId, name: String },

    /// A value has no producer anywhere up the scope chain and does not
    /// denote a data container.
    #[error("lookup of undefined value '{value}'")]
    UndefinedValue { value: String },

    /// A node index was not found in the state graph.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// A scope ID does not exist in the state.
    #[error("scope not found: ScopeId({id})", id = id.0)]
    ScopeNotFound { id: ScopeId },

    /// The operation needs a map or consume scope, but got the state scope.
    #[error("scope {id} is not an iteration scope")]
    NotAnIterationScope { id: ScopeId },

    /// An iteration scope was closed twice.
    #[error("scope {id} is already closed")]
    ScopeAlreadyClosed { id: ScopeId },

    /// A state name was not found in the SDFG.
    #[error("unknown state '{name}'")]
    UnknownState { name: String },

    /// A state ID was not found in the SDFG.
    #[error("state not found: StateId({id})", id = id.0)]
    StateNotFound { id: StateId },

    /// Two states share the same name.
    #[error("duplicate state '{name}'")]
    DuplicateState { name: String },

    /// Two data containers share the same name.
    #[error("duplicate data container '{name}'")]
    DuplicateArray { name: String },

    /// Two symbols share the same name.
    #[error("duplicate symbol '{name}'")]
    DuplicateSymbol { name: String },
}

impl GraphError {
    /// Returns `true` for failures caused by a dangling reference rather than
    /// a malformed structure.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            GraphError::UndefinedValue { .. }
                | GraphError::UnknownState { .. }
                | GraphError::StateNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_names() {
        let err = GraphError::ConflictingConnector {
            node: NodeId(3),
            name: "IN_a".into(),
        };
        assert_eq!(
            err.to_string(),
            "conflicting duplicate connector 'IN_a' on node 3"
        );
        assert_eq!(
            GraphError::NodeNotFound { id: NodeId(9) }.to_string(),
            "node not found: NodeId(9)"
        );
    }

    #[test]
    fn reference_classification() {
        assert!(GraphError::UndefinedValue { value: "x".into() }.is_reference());
        assert!(GraphError::UnknownState { name: "s".into() }.is_reference());
        assert!(!GraphError::DuplicateArray { name: "A".into() }.is_reference());
    }
}
