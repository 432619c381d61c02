//! Graph model and scope resolution engine for stateful dataflow
//! multigraphs (SDFGs).
//!
//! An [`Sdfg`] is a graph of [`State`]s connected by guarded
//! [`InterstateEdge`]s. Each state owns a dataflow multigraph of
//! [`ConnectorNode`]s joined by [`MultiEdge`]s between named connectors.
//! Map and consume regions inside a state are scopes; the engine in
//! [`scope`] threads values into them and routes writes back out. The
//! finished graph is serialized by [`Emitter`].

pub mod connector;
pub mod edge;
pub mod emit;
pub mod error;
pub mod id;
pub mod node;
pub mod scope;
pub mod sdfg;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use connector::{Connector, ConnectorDef};
pub use edge::{Assignment, InterstateEdge, MultiEdge};
pub use emit::Emitter;
pub use error::GraphError;
pub use id::{sanitize_name, EdgeId, NameService, NodeId, ScopeId, StateId};
pub use node::{ConnectorNode, NodeKind};
pub use scope::{ContainerBinding, ContainerResolver, ScopeKind, WriteTarget};
pub use sdfg::{ContainerTable, Sdfg};
pub use state::State;
pub use types::{Array, Code, CodeLanguage, DType, Dim, Location, Range, Symbol};
