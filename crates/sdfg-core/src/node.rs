//! Dataflow graph nodes.
//!
//! Every node in a state's multigraph is a [`ConnectorNode`]: a label, the
//! scope it was inserted into, ordered input and output port lists and a
//! [`NodeKind`] payload. Scope entries and exits refer to each other and to
//! the body scope by ID, never by ownership.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::connector::ConnectorDef;
use crate::error::GraphError;
use crate::id::{sanitize_name, NodeId, ScopeId};
use crate::sdfg::Sdfg;
use crate::types::{Code, Location, Range};

/// Reads or writes a named data container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessNode {
    pub data: String,
    /// Zero-fill the container before first use.
    pub init: bool,
}

/// A single computation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskletNode {
    pub code: Code,
    pub code_global: Code,
    pub side_effects: bool,
}

impl TaskletNode {
    pub fn new(code: Code) -> Self {
        TaskletNode {
            code,
            code_global: Code::default(),
            side_effects: false,
        }
    }
}

/// Opaque call into a library implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryNode {
    pub classpath: String,
}

/// A full SDFG embedded as a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedSdfgNode {
    pub sdfg: Box<Sdfg>,
    /// Inner symbol name -> outer expression.
    pub symbol_mapping: IndexMap<String, String>,
}

/// Entry of a parameterized iteration scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntryNode {
    pub params: Vec<String>,
    /// One inclusive range per parameter.
    pub ranges: Vec<Range>,
    pub exit: NodeId,
    /// The scope holding the map body.
    pub body: ScopeId,
}

/// Entry of a stream-consumption scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeEntryNode {
    /// Processing element count; `None` lets the target decide.
    pub num_pes: Option<String>,
    pub pe_index: String,
    /// Continuation condition.
    pub condition: Code,
    pub exit: NodeId,
    pub body: ScopeId,
}

/// Exit of a map or consume scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeExitNode {
    pub entry: NodeId,
}

/// Node payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    Access(AccessNode),
    Tasklet(TaskletNode),
    Library(LibraryNode),
    NestedSdfg(NestedSdfgNode),
    MapEntry(MapEntryNode),
    MapExit(ScopeExitNode),
    ConsumeEntry(ConsumeEntryNode),
    ConsumeExit(ScopeExitNode),
}

impl NodeKind {
    /// The emitted `"type"` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Access(_) => "AccessNode",
            NodeKind::Tasklet(_) => "Tasklet",
            NodeKind::Library(_) => "LibraryNode",
            NodeKind::NestedSdfg(_) => "NestedSDFG",
            NodeKind::MapEntry(_) => "MapEntry",
            NodeKind::MapExit(_) => "MapExit",
            NodeKind::ConsumeEntry(_) => "ConsumeEntry",
            NodeKind::ConsumeExit(_) => "ConsumeExit",
        }
    }
}

type Ports = SmallVec<[ConnectorDef; 4]>;

/// A node with named, ordered, unique-by-name ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorNode {
    pub label: String,
    pub kind: NodeKind,
    /// The scope this node was inserted into. Set once, at insertion.
    pub scope: ScopeId,
    pub location: Location,
    in_connectors: Ports,
    out_connectors: Ports,
}

impl ConnectorNode {
    /// Creates a node; the label is sanitized.
    pub fn new(label: &str, kind: NodeKind, location: Location) -> Self {
        ConnectorNode {
            label: sanitize_name(label),
            kind,
            scope: ScopeId::STATE,
            location,
            in_connectors: SmallVec::new(),
            out_connectors: SmallVec::new(),
        }
    }

    pub fn access(data: &str, init: bool, location: Location) -> Self {
        ConnectorNode::new(
            data,
            NodeKind::Access(AccessNode {
                data: data.to_string(),
                init,
            }),
            location,
        )
    }

    pub fn in_connectors(&self) -> &[ConnectorDef] {
        &self.in_connectors
    }

    pub fn out_connectors(&self) -> &[ConnectorDef] {
        &self.out_connectors
    }

    /// Adds an input port on node `id`.
    ///
    /// Re-adding an identical definition is a no-op. A named port that is
    /// already defined with a different binding is an error. Null ports are
    /// never emitted, so the first null definition wins.
    pub fn add_in_connector(&mut self, id: NodeId, def: ConnectorDef) -> Result<(), GraphError> {
        insert_port(&mut self.in_connectors, id, def)
    }

    /// Adds an output port on node `id`. Same rules as
    /// [`add_in_connector`](Self::add_in_connector).
    pub fn add_out_connector(&mut self, id: NodeId, def: ConnectorDef) -> Result<(), GraphError> {
        insert_port(&mut self.out_connectors, id, def)
    }

    pub fn has_in_connector(&self, name: &str) -> bool {
        self.in_connectors
            .iter()
            .any(|c| c.name.as_deref() == Some(name))
    }

    pub fn has_out_connector(&self, name: &str) -> bool {
        self.out_connectors
            .iter()
            .any(|c| c.name.as_deref() == Some(name))
    }

    pub fn is_scope_entry(&self) -> bool {
        matches!(self.kind, NodeKind::MapEntry(_) | NodeKind::ConsumeEntry(_))
    }

    pub fn is_scope_exit(&self) -> bool {
        matches!(self.kind, NodeKind::MapExit(_) | NodeKind::ConsumeExit(_))
    }

    /// The exit node paired with this entry, if this is a scope entry.
    pub fn scope_exit(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::MapEntry(m) => Some(m.exit),
            NodeKind::ConsumeEntry(c) => Some(c.exit),
            _ => None,
        }
    }
}

fn insert_port(ports: &mut Ports, node: NodeId, def: ConnectorDef) -> Result<(), GraphError> {
    if let Some(existing) = ports.iter().find(|c| c.name == def.name) {
        if existing == &def || def.is_null() {
            return Ok(());
        }
        return Err(GraphError::ConflictingConnector {
            node,
            name: def.name.unwrap_or_default(),
        });
    }
    ports.push(def);
    Ok(())
}
