//! Scope resolution engine.
//!
//! A state and every map or consume region opened in it are *scopes*. All
//! three share one contract:
//!
//! - [`State::lookup`] returns the connector representing a value inside a
//!   scope, threading it through every enclosing entry node on first use.
//! - [`State::route_write`] lands a write on a fresh access node for the
//!   data container. An iteration scope also queues it until it is closed.
//! - [`State::add_dependency`] inserts an ordering-only edge, threading a
//!   null connector pair outward when the producer is not visible yet.
//! - [`State::close_scope`] flushes the queue of an iteration scope out
//!   through its exit node and wires every node left without an incoming or
//!   outgoing edge to the entry or exit.
//!
//! The per-scope state (value table, pending writes) lives in a shared
//! [`ScopeTable`]; only lookup and write routing differ by [`ScopeKind`].
//! A scope only ever touches its own table and calls into its parent.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connector::Connector;
use crate::edge::MultiEdge;
use crate::error::GraphError;
use crate::id::{sanitize_name, NodeId, ScopeId};
use crate::node::{ConnectorNode, ConsumeEntryNode, MapEntryNode, NodeKind, ScopeExitNode};
use crate::state::State;
use crate::types::{Code, Location, Range};

// ---------------------------------------------------------------------------
// Scope data
// ---------------------------------------------------------------------------

/// The data container a value denotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerBinding {
    pub data: String,
    /// Zero-fill on entry.
    pub init: bool,
}

/// Resolves values that are not mapped in any scope to data containers.
pub trait ContainerResolver {
    fn resolve(&self, value: &str) -> Option<ContainerBinding>;
}

/// Destination of a routed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteTarget {
    pub data: String,
    pub init: bool,
    /// Subset of the container being written; empty means the full range.
    pub ranges: Vec<Range>,
}

impl WriteTarget {
    pub fn new(binding: ContainerBinding, ranges: Vec<Range>) -> Self {
        WriteTarget {
            data: binding.data,
            init: binding.init,
            ranges,
        }
    }
}

/// A write queued in an iteration scope, flushed when the scope closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingWrite {
    /// Output of the in-scope access node holding the written value.
    pub from: Connector,
    /// Target with its subset cleared.
    pub target: WriteTarget,
    /// The value rebound to the written container once the write lands.
    pub value: String,
    /// The subset originally written inside the scope.
    pub subset: Vec<Range>,
}

/// What kind of region a scope is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    State,
    Map { entry: NodeId, exit: NodeId },
    Consume { entry: NodeId, exit: NodeId },
}

impl ScopeKind {
    /// Entry and exit nodes of an iteration scope.
    pub fn boundary(&self) -> Option<(NodeId, NodeId)> {
        match *self {
            ScopeKind::State => None,
            ScopeKind::Map { entry, exit } | ScopeKind::Consume { entry, exit } => {
                Some((entry, exit))
            }
        }
    }
}

/// Value table and write queue owned by one scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeTable {
    lut: IndexMap<String, Connector>,
    pending: Vec<PendingWrite>,
    closed: bool,
}

impl ScopeTable {
    pub fn get(&self, value: &str) -> Option<&Connector> {
        self.lut.get(value)
    }

    /// Binds `value` to `connector`, replacing any earlier binding.
    pub fn insert(&mut self, value: &str, connector: Connector) {
        self.lut.insert(value.to_string(), connector);
    }

    pub fn pending(&self) -> &[PendingWrite] {
        &self.pending
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// A scope of a state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub table: ScopeTable,
    pub location: Location,
}

impl Scope {
    pub(crate) fn state(location: Location) -> Self {
        Scope {
            kind: ScopeKind::State,
            parent: None,
            table: ScopeTable::default(),
            location,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

impl State {
    /// Parent and boundary nodes of an iteration scope.
    fn iteration(&self, scope: ScopeId) -> Result<(ScopeId, NodeId, NodeId), GraphError> {
        let s = self.scope(scope)?;
        match (s.parent, s.kind.boundary()) {
            (Some(parent), Some((entry, exit))) => Ok((parent, entry, exit)),
            _ => Err(GraphError::NotAnIterationScope { id: scope }),
        }
    }

    /// Binds `value` to `connector` in `scope`.
    pub fn map_value(
        &mut self,
        scope: ScopeId,
        value: &str,
        connector: Connector,
    ) -> Result<(), GraphError> {
        self.scope_mut(scope)?.table.insert(value, connector);
        Ok(())
    }

    /// Returns the connector currently representing `value` in `scope`,
    /// creating it on first use.
    ///
    /// In the state scope an unmapped value must denote a data container: an
    /// access node is inserted for it. In an iteration scope the value is
    /// looked up in the parent and threaded through the entry node as an
    /// `IN_<value>`/`OUT_<value>` pair. Results are memoized per scope.
    pub fn lookup(
        &mut self,
        scope: ScopeId,
        value: &str,
        containers: &dyn ContainerResolver,
    ) -> Result<Connector, GraphError> {
        let s = self.scope(scope)?;
        if let Some(found) = s.table.get(value) {
            return Ok(found.clone());
        }
        let location = s.location.clone();

        let connector = match s.kind.boundary() {
            None => {
                let binding = containers
                    .resolve(value)
                    .ok_or_else(|| GraphError::UndefinedValue {
                        value: value.to_string(),
                    })?;
                let access = self.add_node(
                    scope,
                    ConnectorNode::access(&binding.data, binding.init, location),
                )?;
                let out = Connector::null(access).with_data(binding.data);
                self.add_out_connector(&out)?;
                out
            }
            Some((entry, _)) => {
                let (parent, _, _) = self.iteration(scope)?;
                let outer = self.lookup(parent, value, containers)?;
                let name = sanitize_name(value);

                let mut inner_in = Connector::named(entry, format!("IN_{}", name));
                inner_in.data = outer.data.clone();
                self.add_in_connector(&inner_in)?;
                self.add_edge(parent, MultiEdge::new(outer.clone(), inner_in, location))?;

                let mut inner_out = Connector::named(entry, format!("OUT_{}", name));
                inner_out.data = outer.data;
                inner_out.ranges = outer.ranges;
                self.add_out_connector(&inner_out)?;
                inner_out
            }
        };

        self.map_value(scope, value, connector.clone())?;
        Ok(connector)
    }

    /// Routes a write of `from` into the container described by `target`.
    ///
    /// The write lands on a fresh access node in `scope` and `value` is
    /// rebound to that node, so later reads in the same scope see it. An
    /// iteration scope additionally queues the access node's output, with
    /// the target subset cleared, to be carried outward by
    /// [`close_scope`](Self::close_scope).
    pub fn route_write(
        &mut self,
        scope: ScopeId,
        from: Connector,
        mut target: WriteTarget,
        value: &str,
    ) -> Result<(), GraphError> {
        let s = self.scope(scope)?;
        if s.table.is_closed() {
            return Err(GraphError::ScopeAlreadyClosed { id: scope });
        }
        let location = s.location.clone();
        let queued = s.kind.boundary().is_some();

        let access = self.add_node(
            scope,
            ConnectorNode::access(&target.data, target.init, location.clone()),
        )?;
        let subset = std::mem::take(&mut target.ranges);
        let access_in = Connector::null(access)
            .with_data(target.data.clone())
            .with_ranges(subset.clone());
        self.add_in_connector(&access_in)?;
        self.add_edge(scope, MultiEdge::new(from, access_in, location))?;

        let access_out = Connector::null(access).with_data(target.data.clone());
        self.add_out_connector(&access_out)?;
        self.map_value(scope, value, access_out.clone())?;

        if queued {
            debug!(scope = %scope, data = %target.data, "queued write");
            self.scope_mut(scope)?.table.pending.push(PendingWrite {
                from: access_out,
                target,
                value: value.to_string(),
                subset,
            });
        }
        Ok(())
    }

    /// Adds an ordering-only edge from the producer of `value` to
    /// `connector`.
    ///
    /// When `value` is not yet visible in an iteration scope, a null
    /// connector pair is added on the entry and the dependency continues in
    /// the parent scope.
    pub fn add_dependency(
        &mut self,
        scope: ScopeId,
        value: &str,
        connector: Connector,
        containers: &dyn ContainerResolver,
    ) -> Result<(), GraphError> {
        let s = self.scope(scope)?;
        let location = s.location.clone();
        let mapped = s.table.get(value).cloned();

        match (mapped, s.kind.boundary()) {
            (Some(src), _) => {
                self.add_edge(scope, MultiEdge::dependency(src, connector, location))?;
            }
            (None, None) => {
                let src = self.lookup(scope, value, containers)?;
                self.add_edge(scope, MultiEdge::dependency(src, connector, location))?;
            }
            (None, Some((entry, _))) => {
                let (parent, _, _) = self.iteration(scope)?;
                let entry_in = Connector::null(entry);
                let entry_out = Connector::null(entry);
                self.add_in_connector(&entry_in)?;
                self.add_out_connector(&entry_out)?;
                self.add_edge(scope, MultiEdge::dependency(entry_out, connector, location))?;
                self.add_dependency(parent, value, entry_in, containers)?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Opening and closing iteration scopes
    // -----------------------------------------------------------------------

    fn open_scope(
        &mut self,
        parent: ScopeId,
        label: &str,
        entry_kind: NodeKind,
        location: Location,
    ) -> Result<ScopeId, GraphError> {
        if self.scope(parent)?.table.is_closed() {
            return Err(GraphError::ScopeAlreadyClosed { id: parent });
        }
        let body = ScopeId(self.scopes.len() as u32);
        let is_map = matches!(entry_kind, NodeKind::MapEntry(_));

        let entry = self.add_node(parent, ConnectorNode::new(label, entry_kind, location.clone()))?;
        let exit_node = ScopeExitNode { entry };
        let exit_kind = if is_map {
            NodeKind::MapExit(exit_node)
        } else {
            NodeKind::ConsumeExit(exit_node)
        };
        let exit = self.add_node(parent, ConnectorNode::new(label, exit_kind, location.clone()))?;

        let kind = match &mut self.node_mut(entry)?.kind {
            NodeKind::MapEntry(m) => {
                m.exit = exit;
                m.body = body;
                ScopeKind::Map { entry, exit }
            }
            NodeKind::ConsumeEntry(c) => {
                c.exit = exit;
                c.body = body;
                ScopeKind::Consume { entry, exit }
            }
            _ => return Err(GraphError::NotAnIterationScope { id: body }),
        };

        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            table: ScopeTable::default(),
            location,
        });
        debug!(scope = %body, parent = %parent, label, "opened scope");
        Ok(body)
    }

    /// Opens a map scope inside `parent` and returns the body scope.
    pub fn open_map(
        &mut self,
        parent: ScopeId,
        label: &str,
        params: Vec<String>,
        ranges: Vec<Range>,
        location: Location,
    ) -> Result<ScopeId, GraphError> {
        let entry = NodeKind::MapEntry(MapEntryNode {
            params,
            ranges,
            exit: NodeId(0),
            body: ScopeId::STATE,
        });
        self.open_scope(parent, label, entry, location)
    }

    /// Opens a consume scope inside `parent` and returns the body scope.
    pub fn open_consume(
        &mut self,
        parent: ScopeId,
        label: &str,
        num_pes: Option<String>,
        pe_index: String,
        condition: Code,
        location: Location,
    ) -> Result<ScopeId, GraphError> {
        let entry = NodeKind::ConsumeEntry(ConsumeEntryNode {
            num_pes,
            pe_index,
            condition,
            exit: NodeId(0),
            body: ScopeId::STATE,
        });
        self.open_scope(parent, label, entry, location)
    }

    /// Closes an iteration scope. Must be called exactly once, after its
    /// whole body has been built.
    ///
    /// 1. Connects the entry to the exit with a null edge.
    /// 2. Flushes queued writes, routing each out through a fresh
    ///    `IN_*`/`OUT_*` pair on the exit and on into the parent. A write
    ///    whose access node was already read in this scope is dropped when a
    ///    later queued write to the same container supersedes it.
    /// 3. Wires nodes without an incoming edge from the entry and nodes
    ///    without an outgoing edge to the exit.
    pub fn close_scope(&mut self, scope: ScopeId) -> Result<(), GraphError> {
        let (parent, entry, exit) = self.iteration(scope)?;
        if self.scope(scope)?.table.is_closed() {
            return Err(GraphError::ScopeAlreadyClosed { id: scope });
        }
        let location = self.scope(scope)?.location.clone();

        let entry_null = Connector::null(entry);
        let exit_null = Connector::null(exit);
        self.add_out_connector(&entry_null)?;
        self.add_in_connector(&exit_null)?;
        self.add_edge(
            scope,
            MultiEdge::new(entry_null.clone(), exit_null.clone(), location.clone()),
        )?;

        let consumed: HashSet<NodeId> = self
            .edges_in(scope)
            .filter(|e| !e.dependency && !e.src.is_structural())
            .map(|e| e.src.node)
            .collect();

        let pending = std::mem::take(&mut self.scope_mut(scope)?.table.pending);
        self.scope_mut(scope)?.table.closed = true;

        for (k, write) in pending.iter().enumerate() {
            let superseded = pending[k + 1..]
                .iter()
                .any(|later| later.target.data == write.target.data);
            if superseded && consumed.contains(&write.from.node) {
                debug!(scope = %scope, data = %write.target.data, "write shadowed inside scope");
                continue;
            }
            self.route_out(scope, parent, exit, write.clone(), &location)?;
        }

        self.connect_dangling(scope, &entry_null, &exit_null, &location)
    }

    fn route_out(
        &mut self,
        scope: ScopeId,
        parent: ScopeId,
        exit: NodeId,
        write: PendingWrite,
        location: &Location,
    ) -> Result<(), GraphError> {
        let base = sanitize_name(&write.value);
        let exit_node = self.node(exit)?;
        let mut suffix = 0usize;
        let (in_name, out_name) = loop {
            let tag = if suffix == 0 {
                base.clone()
            } else {
                format!("{}_{}", base, suffix)
            };
            let in_name = format!("IN_{}", tag);
            let out_name = format!("OUT_{}", tag);
            if !exit_node.has_in_connector(&in_name) && !exit_node.has_out_connector(&out_name) {
                break (in_name, out_name);
            }
            suffix += 1;
        };

        let exit_in = Connector::named(exit, in_name)
            .with_data(write.target.data.clone())
            .with_ranges(write.subset);
        self.add_in_connector(&exit_in)?;
        self.add_edge(scope, MultiEdge::new(write.from, exit_in, location.clone()))?;

        let exit_out = Connector::named(exit, out_name).with_data(write.target.data.clone());
        self.add_out_connector(&exit_out)?;

        debug!(
            scope = %scope,
            parent = %parent,
            data = %write.target.data,
            "routed write out of scope"
        );
        self.route_write(parent, exit_out, write.target, &write.value)
    }

    fn connect_dangling(
        &mut self,
        scope: ScopeId,
        entry_null: &Connector,
        exit_null: &Connector,
        location: &Location,
    ) -> Result<(), GraphError> {
        let members = self.nodes_in(scope);

        let has_incoming: HashSet<NodeId> = self.edges_in(scope).map(|e| e.dst.node).collect();
        for &id in &members {
            if has_incoming.contains(&id) || self.node(id)?.is_scope_exit() {
                continue;
            }
            let port = Connector::null(id);
            self.add_in_connector(&port)?;
            self.add_edge(scope, MultiEdge::new(entry_null.clone(), port, location.clone()))?;
        }

        let has_outgoing: HashSet<NodeId> = self.edges_in(scope).map(|e| e.src.node).collect();
        for &id in &members {
            if has_outgoing.contains(&id) || self.node(id)?.is_scope_entry() {
                continue;
            }
            let port = Connector::null(id);
            self.add_out_connector(&port)?;
            self.add_edge(scope, MultiEdge::new(port, exit_null.clone(), location.clone()))?;
        }

        debug!(scope = %scope, nodes = members.len(), "closed scope");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Containers(HashMap<String, ContainerBinding>);

    impl Containers {
        fn of(names: &[&str]) -> Self {
            Containers(
                names
                    .iter()
                    .map(|n| {
                        (
                            n.to_string(),
                            ContainerBinding {
                                data: n.to_string(),
                                init: false,
                            },
                        )
                    })
                    .collect(),
            )
        }
    }

    impl ContainerResolver for Containers {
        fn resolve(&self, value: &str) -> Option<ContainerBinding> {
            self.0.get(value).cloned()
        }
    }

    fn target(data: &str, ranges: Vec<Range>) -> WriteTarget {
        WriteTarget {
            data: data.into(),
            init: false,
            ranges,
        }
    }

    fn map(state: &mut State, parent: ScopeId) -> ScopeId {
        state
            .open_map(
                parent,
                "map",
                vec!["i".into()],
                vec![Range::new("0", "9", "1")],
                Location::default(),
            )
            .unwrap()
    }

    #[test]
    fn state_lookup_creates_one_access_node() {
        let containers = Containers::of(&["A"]);
        let mut state = State::new("s", Location::default());
        let first = state.lookup(ScopeId::STATE, "A", &containers).unwrap();
        let second = state.lookup(ScopeId::STATE, "A", &containers).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.data.as_deref(), Some("A"));
        assert_eq!(state.node_count(), 1);
    }

    #[test]
    fn lookup_of_unknown_value_fails() {
        let mut state = State::new("s", Location::default());
        let err = state
            .lookup(ScopeId::STATE, "%7", &Containers::of(&[]))
            .unwrap_err();
        assert_eq!(err, GraphError::UndefinedValue { value: "%7".into() });
    }

    #[test]
    fn lookup_threads_through_nested_maps() {
        let containers = Containers::of(&["A"]);
        let mut state = State::new("s", Location::default());
        let outer = map(&mut state, ScopeId::STATE);
        let inner = map(&mut state, outer);

        let conn = state.lookup(inner, "A", &containers).unwrap();
        assert_eq!(conn.name.as_deref(), Some("OUT_A"));
        // access, 2 entries, 2 exits
        assert_eq!(state.node_count(), 5);
        // access -> outer entry, outer entry -> inner entry
        assert_eq!(state.edge_count(), 2);

        let again = state.lookup(inner, "A", &containers).unwrap();
        assert_eq!(again, conn);
        assert_eq!(state.edge_count(), 2);
    }

    #[test]
    fn state_route_write_rebinds_value() {
        let containers = Containers::of(&["A", "B"]);
        let mut state = State::new("s", Location::default());
        let src = state.lookup(ScopeId::STATE, "B", &containers).unwrap();
        state
            .route_write(ScopeId::STATE, src, target("A", vec![]), "A")
            .unwrap();

        let bound = state.lookup(ScopeId::STATE, "A", &containers).unwrap();
        assert_eq!(bound.data.as_deref(), Some("A"));
        // B access, written A access; no fresh access for the lookup
        assert_eq!(state.node_count(), 2);
        assert_eq!(state.edge_count(), 1);
    }

    #[test]
    fn map_route_write_is_deferred_until_close() {
        let containers = Containers::of(&["A", "B"]);
        let mut state = State::new("s", Location::default());
        let body = map(&mut state, ScopeId::STATE);
        let src = state.lookup(body, "B", &containers).unwrap();

        state
            .route_write(body, src, target("A", vec![Range::index("i")]), "A")
            .unwrap();
        let pending = state.scope(body).unwrap().table.pending();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].target.ranges.is_empty());
        let local = pending[0].from.node;
        assert!(matches!(&state.node(local).unwrap().kind, NodeKind::Access(a) if a.data == "A"));
        assert_eq!(state.nodes_in(body), vec![local]);

        state.close_scope(body).unwrap();
        let (_, exit) = state.scope(body).unwrap().kind.boundary().unwrap();
        let exit_node = state.node(exit).unwrap();
        assert!(exit_node.has_in_connector("IN_A"));
        assert!(exit_node.has_out_connector("OUT_A"));

        let outward: Vec<_> = state
            .edges_in(ScopeId::STATE)
            .filter(|e| e.src.node == exit)
            .collect();
        assert_eq!(outward.len(), 1);
        let written = state.node(outward[0].dst.node).unwrap();
        assert!(matches!(&written.kind, NodeKind::Access(a) if a.data == "A"));
    }

    #[test]
    fn read_after_write_in_map_sees_the_write() {
        let containers = Containers::of(&["A", "B"]);
        let mut state = State::new("s", Location::default());
        let body = map(&mut state, ScopeId::STATE);
        let src = state.lookup(body, "B", &containers).unwrap();
        state
            .route_write(body, src, target("A", vec![Range::index("i")]), "A")
            .unwrap();

        let read = state.lookup(body, "A", &containers).unwrap();
        assert_eq!(read.node, state.scope(body).unwrap().table.pending()[0].from.node);
        let (entry, _) = state.scope(body).unwrap().kind.boundary().unwrap();
        assert!(!state.node(entry).unwrap().has_in_connector("IN_A"));
    }

    #[test]
    fn consumed_write_still_leaves_unless_superseded() {
        let containers = Containers::of(&["A", "B", "C"]);
        let mut state = State::new("s", Location::default());
        let body = map(&mut state, ScopeId::STATE);
        let src = state.lookup(body, "B", &containers).unwrap();
        state
            .route_write(body, src, target("A", vec![Range::index("i")]), "A")
            .unwrap();
        let read = state.lookup(body, "A", &containers).unwrap();
        state
            .route_write(body, read, target("C", vec![Range::index("i")]), "C")
            .unwrap();
        state.close_scope(body).unwrap();

        let (_, exit) = state.scope(body).unwrap().kind.boundary().unwrap();
        let exit_node = state.node(exit).unwrap();
        assert!(exit_node.has_in_connector("IN_A"));
        assert!(exit_node.has_in_connector("IN_C"));
    }

    #[test]
    fn consumed_write_is_shadowed_by_a_later_write() {
        let containers = Containers::of(&["A", "B"]);
        let mut state = State::new("s", Location::default());
        let body = map(&mut state, ScopeId::STATE);
        let src = state.lookup(body, "B", &containers).unwrap();
        state
            .route_write(body, src, target("A", vec![Range::index("0")]), "A")
            .unwrap();
        let read = state.lookup(body, "A", &containers).unwrap();
        state
            .route_write(body, read, target("A", vec![Range::index("i")]), "A")
            .unwrap();
        state.close_scope(body).unwrap();

        let (_, exit) = state.scope(body).unwrap().kind.boundary().unwrap();
        let exit_node = state.node(exit).unwrap();
        assert!(exit_node.has_in_connector("IN_A"));
        assert!(!exit_node.has_in_connector("IN_A_1"));
        // both in-scope writes stay in the graph
        let local_writes = state
            .nodes_in(body)
            .into_iter()
            .filter(|&id| {
                matches!(&state.node(id).unwrap().kind, NodeKind::Access(a) if a.data == "A")
            })
            .count();
        assert_eq!(local_writes, 2);
    }

    #[test]
    fn closing_twice_is_an_error() {
        let mut state = State::new("s", Location::default());
        let body = map(&mut state, ScopeId::STATE);
        state.close_scope(body).unwrap();
        assert_eq!(
            state.close_scope(body).unwrap_err(),
            GraphError::ScopeAlreadyClosed { id: body }
        );
        assert_eq!(
            state.close_scope(ScopeId::STATE).unwrap_err(),
            GraphError::NotAnIterationScope { id: ScopeId::STATE }
        );
    }

    #[test]
    fn dependency_threads_null_connectors() {
        let containers = Containers::of(&["A"]);
        let mut state = State::new("s", Location::default());
        let body = map(&mut state, ScopeId::STATE);
        let (entry, _) = state.scope(body).unwrap().kind.boundary().unwrap();

        let task = state
            .add_node(
                body,
                ConnectorNode::new(
                    "task",
                    NodeKind::Access(crate::node::AccessNode {
                        data: "B".into(),
                        init: false,
                    }),
                    Location::default(),
                ),
            )
            .unwrap();
        let port = Connector::null(task);
        state.add_in_connector(&port).unwrap();
        state.add_dependency(body, "A", port, &containers).unwrap();

        let deps: Vec<_> = state.edges().filter(|(_, e)| e.dependency).collect();
        assert_eq!(deps.len(), 2);
        assert!(deps
            .iter()
            .any(|(_, e)| e.scope == body && e.src.node == entry && e.dst.node == task));
        assert!(deps
            .iter()
            .any(|(_, e)| e.scope == ScopeId::STATE && e.dst.node == entry));
    }
}
