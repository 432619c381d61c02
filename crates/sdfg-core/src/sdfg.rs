//! The top-level stateful dataflow multigraph.
//!
//! An [`Sdfg`] owns its states, the interstate edges between them, its data
//! containers and symbols. It also carries the [`ContainerTable`] mapping
//! source values to the containers they denote, which the scope engine
//! consults when a value is first read in a state.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::edge::InterstateEdge;
use crate::error::GraphError;
use crate::id::StateId;
use crate::scope::{ContainerBinding, ContainerResolver};
use crate::state::State;
use crate::types::{Array, Location, Symbol};

/// Source value -> data container bindings of one SDFG.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerTable {
    bindings: IndexMap<String, ContainerBinding>,
}

impl ContainerTable {
    /// Binds `value` to a container, replacing any earlier binding.
    pub fn bind(&mut self, value: &str, binding: ContainerBinding) {
        self.bindings.insert(value.to_string(), binding);
    }

    pub fn get(&self, value: &str) -> Option<&ContainerBinding> {
        self.bindings.get(value)
    }
}

impl ContainerResolver for ContainerTable {
    fn resolve(&self, value: &str) -> Option<ContainerBinding> {
        self.bindings.get(value).cloned()
    }
}

/// A stateful dataflow multigraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sdfg {
    pub name: String,
    /// Globally unique ID, emitted as `sdfg_list_id`.
    pub list_id: u32,
    pub location: Location,
    states: Vec<State>,
    state_names: IndexMap<String, StateId>,
    start_state: Option<StateId>,
    edges: Vec<InterstateEdge>,
    arrays: IndexMap<String, Array>,
    args: Vec<String>,
    symbols: IndexMap<String, Symbol>,
    containers: ContainerTable,
}

impl Sdfg {
    pub fn new(name: &str, list_id: u32, location: Location) -> Self {
        Sdfg {
            name: crate::id::sanitize_name(name),
            list_id,
            location,
            states: Vec::new(),
            state_names: IndexMap::new(),
            start_state: None,
            edges: Vec::new(),
            arrays: IndexMap::new(),
            args: Vec::new(),
            symbols: IndexMap::new(),
            containers: ContainerTable::default(),
        }
    }

    // -----------------------------------------------------------------------
    // States
    // -----------------------------------------------------------------------

    /// Adds a state. State IDs are sequential from 0.
    pub fn add_state(&mut self, name: &str, location: Location) -> Result<StateId, GraphError> {
        if self.state_names.contains_key(name) {
            return Err(GraphError::DuplicateState {
                name: name.to_string(),
            });
        }
        let id = StateId(self.states.len() as u32);
        self.states.push(State::new(name, location));
        self.state_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Finds a state by its source name.
    pub fn lookup_state(&self, name: &str) -> Result<StateId, GraphError> {
        self.state_names
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownState {
                name: name.to_string(),
            })
    }

    pub fn state(&self, id: StateId) -> Result<&State, GraphError> {
        self.states
            .get(id.0 as usize)
            .ok_or(GraphError::StateNotFound { id })
    }

    pub fn state_mut(&mut self, id: StateId) -> Result<&mut State, GraphError> {
        self.states
            .get_mut(id.0 as usize)
            .ok_or(GraphError::StateNotFound { id })
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &State)> {
        self.states
            .iter()
            .enumerate()
            .map(|(i, s)| (StateId(i as u32), s))
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn set_start_state(&mut self, id: StateId) -> Result<(), GraphError> {
        self.state(id)?;
        self.start_state = Some(id);
        Ok(())
    }

    pub fn start_state(&self) -> Option<StateId> {
        self.start_state
    }

    /// A state together with the container table, for scope resolution.
    pub fn scope_parts(
        &mut self,
        id: StateId,
    ) -> Result<(&mut State, &ContainerTable), GraphError> {
        let state = self
            .states
            .get_mut(id.0 as usize)
            .ok_or(GraphError::StateNotFound { id })?;
        Ok((state, &self.containers))
    }

    // -----------------------------------------------------------------------
    // Interstate edges
    // -----------------------------------------------------------------------

    /// Adds an interstate edge. Both endpoint states must exist.
    pub fn add_edge(&mut self, edge: InterstateEdge) -> Result<(), GraphError> {
        self.state(edge.src)?;
        self.state(edge.dst)?;
        self.edges.push(edge);
        Ok(())
    }

    pub fn edges(&self) -> &[InterstateEdge] {
        &self.edges
    }

    // -----------------------------------------------------------------------
    // Containers and symbols
    // -----------------------------------------------------------------------

    /// Adds a data container. Names are unique.
    pub fn add_array(&mut self, array: Array) -> Result<(), GraphError> {
        if self.arrays.contains_key(&array.name) {
            return Err(GraphError::DuplicateArray { name: array.name });
        }
        self.arrays.insert(array.name.clone(), array);
        Ok(())
    }

    /// Adds a data container that is also an argument.
    pub fn add_arg(&mut self, array: Array) -> Result<(), GraphError> {
        let name = array.name.clone();
        self.add_array(array)?;
        self.args.push(name);
        Ok(())
    }

    pub fn array(&self, name: &str) -> Option<&Array> {
        self.arrays.get(name)
    }

    pub fn arrays(&self) -> impl Iterator<Item = &Array> {
        self.arrays.values()
    }

    /// Argument names in declaration order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_arg(&self, name: &str) -> bool {
        self.args.iter().any(|a| a == name)
    }

    pub fn add_symbol(&mut self, symbol: Symbol) -> Result<(), GraphError> {
        if self.symbols.contains_key(&symbol.name) {
            return Err(GraphError::DuplicateSymbol { name: symbol.name });
        }
        self.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Adds `symbol` unless a symbol with that name already exists.
    pub fn mirror_symbol(&mut self, symbol: Symbol) {
        self.symbols.entry(symbol.name.clone()).or_insert(symbol);
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Marks every non-argument container transient, as required for SDFGs
    /// embedded in a nested SDFG node.
    pub fn set_nested_transient(&mut self) {
        let args = &self.args;
        for array in self.arrays.values_mut() {
            if !args.contains(&array.name) {
                array.transient = true;
            }
        }
    }

    /// Binds a source value to the container it denotes.
    pub fn bind_container(&mut self, value: &str, binding: ContainerBinding) {
        self.containers.bind(value, binding);
    }

    pub fn containers(&self) -> &ContainerTable {
        &self.containers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Assignment;
    use crate::types::DType;

    #[test]
    fn states_are_numbered_in_order() {
        let mut sdfg = Sdfg::new("sdfg_0", 0, Location::default());
        let a = sdfg.add_state("init", Location::default()).unwrap();
        let b = sdfg.add_state("loop", Location::default()).unwrap();
        assert_eq!(a, StateId(0));
        assert_eq!(b, StateId(1));
        assert_eq!(sdfg.lookup_state("loop").unwrap(), b);
        assert_eq!(
            sdfg.lookup_state("exit").unwrap_err(),
            GraphError::UnknownState { name: "exit".into() }
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut sdfg = Sdfg::new("s", 0, Location::default());
        sdfg.add_state("s0", Location::default()).unwrap();
        assert!(matches!(
            sdfg.add_state("s0", Location::default()),
            Err(GraphError::DuplicateState { .. })
        ));

        sdfg.add_array(Array::new("A", false, DType::Int32, vec![])).unwrap();
        assert_eq!(
            sdfg.add_array(Array::new("A", true, DType::Int64, vec![])).unwrap_err(),
            GraphError::DuplicateArray { name: "A".into() }
        );

        sdfg.add_symbol(Symbol::new("N", DType::Int64)).unwrap();
        assert!(sdfg.add_symbol(Symbol::new("N", DType::Int64)).is_err());
    }

    #[test]
    fn interstate_edge_endpoints_must_exist() {
        let mut sdfg = Sdfg::new("s", 0, Location::default());
        let a = sdfg.add_state("a", Location::default()).unwrap();
        let mut edge = InterstateEdge::new(a, StateId(4), Location::default());
        edge.add_assignment(Assignment::new("i", "0"));
        assert_eq!(
            sdfg.add_edge(edge).unwrap_err(),
            GraphError::StateNotFound { id: StateId(4) }
        );
        assert!(sdfg.edges().is_empty());
    }

    #[test]
    fn nested_transient_keeps_args_visible() {
        let mut sdfg = Sdfg::new("inner", 1, Location::default());
        sdfg.add_arg(Array::new("arg0", false, DType::Float32, vec![]))
            .unwrap();
        sdfg.add_array(Array::new("buf", false, DType::Float32, vec![]))
            .unwrap();
        sdfg.set_nested_transient();
        assert!(!sdfg.array("arg0").unwrap().transient);
        assert!(sdfg.array("buf").unwrap().transient);
        assert!(sdfg.is_arg("arg0"));
    }

    #[test]
    fn mirrored_symbols_do_not_conflict() {
        let mut sdfg = Sdfg::new("inner", 1, Location::default());
        sdfg.add_symbol(Symbol::new("N", DType::Int64)).unwrap();
        sdfg.mirror_symbol(Symbol::new("N", DType::Int64));
        sdfg.mirror_symbol(Symbol::new("M", DType::Int64));
        assert_eq!(sdfg.symbols().count(), 2);
    }
}
