//! The graph builder.
//!
//! [`Collector`] walks a [`Program`] outside-in. Each instruction kind has a
//! fixed rule producing nodes and edges; every operand and result is wired
//! through the scope resolution engine (`lookup`, `route_write`,
//! `add_dependency`) of the state being built, and every map or consume
//! scope is closed once its body has been collected.

use indexmap::IndexMap;
use tracing::debug;

use sdfg_core::node::{LibraryNode, NestedSdfgNode, TaskletNode};
use sdfg_core::{
    sanitize_name, Array, Assignment, Code, CodeLanguage, Connector, ConnectorNode,
    ContainerBinding, ContainerResolver, DType, Dim, InterstateEdge, Location,
    MultiEdge, NameService, NodeId, NodeKind, Range, ScopeId, Sdfg, State, StateId, Symbol,
    WriteTarget,
};

use crate::error::{AtLocation, TranslateError};
use crate::ir::{
    AllocOp, ConsumeOp, ContainerType, CopyOp, DimSpec, EdgeOp, LibCallOp, LoadOp, MapOp,
    NestedSdfgOp, Op, Program, SdfgOp, StateOp, StoreOp, StreamPopOp, StreamPushOp, SymOp,
    TaskletOp, TypedValue,
};
use crate::lift::{index_expr, output_name, source_text, tasklet_label, ExpressionLifter};
use crate::TranslateOptions;

/// Where an instruction is being collected.
#[derive(Debug, Clone, Copy)]
struct Cx {
    state: StateId,
    scope: ScopeId,
    /// Describes the enclosing block in error messages.
    context: &'static str,
}

fn state_mut<'s>(
    sdfg: &'s mut Sdfg,
    cx: Cx,
    loc: &Location,
) -> Result<&'s mut State, TranslateError> {
    sdfg.state_mut(cx.state).at(loc)
}

fn lookup(
    sdfg: &mut Sdfg,
    cx: Cx,
    value: &str,
    loc: &Location,
) -> Result<Connector, TranslateError> {
    let (state, containers) = sdfg.scope_parts(cx.state).at(loc)?;
    state.lookup(cx.scope, value, containers).at(loc)
}

/// Converts an exclusive upper bound into the inclusive end of a range.
fn inclusive_end(upper: &str) -> String {
    let upper = upper.trim();
    match upper.parse::<i64>().ok().and_then(|n| n.checked_sub(1)) {
        Some(end) => end.to_string(),
        None => format!("{} - 1", upper),
    }
}

/// Translates program trees into SDFGs.
pub struct Collector<'a> {
    options: &'a TranslateOptions,
    lifter: &'a dyn ExpressionLifter,
    names: NameService,
}

impl<'a> Collector<'a> {
    pub fn new(options: &'a TranslateOptions, lifter: &'a dyn ExpressionLifter) -> Self {
        Collector {
            options,
            lifter,
            names: NameService::new(),
        }
    }

    /// Builds the SDFG of a program, which must hold exactly one top-level
    /// unit.
    pub fn collect_program(&mut self, program: &Program) -> Result<Sdfg, TranslateError> {
        let unit = match program.sdfgs.as_slice() {
            [unit] => unit,
            units => {
                return Err(TranslateError::TopLevelCount {
                    count: units.len(),
                    location: units.get(1).map(|u| u.location.clone()).unwrap_or_default(),
                })
            }
        };

        let list_id = self.names.next_id();
        let name = match &self.options.sdfg_name {
            Some(name) => {
                self.names.reserve(name);
                name.clone()
            }
            None => self.names.generate_name("sdfg"),
        };

        let mut sdfg = Sdfg::new(&name, list_id, unit.location.clone());
        self.collect_sdfg(&mut sdfg, unit, &[])?;
        debug!(sdfg = %sdfg.name, states = sdfg.state_count(), "built sdfg");
        Ok(sdfg)
    }

    // -----------------------------------------------------------------------
    // SDFG level
    // -----------------------------------------------------------------------

    /// Builds `unit` into `sdfg`. `inherited` are the symbols of an
    /// enclosing SDFG; the unit may redeclare them.
    fn collect_sdfg(
        &mut self,
        sdfg: &mut Sdfg,
        unit: &SdfgOp,
        inherited: &[Symbol],
    ) -> Result<(), TranslateError> {
        for op in &unit.body {
            match op {
                Op::AllocSymbol(sym) => {
                    sdfg.add_symbol(Symbol::new(sym.sym.clone(), DType::Int64))
                        .at(&sym.location)?;
                }
                Op::Alloc(_) | Op::State(_) | Op::Edge(_) => {}
                other => {
                    return Err(TranslateError::Misplaced {
                        op: other.name(),
                        context: "at sdfg level",
                        location: other.location().clone(),
                    })
                }
            }
        }

        for symbol in inherited {
            sdfg.mirror_symbol(symbol.clone());
        }

        for arg in &unit.args {
            let data = sanitize_name(&arg.name);
            let array = self.array(sdfg, &data, &arg.ty, false, &unit.location)?;
            sdfg.add_arg(array).at(&unit.location)?;
            self.names.reserve(&data);
            sdfg.bind_container(&arg.name, ContainerBinding { data, init: false });
        }

        for op in &unit.body {
            if let Op::Alloc(alloc) = op {
                self.alloc(sdfg, alloc)?;
            }
        }

        for op in &unit.body {
            if let Op::State(state) = op {
                self.collect_state(sdfg, state)?;
            }
        }

        let start = match &unit.entry {
            Some(entry) => sdfg.lookup_state(entry).at(&unit.location)?,
            None if sdfg.state_count() > 0 => StateId(0),
            None => {
                return Err(TranslateError::MissingStartState {
                    location: unit.location.clone(),
                })
            }
        };
        sdfg.set_start_state(start).at(&unit.location)?;

        for op in &unit.body {
            if let Op::Edge(edge) = op {
                self.collect_edge(sdfg, edge)?;
            }
        }

        Ok(())
    }

    /// Builds a container descriptor, resolving symbolic dimensions.
    fn array(
        &self,
        sdfg: &Sdfg,
        name: &str,
        ty: &ContainerType,
        transient: bool,
        loc: &Location,
    ) -> Result<Array, TranslateError> {
        let dtype = DType::parse(&ty.element).ok_or_else(|| TranslateError::UnsupportedType {
            ty: ty.element.clone(),
            location: loc.clone(),
        })?;

        let shape = ty
            .shape
            .iter()
            .map(|dim| match dim {
                DimSpec::Int(n) => Ok(Dim::Const(*n)),
                DimSpec::Sym(s) if sdfg.has_symbol(s) => Ok(Dim::Symbol(s.clone())),
                DimSpec::Sym(s) => Err(TranslateError::UnresolvedSymbol {
                    name: s.clone(),
                    location: loc.clone(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let array = Array::new(name, transient, dtype, shape);
        Ok(if ty.stream { array.into_stream() } else { array })
    }

    fn alloc(&mut self, sdfg: &mut Sdfg, op: &AllocOp) -> Result<(), TranslateError> {
        let data = sanitize_name(op.name.as_deref().unwrap_or(&op.result));
        let array = self.array(sdfg, &data, &op.ty, op.transient, &op.location)?;
        sdfg.add_array(array).at(&op.location)?;
        self.names.reserve(&data);
        sdfg.bind_container(
            &op.result,
            ContainerBinding {
                data,
                init: op.init,
            },
        );
        Ok(())
    }

    fn collect_state(&mut self, sdfg: &mut Sdfg, op: &StateOp) -> Result<(), TranslateError> {
        let id = sdfg.add_state(&op.name, op.location.clone()).at(&op.location)?;
        let cx = Cx {
            state: id,
            scope: ScopeId::STATE,
            context: "in a state",
        };
        self.collect_block(sdfg, cx, &op.body)?;
        debug!(state = %op.name, id = %id, "collected state");
        Ok(())
    }

    fn collect_edge(&mut self, sdfg: &mut Sdfg, op: &EdgeOp) -> Result<(), TranslateError> {
        let loc = &op.location;
        let src = sdfg.lookup_state(&op.src).at(loc)?;
        let dst = sdfg.lookup_state(&op.dst).at(loc)?;

        let mut edge = InterstateEdge::new(src, dst, loc.clone());
        if let Some(condition) = op.condition.as_deref().map(str::trim) {
            if !condition.is_empty() {
                edge = edge.with_condition(condition);
            }
        }
        for text in &op.assign {
            let assignment =
                Assignment::parse(text).ok_or_else(|| TranslateError::MalformedAssignment {
                    text: text.clone(),
                    location: loc.clone(),
                })?;
            edge.add_assignment(assignment);
        }

        sdfg.add_edge(edge).at(loc)
    }

    // -----------------------------------------------------------------------
    // Blocks
    // -----------------------------------------------------------------------

    fn collect_block(&mut self, sdfg: &mut Sdfg, cx: Cx, ops: &[Op]) -> Result<(), TranslateError> {
        for op in ops {
            self.collect_op(sdfg, cx, op)?;
        }
        Ok(())
    }

    fn collect_op(&mut self, sdfg: &mut Sdfg, cx: Cx, op: &Op) -> Result<(), TranslateError> {
        match op {
            Op::Alloc(alloc) => self.alloc(sdfg, alloc),
            Op::Tasklet(tasklet) => self.tasklet(sdfg, cx, tasklet),
            Op::NestedSdfg(nested) => self.nested_sdfg(sdfg, cx, nested),
            Op::Copy(copy) => self.copy(sdfg, cx, copy),
            Op::Store(store) => self.store(sdfg, cx, store),
            Op::Load(load) => self.load(sdfg, cx, load),
            Op::Map(map) => self.map(sdfg, cx, map),
            Op::Consume(consume) => self.consume(sdfg, cx, consume),
            Op::LibCall(call) => self.lib_call(sdfg, cx, call),
            Op::StreamPush(push) => self.stream_push(sdfg, cx, push),
            Op::StreamPop(pop) => self.stream_pop(sdfg, cx, pop),
            Op::Sym(sym) => self.sym(sdfg, cx, sym),
            Op::AllocSymbol(_) | Op::State(_) | Op::Edge(_) => Err(TranslateError::Misplaced {
                op: op.name(),
                context: cx.context,
                location: op.location().clone(),
            }),
            Op::StreamLength(_) | Op::ViewCast(_) | Op::Subview(_) => {
                Err(TranslateError::UnsupportedOp {
                    op: op.name(),
                    location: op.location().clone(),
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Wiring helpers
    // -----------------------------------------------------------------------

    /// Gives a result a home: a fresh transient container, written through
    /// an access node that becomes the result's binding in this scope.
    fn materialize(
        &mut self,
        sdfg: &mut Sdfg,
        cx: Cx,
        from: Connector,
        result: &TypedValue,
        loc: &Location,
    ) -> Result<(), TranslateError> {
        let dtype = DType::parse(&result.element).ok_or_else(|| TranslateError::UnsupportedType {
            ty: result.element.clone(),
            location: loc.clone(),
        })?;
        let data = self.names.generate_name("tmp");
        sdfg.add_array(Array::transient_scalar(&data, dtype)).at(loc)?;
        sdfg.bind_container(
            &result.name,
            ContainerBinding {
                data: data.clone(),
                init: false,
            },
        );

        let state = state_mut(sdfg, cx, loc)?;
        let access = state
            .add_node(cx.scope, ConnectorNode::access(&data, false, loc.clone()))
            .at(loc)?;
        let access_in = Connector::null(access).with_data(data.clone());
        state.add_in_connector(&access_in).at(loc)?;
        state
            .add_edge(cx.scope, MultiEdge::new(from, access_in, loc.clone()))
            .at(loc)?;

        let access_out = Connector::null(access).with_data(data);
        state.add_out_connector(&access_out).at(loc)?;
        state.map_value(cx.scope, &result.name, access_out).at(loc)
    }

    /// Wires `value` into a new named input port on `node`.
    fn wire_input(
        &mut self,
        sdfg: &mut Sdfg,
        cx: Cx,
        node: NodeId,
        port: String,
        value: &str,
        loc: &Location,
    ) -> Result<(), TranslateError> {
        let src = lookup(sdfg, cx, value, loc)?;
        let dst = Connector::named(node, port);
        let state = state_mut(sdfg, cx, loc)?;
        state.add_in_connector(&dst).at(loc)?;
        state
            .add_edge(cx.scope, MultiEdge::new(src, dst, loc.clone()))
            .at(loc)?;
        Ok(())
    }

    /// Adds a named output port on `node` and materializes `result` from it.
    fn wire_output(
        &mut self,
        sdfg: &mut Sdfg,
        cx: Cx,
        node: NodeId,
        port: String,
        result: &TypedValue,
        loc: &Location,
    ) -> Result<(), TranslateError> {
        let src = Connector::named(node, port);
        state_mut(sdfg, cx, loc)?.add_out_connector(&src).at(loc)?;
        self.materialize(sdfg, cx, src, result, loc)
    }

    /// Orders `node` after the producers of `after`.
    fn dependencies(
        &mut self,
        sdfg: &mut Sdfg,
        cx: Cx,
        node: NodeId,
        after: &[String],
        loc: &Location,
    ) -> Result<(), TranslateError> {
        if after.is_empty() {
            return Ok(());
        }
        let port = Connector::null(node);
        let (state, containers) = sdfg.scope_parts(cx.state).at(loc)?;
        state.add_in_connector(&port).at(loc)?;
        for value in after {
            state
                .add_dependency(cx.scope, value, port.clone(), containers)
                .at(loc)?;
        }
        Ok(())
    }

    /// Resolves the container written or read through `value`.
    ///
    /// With `indices`, the index list must match the container rank and
    /// becomes the target subset.
    fn target(
        &self,
        sdfg: &Sdfg,
        value: &str,
        indices: Option<&[String]>,
        loc: &Location,
    ) -> Result<WriteTarget, TranslateError> {
        let binding = sdfg
            .containers()
            .resolve(value)
            .ok_or_else(|| TranslateError::NotAContainer {
                value: value.to_string(),
                location: loc.clone(),
            })?;

        let Some(indices) = indices else {
            return Ok(WriteTarget::new(binding, Vec::new()));
        };

        let rank = sdfg.array(&binding.data).map_or(0, |a| a.rank());
        if indices.len() != rank {
            return Err(TranslateError::RankMismatch {
                data: binding.data,
                rank,
                indices: indices.len(),
                location: loc.clone(),
            });
        }
        let ranges = indices.iter().map(|i| Range::index(index_expr(i))).collect();
        Ok(WriteTarget::new(binding, ranges))
    }

    // -----------------------------------------------------------------------
    // Compute
    // -----------------------------------------------------------------------

    fn tasklet(&mut self, sdfg: &mut Sdfg, cx: Cx, op: &TaskletOp) -> Result<(), TranslateError> {
        let loc = &op.location;
        if op.args.len() != op.operands.len() {
            return Err(TranslateError::ArityMismatch {
                what: "tasklet",
                expected: op.args.len(),
                found: op.operands.len(),
                location: loc.clone(),
            });
        }
        if op.results.len() > 1 {
            return Err(TranslateError::MultipleReturnValues {
                count: op.results.len(),
                location: loc.clone(),
            });
        }

        let lifted = if self.options.lift_tasklets {
            self.lifter.lift(op)
        } else {
            None
        };
        let code = match lifted {
            Some(python) => Code::python(python),
            None => {
                debug!(location = %loc, "tasklet not lifted, embedding source text");
                Code::new(source_text(op), CodeLanguage::Mlir)
            }
        };

        let node = ConnectorNode::new(
            tasklet_label(op),
            NodeKind::Tasklet(TaskletNode::new(code)),
            loc.clone(),
        );
        let id = state_mut(sdfg, cx, loc)?.add_node(cx.scope, node).at(loc)?;

        for (arg, operand) in op.args.iter().zip(&op.operands) {
            self.wire_input(sdfg, cx, id, sanitize_name(arg), operand, loc)?;
        }
        for (i, result) in op.results.iter().enumerate() {
            self.wire_output(sdfg, cx, id, output_name(i), result, loc)?;
        }
        self.dependencies(sdfg, cx, id, &op.after, loc)
    }

    fn sym(&mut self, sdfg: &mut Sdfg, cx: Cx, op: &SymOp) -> Result<(), TranslateError> {
        let loc = &op.location;
        let code = Code::python(format!("{} = {}", output_name(0), op.expr));
        let kind = NodeKind::Tasklet(TaskletNode::new(code));
        let node = ConnectorNode::new("sym", kind, loc.clone());
        let id = state_mut(sdfg, cx, loc)?.add_node(cx.scope, node).at(loc)?;
        self.wire_output(sdfg, cx, id, output_name(0), &op.result, loc)
    }

    fn lib_call(&mut self, sdfg: &mut Sdfg, cx: Cx, op: &LibCallOp) -> Result<(), TranslateError> {
        let loc = &op.location;
        let label = op.callee.rsplit('.').next().unwrap_or(&op.callee);
        let node = ConnectorNode::new(
            label,
            NodeKind::Library(LibraryNode {
                classpath: op.callee.clone(),
            }),
            loc.clone(),
        );
        let id = state_mut(sdfg, cx, loc)?.add_node(cx.scope, node).at(loc)?;

        for (i, operand) in op.operands.iter().enumerate() {
            self.wire_input(sdfg, cx, id, format!("_in{}", i), operand, loc)?;
        }
        for (i, result) in op.results.iter().enumerate() {
            self.wire_output(sdfg, cx, id, format!("_out{}", i), result, loc)?;
        }
        self.dependencies(sdfg, cx, id, &op.after, loc)
    }

    fn nested_sdfg(
        &mut self,
        sdfg: &mut Sdfg,
        cx: Cx,
        op: &NestedSdfgOp,
    ) -> Result<(), TranslateError> {
        let loc = &op.location;
        let unit = &op.sdfg;
        if unit.args.len() != op.operands.len() {
            return Err(TranslateError::ArityMismatch {
                what: "nested sdfg",
                expected: unit.args.len(),
                found: op.operands.len(),
                location: loc.clone(),
            });
        }

        let list_id = self.names.next_id();
        let name = self.names.generate_name("sdfg");
        let mut inner = Sdfg::new(&name, list_id, unit.location.clone());
        let inherited: Vec<Symbol> = sdfg.symbols().cloned().collect();
        let symbol_mapping: IndexMap<String, String> = inherited
            .iter()
            .map(|symbol| (symbol.name.clone(), symbol.name.clone()))
            .collect();
        self.collect_sdfg(&mut inner, unit, &inherited)?;
        inner.set_nested_transient();

        let label = self.names.generate_name("nested_sdfg");
        let node = ConnectorNode::new(
            &label,
            NodeKind::NestedSdfg(NestedSdfgNode {
                sdfg: Box::new(inner),
                symbol_mapping,
            }),
            loc.clone(),
        );
        let id = state_mut(sdfg, cx, loc)?.add_node(cx.scope, node).at(loc)?;

        for (arg, operand) in unit.args.iter().zip(&op.operands) {
            let port = sanitize_name(&arg.name);
            self.wire_input(sdfg, cx, id, port.clone(), operand, loc)?;

            if unit.writes(&arg.name) {
                let target = self.target(sdfg, operand, None, loc)?;
                let out = Connector::named(id, port).with_data(target.data.clone());
                let state = state_mut(sdfg, cx, loc)?;
                state.add_out_connector(&out).at(loc)?;
                state.route_write(cx.scope, out, target, operand).at(loc)?;
            }
        }
        self.dependencies(sdfg, cx, id, &op.after, loc)
    }

    // -----------------------------------------------------------------------
    // Data movement
    // -----------------------------------------------------------------------

    fn copy(&mut self, sdfg: &mut Sdfg, cx: Cx, op: &CopyOp) -> Result<(), TranslateError> {
        let loc = &op.location;
        let from = lookup(sdfg, cx, &op.src, loc)?;
        let target = self.target(sdfg, &op.dst, None, loc)?;
        state_mut(sdfg, cx, loc)?
            .route_write(cx.scope, from, target, &op.dst)
            .at(loc)
    }

    fn store(&mut self, sdfg: &mut Sdfg, cx: Cx, op: &StoreOp) -> Result<(), TranslateError> {
        let loc = &op.location;
        let target = self.target(sdfg, &op.array, Some(op.indices.as_slice()), loc)?;
        let from = lookup(sdfg, cx, &op.value, loc)?;
        state_mut(sdfg, cx, loc)?
            .route_write(cx.scope, from, target, &op.array)
            .at(loc)
    }

    fn load(&mut self, sdfg: &mut Sdfg, cx: Cx, op: &LoadOp) -> Result<(), TranslateError> {
        let loc = &op.location;
        let target = self.target(sdfg, &op.array, Some(op.indices.as_slice()), loc)?;
        let connector = lookup(sdfg, cx, &op.array, loc)?.with_ranges(target.ranges);
        state_mut(sdfg, cx, loc)?
            .map_value(cx.scope, &op.result, connector)
            .at(loc)
    }

    fn stream_push(
        &mut self,
        sdfg: &mut Sdfg,
        cx: Cx,
        op: &StreamPushOp,
    ) -> Result<(), TranslateError> {
        let loc = &op.location;
        let target = self.target(sdfg, &op.stream, None, loc)?;
        let from = lookup(sdfg, cx, &op.value, loc)?;
        state_mut(sdfg, cx, loc)?
            .route_write(cx.scope, from, target, &op.stream)
            .at(loc)
    }

    fn stream_pop(
        &mut self,
        sdfg: &mut Sdfg,
        cx: Cx,
        op: &StreamPopOp,
    ) -> Result<(), TranslateError> {
        let loc = &op.location;
        let connector = lookup(sdfg, cx, &op.stream, loc)?;
        state_mut(sdfg, cx, loc)?
            .map_value(cx.scope, &op.result, connector)
            .at(loc)
    }

    // -----------------------------------------------------------------------
    // Iteration scopes
    // -----------------------------------------------------------------------

    fn map(&mut self, sdfg: &mut Sdfg, cx: Cx, op: &MapOp) -> Result<(), TranslateError> {
        let loc = &op.location;
        let params = op.params.len();
        for found in [op.lower.len(), op.upper.len(), op.steps.len()] {
            if found != params {
                return Err(TranslateError::ArityMismatch {
                    what: "map bounds",
                    expected: params,
                    found,
                    location: loc.clone(),
                });
            }
        }

        let ranges = op
            .lower
            .iter()
            .zip(&op.upper)
            .zip(&op.steps)
            .map(|((lower, upper), step)| {
                Range::new(lower.trim(), inclusive_end(upper), step.trim())
            })
            .collect();

        let label = self.names.generate_name("map");
        let body = state_mut(sdfg, cx, loc)?
            .open_map(cx.scope, &label, op.params.clone(), ranges, loc.clone())
            .at(loc)?;

        let inner = Cx {
            scope: body,
            context: "in a map",
            ..cx
        };
        self.collect_block(sdfg, inner, &op.body)?;
        state_mut(sdfg, cx, loc)?.close_scope(body).at(loc)
    }

    fn consume(&mut self, sdfg: &mut Sdfg, cx: Cx, op: &ConsumeOp) -> Result<(), TranslateError> {
        let loc = &op.location;
        if let Some(num_pes) = &op.num_pes {
            if matches!(num_pes.trim().parse::<i64>(), Ok(n) if n <= 0) {
                return Err(TranslateError::InvalidPeCount {
                    value: num_pes.clone(),
                    location: loc.clone(),
                });
            }
        }
        self.target(sdfg, &op.stream, None, loc)?;

        let condition = op
            .condition
            .as_deref()
            .map(Code::python)
            .unwrap_or_default();
        let label = self.names.generate_name("consume");
        let body = state_mut(sdfg, cx, loc)?
            .open_consume(
                cx.scope,
                &label,
                op.num_pes.clone(),
                op.pe.clone(),
                condition,
                loc.clone(),
            )
            .at(loc)?;

        let inner = Cx {
            scope: body,
            context: "in a consume scope",
            ..cx
        };
        let element = lookup(sdfg, inner, &op.stream, loc)?;
        state_mut(sdfg, cx, loc)?
            .map_value(body, &op.elem, element)
            .at(loc)?;

        self.collect_block(sdfg, inner, &op.body)?;
        state_mut(sdfg, cx, loc)?.close_scope(body).at(loc)
    }
}
