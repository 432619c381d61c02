//! JSON serialization of a finished SDFG.
//!
//! The output follows the document schema of the data-centric toolchain
//! that consumes it: every graph object is `{"type", ..., "attributes"}`,
//! node IDs are per-state sequential integers, edge endpoints are node IDs
//! rendered as strings and null connectors are JSON `null`.

use serde_json::{json, Map, Value};

use crate::edge::{InterstateEdge, MultiEdge};
use crate::id::{NodeId, StateId};
use crate::node::{ConnectorNode, NodeKind};
use crate::sdfg::Sdfg;
use crate::state::State;
use crate::types::{Array, Code, Location, Range};

/// Serializes SDFGs to JSON values.
#[derive(Debug, Clone, Copy)]
pub struct Emitter {
    /// Attach `debuginfo` objects to graph elements with a known location.
    pub debuginfo: bool,
}

impl Default for Emitter {
    fn default() -> Self {
        Emitter { debuginfo: true }
    }
}

impl Emitter {
    pub fn new(debuginfo: bool) -> Self {
        Emitter { debuginfo }
    }

    /// Emits a complete SDFG document.
    pub fn sdfg(&self, sdfg: &Sdfg) -> Value {
        let mut attributes = Map::new();
        self.push_debuginfo(&mut attributes, &sdfg.location);
        attributes.insert("name".into(), json!(sdfg.name));
        attributes.insert("arg_names".into(), json!(sdfg.args()));
        attributes.insert("constants_prop".into(), json!({}));

        let arrays: Map<String, Value> = sdfg
            .arrays()
            .map(|a| (a.name.clone(), array(a, sdfg.is_arg(&a.name))))
            .collect();
        attributes.insert("_arrays".into(), Value::Object(arrays));

        let symbols: Map<String, Value> = sdfg
            .symbols()
            .map(|s| (s.name.clone(), json!(s.dtype.as_str())))
            .collect();
        attributes.insert("symbols".into(), Value::Object(symbols));

        let nodes: Vec<Value> = sdfg.states().map(|(id, s)| self.state(id, s)).collect();
        let edges: Vec<Value> = sdfg
            .edges()
            .iter()
            .map(|e| self.interstate_edge(e))
            .collect();

        json!({
            "type": "SDFG",
            "sdfg_list_id": sdfg.list_id,
            "start_state": sdfg.start_state().map(|s| s.0),
            "attributes": attributes,
            "nodes": nodes,
            "edges": edges,
        })
    }

    fn state(&self, id: StateId, state: &State) -> Value {
        let mut attributes = Map::new();
        self.push_debuginfo(&mut attributes, &state.location);

        let nodes: Vec<Value> = state.nodes().map(|(nid, n)| self.node(nid, n)).collect();
        let edges: Vec<Value> = state.edges().map(|(_, e)| self.multi_edge(e)).collect();

        json!({
            "type": "SDFGState",
            "label": state.label,
            "id": id.0,
            "attributes": attributes,
            "nodes": nodes,
            "edges": edges,
        })
    }

    fn node(&self, id: NodeId, node: &ConnectorNode) -> Value {
        let mut attributes = Map::new();
        self.push_debuginfo(&mut attributes, &node.location);

        let mut object = Map::new();
        object.insert("type".into(), json!(node.kind.type_name()));

        match &node.kind {
            NodeKind::Access(access) => {
                object.insert("label".into(), json!(node.label));
                attributes.insert("data".into(), json!(access.data));
                attributes.insert("setzero".into(), json!(access.init));
            }
            NodeKind::Tasklet(tasklet) => {
                object.insert("label".into(), json!(node.label));
                attributes.insert("label".into(), json!(node.label));
                attributes.insert("code".into(), code(&tasklet.code));
                attributes.insert("code_global".into(), code(&tasklet.code_global));
                attributes.insert("side_effects".into(), json!(tasklet.side_effects));
            }
            NodeKind::Library(library) => {
                object.insert("label".into(), json!(node.label));
                object.insert("classpath".into(), json!(library.classpath));
                attributes.insert("name".into(), json!(node.label));
            }
            NodeKind::NestedSdfg(nested) => {
                attributes.insert("label".into(), json!(node.label));
                attributes.insert("symbol_mapping".into(), json!(nested.symbol_mapping));
            }
            NodeKind::MapEntry(map) => {
                object.insert("label".into(), json!(node.label));
                object.insert("scope_exit".into(), json!(map.exit.to_string()));
                attributes.insert("label".into(), json!(node.label));
                attributes.insert("params".into(), json!(map.params));
                attributes.insert("range".into(), ranges(&map.ranges));
            }
            NodeKind::ConsumeEntry(consume) => {
                object.insert("label".into(), json!(node.label));
                object.insert("scope_exit".into(), json!(consume.exit.to_string()));
                attributes.insert("label".into(), json!(node.label));
                attributes.insert("num_pes".into(), json!(consume.num_pes));
                attributes.insert("pe_index".into(), json!(consume.pe_index));
                attributes.insert("condition".into(), code(&consume.condition));
            }
            NodeKind::MapExit(exit) | NodeKind::ConsumeExit(exit) => {
                object.insert("label".into(), json!(node.label));
                object.insert("scope_entry".into(), json!(exit.entry.to_string()));
                object.insert("scope_exit".into(), json!(id.to_string()));
            }
        }

        object.insert("id".into(), json!(id.0));
        attributes.insert("in_connectors".into(), connectors(node.in_connectors()));
        attributes.insert("out_connectors".into(), connectors(node.out_connectors()));

        if let NodeKind::NestedSdfg(nested) = &node.kind {
            attributes.insert("sdfg".into(), self.sdfg(&nested.sdfg));
        }

        object.insert("attributes".into(), Value::Object(attributes));
        Value::Object(object)
    }

    fn multi_edge(&self, edge: &MultiEdge) -> Value {
        let endpoint = |name: &Option<String>| match name {
            Some(n) if !edge.dependency => json!(n),
            _ => Value::Null,
        };

        let memlet = json!({
            "type": "Memlet",
            "attributes": {
                "data": edge.data(),
                "volume": edge.volume(),
                "subset": ranges(edge.src_subset()),
                "src_subset": ranges(edge.src_subset()),
                "other_subset": ranges(edge.dst_subset()),
                "dst_subset": ranges(edge.dst_subset()),
            },
        });

        let mut attributes = Map::new();
        self.push_debuginfo(&mut attributes, &edge.location);
        attributes.insert("data".into(), memlet);

        json!({
            "type": "MultiConnectorEdge",
            "src": edge.src.node.to_string(),
            "dst": edge.dst.node.to_string(),
            "src_connector": endpoint(&edge.src.name),
            "dst_connector": endpoint(&edge.dst.name),
            "attributes": attributes,
        })
    }

    fn interstate_edge(&self, edge: &InterstateEdge) -> Value {
        let assignments: Map<String, Value> = edge
            .assignments
            .iter()
            .map(|a| (a.key.clone(), json!(a.value)))
            .collect();

        let mut attributes = Map::new();
        self.push_debuginfo(&mut attributes, &edge.location);
        attributes.insert(
            "data".into(),
            json!({
                "type": "InterstateEdge",
                "attributes": {
                    "assignments": assignments,
                    "condition": code(&Code::python(edge.condition.clone())),
                },
            }),
        );

        json!({
            "type": "Edge",
            "src": edge.src.to_string(),
            "dst": edge.dst.to_string(),
            "attributes": attributes,
        })
    }

    fn push_debuginfo(&self, attributes: &mut Map<String, Value>, location: &Location) {
        if !self.debuginfo || location.is_unknown() {
            return;
        }
        attributes.insert(
            "debuginfo".into(),
            json!({
                "type": "DebugInfo",
                "start_line": location.line,
                "end_line": location.line,
                "start_column": location.col,
                "end_column": location.col,
                "filename": location.file,
            }),
        );
    }
}

fn code(code: &Code) -> Value {
    json!({
        "string_data": code.data,
        "language": code.language.as_str(),
    })
}

fn ranges(ranges: &[Range]) -> Value {
    if ranges.is_empty() {
        return Value::Null;
    }
    let list: Vec<Value> = ranges
        .iter()
        .map(|r| {
            json!({
                "start": r.start,
                "end": r.end,
                "step": r.step,
                "tile": r.tile,
            })
        })
        .collect();
    json!({ "type": "Range", "ranges": list })
}

fn connectors(defs: &[crate::connector::ConnectorDef]) -> Value {
    let named: Map<String, Value> = defs
        .iter()
        .filter_map(|c| c.name.clone())
        .map(|name| (name, Value::Null))
        .collect();
    Value::Object(named)
}

fn array(array: &Array, is_arg: bool) -> Value {
    let kind = if array.stream {
        "Stream"
    } else if array.rank() == 0 && !is_arg {
        "Scalar"
    } else {
        "Array"
    };

    let mut attributes = Map::new();
    attributes.insert("transient".into(), json!(array.transient));
    attributes.insert("dtype".into(), json!(array.dtype.as_str()));
    if array.shape.is_empty() {
        attributes.insert("shape".into(), json!(["1"]));
    } else {
        let shape: Vec<String> = array.shape.iter().map(|d| d.to_string()).collect();
        attributes.insert("shape".into(), json!(shape));
        attributes.insert("strides".into(), json!(array.strides()));
    }

    json!({ "type": kind, "attributes": attributes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::Connector;
    use crate::edge::Assignment;
    use crate::id::ScopeId;
    use crate::types::{DType, Dim};

    fn two_state_sdfg() -> Sdfg {
        let mut sdfg = Sdfg::new("sdfg_0", 0, Location::new("prog.mlir", 1, 1));
        sdfg.add_arg(Array::new(
            "A",
            false,
            DType::Float64,
            vec![Dim::Const(4), Dim::Symbol("N".into())],
        ))
        .unwrap();
        sdfg.add_array(Array::transient_scalar("tmp_0", DType::Float64))
            .unwrap();
        sdfg.add_symbol(crate::types::Symbol::new("N", DType::Int64))
            .unwrap();
        let s0 = sdfg.add_state("init", Location::default()).unwrap();
        let s1 = sdfg.add_state("body", Location::default()).unwrap();
        sdfg.set_start_state(s0).unwrap();
        let mut edge = InterstateEdge::new(s0, s1, Location::default()).with_condition("N > 0");
        edge.add_assignment(Assignment::new("i", "0"));
        sdfg.add_edge(edge).unwrap();
        sdfg
    }

    #[test]
    fn sdfg_document_shape() {
        let doc = Emitter::default().sdfg(&two_state_sdfg());
        assert_eq!(doc["type"], "SDFG");
        assert_eq!(doc["sdfg_list_id"], 0);
        assert_eq!(doc["start_state"], 0);
        assert_eq!(doc["attributes"]["name"], "sdfg_0");
        assert_eq!(doc["attributes"]["arg_names"], json!(["A"]));
        assert_eq!(doc["attributes"]["symbols"]["N"], "int64");
        assert_eq!(doc["attributes"]["debuginfo"]["filename"], "prog.mlir");
        assert_eq!(doc["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(doc["nodes"][1]["type"], "SDFGState");
        assert_eq!(doc["nodes"][1]["id"], 1);
    }

    #[test]
    fn arrays_carry_strides_and_kind() {
        let doc = Emitter::default().sdfg(&two_state_sdfg());
        let arrays = &doc["attributes"]["_arrays"];
        assert_eq!(arrays["A"]["type"], "Array");
        assert_eq!(arrays["A"]["attributes"]["shape"], json!(["4", "N"]));
        assert_eq!(arrays["A"]["attributes"]["strides"], json!(["N", "1"]));
        assert_eq!(arrays["tmp_0"]["type"], "Scalar");
        assert_eq!(arrays["tmp_0"]["attributes"]["shape"], json!(["1"]));
        assert_eq!(arrays["tmp_0"]["attributes"]["transient"], true);
        assert!(arrays["tmp_0"]["attributes"].get("strides").is_none());
    }

    #[test]
    fn interstate_edge_shape() {
        let doc = Emitter::default().sdfg(&two_state_sdfg());
        let edge = &doc["edges"][0];
        assert_eq!(edge["type"], "Edge");
        assert_eq!(edge["src"], "0");
        assert_eq!(edge["dst"], "1");
        let data = &edge["attributes"]["data"];
        assert_eq!(data["type"], "InterstateEdge");
        assert_eq!(data["attributes"]["assignments"]["i"], "0");
        assert_eq!(data["attributes"]["condition"]["string_data"], "N > 0");
        assert_eq!(data["attributes"]["condition"]["language"], "Python");
    }

    #[test]
    fn null_connectors_emit_as_json_null() {
        let mut state = State::new("s", Location::default());
        let a = state
            .add_node(ScopeId::STATE, ConnectorNode::access("A", false, Location::default()))
            .unwrap();
        let b = state
            .add_node(ScopeId::STATE, ConnectorNode::access("B", true, Location::default()))
            .unwrap();
        let src = Connector::null(a)
            .with_data("A")
            .with_ranges(vec![Range::new("0", "3", "1")]);
        state.add_out_connector(&src).unwrap();
        state
            .add_edge(
                ScopeId::STATE,
                MultiEdge::new(src, Connector::null(b).with_data("B"), Location::default()),
            )
            .unwrap();

        let value = Emitter::default().state(StateId(0), &state);
        let edge = &value["edges"][0];
        assert_eq!(edge["type"], "MultiConnectorEdge");
        assert_eq!(edge["src"], "0");
        assert!(edge["src_connector"].is_null());
        let memlet = &edge["attributes"]["data"]["attributes"];
        assert_eq!(memlet["data"], "A");
        assert_eq!(memlet["volume"], "4");
        assert_eq!(memlet["subset"]["type"], "Range");
        assert!(memlet["dst_subset"].is_null());

        let access = &value["nodes"][1];
        assert_eq!(access["attributes"]["setzero"], true);
        assert_eq!(access["attributes"]["out_connectors"], json!({}));
    }

    #[test]
    fn debuginfo_can_be_disabled() {
        let doc = Emitter::new(false).sdfg(&two_state_sdfg());
        assert!(doc["attributes"].get("debuginfo").is_none());
    }
}
