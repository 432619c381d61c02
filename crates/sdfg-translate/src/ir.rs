//! Input program tree.
//!
//! A [`Program`] is the parsed, block-structured dataflow program handed to
//! the translator: top-level SDFG units containing containers, symbols,
//! states and control edges, with states holding compute instructions and
//! nested iteration scopes. Values are referred to by name.
//!
//! The tree is deserialized from JSON; every op is an object tagged by its
//! `"op"` field:
//!
//! ```json
//! { "op": "store", "value": "%0", "array": "A", "indices": ["i"] }
//! ```

use serde::{Deserialize, Serialize};

use sdfg_core::Location;

/// Name of an SSA value in the source program.
pub type ValueName = String;

/// The whole input: a list of top-level SDFG units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub sdfgs: Vec<SdfgOp>,
}

/// One SDFG unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SdfgOp {
    #[serde(default)]
    pub args: Vec<Argument>,
    /// Name of the start state; the first state if absent.
    #[serde(default)]
    pub entry: Option<String>,
    #[serde(default)]
    pub body: Vec<Op>,
    #[serde(default)]
    pub location: Location,
}

/// An SDFG argument: a value bound to an externally visible container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: ValueName,
    #[serde(rename = "type")]
    pub ty: ContainerType,
}

/// Type of a data container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerType {
    /// Element type name, e.g. `f64` or `index`.
    pub element: String,
    #[serde(default)]
    pub shape: Vec<DimSpec>,
    #[serde(default)]
    pub stream: bool,
}

impl ContainerType {
    pub fn scalar(element: &str) -> Self {
        ContainerType {
            element: element.to_string(),
            shape: Vec::new(),
            stream: false,
        }
    }
}

/// One shape dimension: an integer or a symbol name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimSpec {
    Int(i64),
    Sym(String),
}

/// A value produced by an op, with its element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    pub name: ValueName,
    #[serde(rename = "type")]
    pub element: String,
}

impl TypedValue {
    pub fn new(name: &str, element: &str) -> Self {
        TypedValue {
            name: name.to_string(),
            element: element.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ops
// ---------------------------------------------------------------------------

/// Every instruction kind of the source program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Alloc(AllocOp),
    AllocSymbol(AllocSymbolOp),
    State(StateOp),
    Edge(EdgeOp),
    Tasklet(TaskletOp),
    NestedSdfg(NestedSdfgOp),
    Copy(CopyOp),
    Store(StoreOp),
    Load(LoadOp),
    Map(MapOp),
    Consume(ConsumeOp),
    LibCall(LibCallOp),
    StreamPush(StreamPushOp),
    StreamPop(StreamPopOp),
    Sym(SymOp),
    /// Recognized, but has no translation rule.
    StreamLength(OpaqueOp),
    ViewCast(OpaqueOp),
    Subview(OpaqueOp),
}

impl Op {
    /// The op's tag, as used in input and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Alloc(_) => "alloc",
            Op::AllocSymbol(_) => "alloc_symbol",
            Op::State(_) => "state",
            Op::Edge(_) => "edge",
            Op::Tasklet(_) => "tasklet",
            Op::NestedSdfg(_) => "nested_sdfg",
            Op::Copy(_) => "copy",
            Op::Store(_) => "store",
            Op::Load(_) => "load",
            Op::Map(_) => "map",
            Op::Consume(_) => "consume",
            Op::LibCall(_) => "lib_call",
            Op::StreamPush(_) => "stream_push",
            Op::StreamPop(_) => "stream_pop",
            Op::Sym(_) => "sym",
            Op::StreamLength(_) => "stream_length",
            Op::ViewCast(_) => "view_cast",
            Op::Subview(_) => "subview",
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Op::Alloc(op) => &op.location,
            Op::AllocSymbol(op) => &op.location,
            Op::State(op) => &op.location,
            Op::Edge(op) => &op.location,
            Op::Tasklet(op) => &op.location,
            Op::NestedSdfg(op) => &op.location,
            Op::Copy(op) => &op.location,
            Op::Store(op) => &op.location,
            Op::Load(op) => &op.location,
            Op::Map(op) => &op.location,
            Op::Consume(op) => &op.location,
            Op::LibCall(op) => &op.location,
            Op::StreamPush(op) => &op.location,
            Op::StreamPop(op) => &op.location,
            Op::Sym(op) => &op.location,
            Op::StreamLength(op) | Op::ViewCast(op) | Op::Subview(op) => &op.location,
        }
    }

    /// Returns `true` if this op, or anything nested in it, writes to the
    /// container denoted by `value`.
    pub fn writes(&self, value: &str) -> bool {
        match self {
            Op::Copy(op) => op.dst == value,
            Op::Store(op) => op.array == value,
            Op::StreamPush(op) => op.stream == value,
            Op::State(op) => op.body.iter().any(|o| o.writes(value)),
            Op::Map(op) => op.body.iter().any(|o| o.writes(value)),
            Op::Consume(op) => op.body.iter().any(|o| o.writes(value)),
            Op::NestedSdfg(op) => op
                .operands
                .iter()
                .zip(&op.sdfg.args)
                .any(|(operand, arg)| operand == value && op.sdfg.writes(&arg.name)),
            _ => false,
        }
    }
}

impl SdfgOp {
    /// Returns `true` if any state of this unit writes to `value`.
    pub fn writes(&self, value: &str) -> bool {
        self.body.iter().any(|o| o.writes(value))
    }
}

/// Declares a data container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocOp {
    pub result: ValueName,
    /// Container name; derived from the result if absent.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: ContainerType,
    #[serde(default)]
    pub transient: bool,
    /// Zero-fill on entry.
    #[serde(default)]
    pub init: bool,
    #[serde(default)]
    pub location: Location,
}

/// Declares an `int64` symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocSymbolOp {
    pub sym: String,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateOp {
    pub name: String,
    #[serde(default)]
    pub body: Vec<Op>,
    #[serde(default)]
    pub location: Location,
}

/// A control edge between two states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeOp {
    pub src: String,
    pub dst: String,
    /// Python guard; always taken if absent.
    #[serde(default)]
    pub condition: Option<String>,
    /// `"key: value"` symbol assignments.
    #[serde(default)]
    pub assign: Vec<String>,
    #[serde(default)]
    pub location: Location,
}

/// A compute block. `args` are the block's own names for `operands`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskletOp {
    #[serde(default)]
    pub args: Vec<ValueName>,
    #[serde(default)]
    pub operands: Vec<ValueName>,
    #[serde(default)]
    pub results: Vec<TypedValue>,
    pub body: Vec<Instruction>,
    /// Values that must be produced before this tasklet runs.
    #[serde(default)]
    pub after: Vec<ValueName>,
    #[serde(default)]
    pub location: Location,
}

/// Embeds another SDFG unit; `operands` bind to its arguments in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedSdfgOp {
    #[serde(default)]
    pub operands: Vec<ValueName>,
    pub sdfg: SdfgOp,
    #[serde(default)]
    pub after: Vec<ValueName>,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyOp {
    pub src: ValueName,
    pub dst: ValueName,
    #[serde(default)]
    pub location: Location,
}

/// `array[indices] = value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreOp {
    pub value: ValueName,
    pub array: ValueName,
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub location: Location,
}

/// `result = array[indices]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOp {
    pub array: ValueName,
    #[serde(default)]
    pub indices: Vec<String>,
    pub result: ValueName,
    #[serde(default)]
    pub location: Location,
}

/// A parameterized iteration scope. Upper bounds are exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapOp {
    pub params: Vec<String>,
    pub lower: Vec<String>,
    pub upper: Vec<String>,
    pub steps: Vec<String>,
    #[serde(default)]
    pub body: Vec<Op>,
    #[serde(default)]
    pub location: Location,
}

/// A stream-consumption scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumeOp {
    pub stream: ValueName,
    /// Name of the processing element index.
    pub pe: String,
    /// Name bound to each consumed element inside the body.
    pub elem: ValueName,
    #[serde(default)]
    pub num_pes: Option<String>,
    /// Python continuation condition.
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub body: Vec<Op>,
    #[serde(default)]
    pub location: Location,
}

/// A call into a library implementation identified by `callee`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibCallOp {
    pub callee: String,
    #[serde(default)]
    pub operands: Vec<ValueName>,
    #[serde(default)]
    pub results: Vec<TypedValue>,
    #[serde(default)]
    pub after: Vec<ValueName>,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamPushOp {
    pub value: ValueName,
    pub stream: ValueName,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamPopOp {
    pub stream: ValueName,
    pub result: ValueName,
    #[serde(default)]
    pub location: Location,
}

/// Evaluates a symbolic expression into a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymOp {
    pub expr: String,
    pub result: TypedValue,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpaqueOp {
    #[serde(default)]
    pub location: Location,
}

// ---------------------------------------------------------------------------
// Tasklet bodies
// ---------------------------------------------------------------------------

/// Kinds of instructions inside a tasklet body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrKind {
    AddF,
    AddI,
    SubF,
    SubI,
    MulF,
    MulI,
    DivF,
    #[serde(rename = "div_si")]
    DivSI,
    IndexCast,
    Constant,
    Sym,
    /// Operands: array, then indices.
    Load,
    /// Operands: value, array, then indices.
    Store,
    Return,
    Other,
}

/// One instruction of a tasklet body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub kind: InstrKind,
    #[serde(default)]
    pub operands: Vec<ValueName>,
    #[serde(default)]
    pub results: Vec<ValueName>,
    /// Literal of a constant, expression of a sym.
    #[serde(default)]
    pub value: Option<String>,
    /// Source text, embedded verbatim when the body cannot be lifted.
    #[serde(default)]
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_deserialize_by_tag() {
        let op: Op = serde_json::from_str(
            r#"{ "op": "store", "value": "%0", "array": "A", "indices": ["i"] }"#,
        )
        .unwrap();
        assert_eq!(op.name(), "store");
        assert!(op.writes("A"));
        assert!(!op.writes("%0"));
    }

    #[test]
    fn dims_accept_ints_and_symbols() {
        let ty: ContainerType =
            serde_json::from_str(r#"{ "element": "f32", "shape": [4, "N"] }"#).unwrap();
        assert_eq!(ty.shape, vec![DimSpec::Int(4), DimSpec::Sym("N".into())]);
        assert!(!ty.stream);
    }

    #[test]
    fn instruction_kinds_use_snake_case() {
        let inst: Instruction = serde_json::from_str(
            r#"{ "kind": "div_si", "operands": ["a", "b"], "results": ["c"] }"#,
        )
        .unwrap();
        assert_eq!(inst.kind, InstrKind::DivSI);
        assert!(inst.text.is_empty());
    }

    #[test]
    fn nested_writes_follow_argument_binding() {
        let inner = SdfgOp {
            args: vec![Argument {
                name: "x".into(),
                ty: ContainerType::scalar("f64"),
            }],
            body: vec![Op::State(StateOp {
                name: "s".into(),
                body: vec![Op::Copy(CopyOp {
                    src: "y".into(),
                    dst: "x".into(),
                    location: Location::default(),
                })],
                location: Location::default(),
            })],
            ..SdfgOp::default()
        };
        let op = Op::NestedSdfg(NestedSdfgOp {
            operands: vec!["B".into()],
            sdfg: inner,
            after: vec![],
            location: Location::default(),
        });
        assert!(op.writes("B"));
        assert!(!op.writes("x"));
    }
}
