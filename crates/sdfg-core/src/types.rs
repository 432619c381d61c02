//! Data descriptors shared by every graph layer.
//!
//! Provides element types ([`DType`]), container descriptors ([`Array`],
//! [`Symbol`]), index subsets ([`Range`]), code bodies ([`Code`]) and source
//! locations ([`Location`]).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Element types understood by the target toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float16,
    Float32,
    Float64,
}

impl DType {
    /// Parses a source element type name.
    ///
    /// Accepts both source spellings (`i32`, `f64`, `index`) and the target
    /// spellings (`int32`, `float64`). `index` maps to `int64`. Returns `None`
    /// for anything else.
    pub fn parse(name: &str) -> Option<DType> {
        let dtype = match name.trim() {
            "i1" | "bool" => DType::Bool,
            "i8" | "int8" => DType::Int8,
            "i16" | "int16" => DType::Int16,
            "i32" | "int32" => DType::Int32,
            "i64" | "int64" | "index" => DType::Int64,
            "f16" | "float16" => DType::Float16,
            "f32" | "float32" => DType::Float32,
            "f64" | "float64" => DType::Float64,
            _ => return None,
        };
        Some(dtype)
    }

    /// The target's name for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Float16 => "float16",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dimension of a container shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dim {
    /// Compile-time extent.
    Const(i64),
    /// Extent given by a named [`Symbol`].
    Symbol(String),
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Const(n) => write!(f, "{}", n),
            Dim::Symbol(s) => f.write_str(s),
        }
    }
}

/// Partial product used while deriving strides.
enum Stride {
    Const(i64),
    Expr(String),
}

impl Stride {
    fn times(self, dim: &Dim) -> Stride {
        match (self, dim) {
            (Stride::Const(a), Dim::Const(b)) => match a.checked_mul(*b) {
                Some(p) => Stride::Const(p),
                None => Stride::Expr(format!("{} * {}", a, b)),
            },
            (Stride::Const(1), Dim::Symbol(s)) => Stride::Expr(s.clone()),
            (Stride::Const(a), Dim::Symbol(s)) => Stride::Expr(format!("{} * {}", a, s)),
            (Stride::Expr(e), d) => Stride::Expr(format!("{} * {}", e, d)),
        }
    }
}

impl fmt::Display for Stride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stride::Const(n) => write!(f, "{}", n),
            Stride::Expr(e) => f.write_str(e),
        }
    }
}

/// A data container descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    pub name: String,
    /// `true` if the container is local to its SDFG.
    pub transient: bool,
    pub dtype: DType,
    pub shape: Vec<Dim>,
    /// Stream containers are emitted with a `Stream` descriptor.
    pub stream: bool,
}

impl Array {
    pub fn new(name: impl Into<String>, transient: bool, dtype: DType, shape: Vec<Dim>) -> Self {
        Array {
            name: name.into(),
            transient,
            dtype,
            shape,
            stream: false,
        }
    }

    /// Creates a local rank-0 container, used for materialized results.
    pub fn transient_scalar(name: impl Into<String>, dtype: DType) -> Self {
        Array::new(name, true, dtype, Vec::new())
    }

    /// Marks this container as a stream.
    pub fn into_stream(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Row-major strides: the rightmost dimension has stride 1, every other
    /// dimension the product of all extents to its right.
    pub fn strides(&self) -> Vec<String> {
        let mut strides = Vec::with_capacity(self.shape.len());
        let mut acc = Stride::Const(1);
        for dim in self.shape.iter().rev() {
            strides.push(acc.to_string());
            acc = acc.times(dim);
        }
        strides.reverse();
        strides
    }
}

/// A named scalar usable inside index, guard and assignment expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub dtype: DType,
}

impl Symbol {
    pub fn new(name: impl Into<String>, dtype: DType) -> Self {
        Symbol {
            name: name.into(),
            dtype,
        }
    }
}

/// One dimension of a data subset. Bounds are inclusive and symbolic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: String,
    pub end: String,
    pub step: String,
    pub tile: String,
}

impl Range {
    pub fn new(start: impl Into<String>, end: impl Into<String>, step: impl Into<String>) -> Self {
        Range {
            start: start.into(),
            end: end.into(),
            step: step.into(),
            tile: "1".to_string(),
        }
    }

    /// A single-element range `[index, index]`.
    pub fn index(index: impl Into<String>) -> Self {
        let index = index.into();
        Range::new(index.clone(), index, "1")
    }

    /// Number of elements covered, when all bounds are integer literals.
    pub fn extent(&self) -> Option<i64> {
        let start: i64 = self.start.trim().parse().ok()?;
        let end: i64 = self.end.trim().parse().ok()?;
        let step: i64 = self.step.trim().parse().ok()?;
        if step <= 0 || end < start {
            return Some(0);
        }
        end.checked_sub(start)?.checked_div(step)?.checked_add(1)
    }

    /// Symbolic element count.
    pub fn extent_expr(&self) -> String {
        match self.extent() {
            Some(n) => n.to_string(),
            None if self.step.trim() == "1" => format!("({} - {} + 1)", self.end, self.start),
            None => format!("(({} - {}) / {} + 1)", self.end, self.start, self.step),
        }
    }
}

/// Number of elements moved by a subset; `"1"` for an empty subset.
pub fn subset_volume(ranges: &[Range]) -> String {
    let mut constant: i64 = 1;
    let mut symbolic = Vec::new();
    for range in ranges {
        match range.extent() {
            Some(n) => constant = constant.saturating_mul(n),
            None => symbolic.push(range.extent_expr()),
        }
    }

    if symbolic.is_empty() {
        return constant.to_string();
    }
    if constant != 1 {
        symbolic.insert(0, constant.to_string());
    }
    symbolic.join(" * ")
}

/// Source language tag of a code body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CodeLanguage {
    #[default]
    Python,
    Cpp,
    Mlir,
}

impl CodeLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeLanguage::Python => "Python",
            CodeLanguage::Cpp => "CPP",
            CodeLanguage::Mlir => "MLIR",
        }
    }
}

/// A code body with its language tag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Code {
    pub data: String,
    pub language: CodeLanguage,
}

impl Code {
    pub fn new(data: impl Into<String>, language: CodeLanguage) -> Self {
        Code {
            data: data.into(),
            language,
        }
    }

    pub fn python(data: impl Into<String>) -> Self {
        Code::new(data, CodeLanguage::Python)
    }
}

/// Source location of an instruction, carried into errors and `debuginfo`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.file.is_empty() && self.line == 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            f.write_str("<unknown>")
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.col)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn dtype_parse_accepts_both_spellings() {
        assert_eq!(DType::parse("f64"), Some(DType::Float64));
        assert_eq!(DType::parse("float64"), Some(DType::Float64));
        assert_eq!(DType::parse("index"), Some(DType::Int64));
        assert_eq!(DType::parse("i1"), Some(DType::Bool));
        assert_eq!(DType::parse("complex<f32>"), None);
    }

    #[test]
    fn dtype_display_uses_target_names() {
        assert_eq!(DType::Int32.to_string(), "int32");
        assert_eq!(DType::Float16.as_str(), "float16");
    }

    #[test]
    fn strides_of_constant_shape() {
        let a = Array::new(
            "A",
            false,
            DType::Float64,
            vec![Dim::Const(2), Dim::Const(3), Dim::Const(4)],
        );
        assert_eq!(a.strides(), vec!["12", "4", "1"]);
    }

    #[test]
    fn strides_of_symbolic_shape() {
        let a = Array::new(
            "A",
            false,
            DType::Float32,
            vec![Dim::Symbol("N".into()), Dim::Symbol("M".into()), Dim::Const(4)],
        );
        assert_eq!(a.strides(), vec!["4 * M", "4", "1"]);
    }

    #[test]
    fn strides_of_scalar_are_empty() {
        let s = Array::transient_scalar("tmp_0", DType::Int32);
        assert!(s.strides().is_empty());
        assert_eq!(s.rank(), 0);
    }

    #[test]
    fn range_extent() {
        assert_eq!(Range::new("0", "9", "1").extent(), Some(10));
        assert_eq!(Range::new("0", "9", "2").extent(), Some(5));
        assert_eq!(Range::index("i").extent(), None);
        assert_eq!(Range::index("3").extent(), Some(1));
        let wide = Range::new(i64::MIN.to_string(), i64::MAX.to_string(), "1");
        assert_eq!(wide.extent(), None);
        assert!(wide.extent_expr().starts_with("("));
    }

    #[test]
    fn volume_mixes_constant_and_symbolic() {
        assert_eq!(subset_volume(&[]), "1");
        assert_eq!(
            subset_volume(&[Range::new("0", "3", "1"), Range::new("0", "4", "1")]),
            "20"
        );
        assert_eq!(
            subset_volume(&[Range::new("0", "3", "1"), Range::new("0", "N", "1")]),
            "4 * (N - 0 + 1)"
        );
    }

    #[test]
    fn location_display() {
        assert_eq!(Location::new("a.mlir", 3, 7).to_string(), "a.mlir:3:7");
        assert_eq!(Location::default().to_string(), "<unknown>");
    }

    proptest! {
        #[test]
        fn row_major_strides(d0 in 1i64..64, d1 in 1i64..64, d2 in 1i64..64) {
            let a = Array::new(
                "A",
                false,
                DType::Int64,
                vec![Dim::Const(d0), Dim::Const(d1), Dim::Const(d2)],
            );
            let expected = vec![(d1 * d2).to_string(), d2.to_string(), "1".to_string()];
            prop_assert_eq!(a.strides(), expected);
        }
    }
}
