//! Best-effort lifting of tasklet bodies into Python.
//!
//! The translator asks an [`ExpressionLifter`] for a tasklet's code body. A
//! `None` answer is not an error: the caller embeds the original instruction
//! text instead, tagged as MLIR.

use sdfg_core::sanitize_name;

use crate::ir::{InstrKind, Instruction, TaskletOp};

/// Produces a code body for a tasklet, if it can.
pub trait ExpressionLifter {
    fn lift(&self, tasklet: &TaskletOp) -> Option<String>;
}

/// Template-based lifter covering elementary arithmetic, constants, casts,
/// symbolic expressions, element loads and stores and the final return.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonLifter;

impl ExpressionLifter for PythonLifter {
    fn lift(&self, tasklet: &TaskletOp) -> Option<String> {
        let lines = tasklet
            .body
            .iter()
            .map(lift_instruction)
            .collect::<Option<Vec<String>>>()?;
        Some(lines.join("\n"))
    }
}

/// Name of the `i`-th output connector of a tasklet.
pub fn output_name(i: usize) -> String {
    format!("__out{}", i)
}

fn binary(inst: &Instruction, symbol: &str) -> Option<String> {
    let out = inst.results.first()?;
    let lhs = inst.operands.first()?;
    let rhs = inst.operands.get(1)?;
    Some(format!(
        "{} = {} {} {}",
        sanitize_name(out),
        sanitize_name(lhs),
        symbol,
        sanitize_name(rhs)
    ))
}

fn indices(operands: &[String]) -> String {
    operands
        .iter()
        .map(|i| index_expr(i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Integer literals stay as they are, value names are sanitized.
pub(crate) fn index_expr(index: &str) -> String {
    if index.trim().parse::<i64>().is_ok() {
        index.trim().to_string()
    } else {
        sanitize_name(index)
    }
}

fn lift_instruction(inst: &Instruction) -> Option<String> {
    match inst.kind {
        InstrKind::AddF | InstrKind::AddI => binary(inst, "+"),
        InstrKind::SubF | InstrKind::SubI => binary(inst, "-"),
        InstrKind::MulF | InstrKind::MulI => binary(inst, "*"),
        InstrKind::DivF => binary(inst, "/"),
        InstrKind::DivSI => binary(inst, "//"),
        InstrKind::IndexCast => {
            let out = inst.results.first()?;
            let src = inst.operands.first()?;
            Some(format!("{} = {}", sanitize_name(out), sanitize_name(src)))
        }
        InstrKind::Constant | InstrKind::Sym => {
            let out = inst.results.first()?;
            let value = inst.value.as_deref()?;
            Some(format!("{} = {}", sanitize_name(out), value))
        }
        InstrKind::Load => {
            let out = inst.results.first()?;
            let (array, idx) = inst.operands.split_first()?;
            Some(format!(
                "{} = {}[{}]",
                sanitize_name(out),
                sanitize_name(array),
                indices(idx)
            ))
        }
        InstrKind::Store => {
            let (value, rest) = inst.operands.split_first()?;
            let (array, idx) = rest.split_first()?;
            Some(format!(
                "{}[{}] = {}",
                sanitize_name(array),
                indices(idx),
                sanitize_name(value)
            ))
        }
        InstrKind::Return => {
            let lines: Vec<String> = inst
                .operands
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{} = {}", output_name(i), sanitize_name(v)))
                .collect();
            Some(lines.join("\n"))
        }
        InstrKind::Other => None,
    }
}

/// Node label derived from the first instruction of a tasklet body.
pub fn tasklet_label(tasklet: &TaskletOp) -> &'static str {
    match tasklet.body.first().map(|i| i.kind) {
        Some(InstrKind::AddF | InstrKind::AddI) => "add",
        Some(InstrKind::MulF | InstrKind::MulI) => "mult",
        Some(InstrKind::SubF | InstrKind::SubI) => "sub",
        Some(InstrKind::DivF | InstrKind::DivSI) => "div",
        Some(InstrKind::Constant) => "constant",
        Some(InstrKind::IndexCast) => "cast",
        Some(InstrKind::Store) => "store",
        Some(InstrKind::Load) => "load",
        Some(InstrKind::Sym) => "sym",
        Some(InstrKind::Return) => "return",
        Some(InstrKind::Other) | None => "task",
    }
}

/// The original instruction text of a tasklet, one instruction per line.
pub fn source_text(tasklet: &TaskletOp) -> String {
    tasklet
        .body
        .iter()
        .map(|i| i.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
