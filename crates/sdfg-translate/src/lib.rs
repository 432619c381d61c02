//! Translation of dataflow program trees into SDFG documents.
//!
//! [`translate`] takes a parsed [`ir::Program`], builds the SDFG with the
//! scope resolution engine of `sdfg-core` and returns the serialized JSON
//! document. Translation either succeeds completely or fails with a
//! [`TranslateError`]; no partial document is ever produced.
//!
//! # Modules
//!
//! - [`ir`] -- The input program tree
//! - [`lift`] -- Best-effort lifting of tasklet bodies into Python
//! - [`collect`] -- The graph builder, one rule per instruction kind
//! - [`error`] -- Error types for every translation failure

pub mod collect;
pub mod error;
pub mod ir;
pub mod lift;

pub use error::{ErrorKind, TranslateError};
pub use lift::{ExpressionLifter, PythonLifter};

use sdfg_core::{Emitter, Sdfg};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collect::Collector;
use crate::ir::Program;

/// Options controlling translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateOptions {
    /// Lift tasklet bodies into Python. When off, every tasklet embeds its
    /// original instruction text.
    pub lift_tasklets: bool,

    /// Attach `debuginfo` to every graph element with a known location.
    pub emit_debuginfo: bool,

    /// Name of the top-level SDFG. `None` generates `sdfg_<n>`.
    pub sdfg_name: Option<String>,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        TranslateOptions {
            lift_tasklets: true,
            emit_debuginfo: true,
            sdfg_name: None,
        }
    }
}

/// Builds the SDFG for `program` without serializing it.
pub fn build_sdfg(program: &Program, options: &TranslateOptions) -> Result<Sdfg, TranslateError> {
    build_sdfg_with_lifter(program, options, &PythonLifter)
}

/// Like [`build_sdfg`], with a custom expression lifter.
pub fn build_sdfg_with_lifter(
    program: &Program,
    options: &TranslateOptions,
    lifter: &dyn ExpressionLifter,
) -> Result<Sdfg, TranslateError> {
    Collector::new(options, lifter).collect_program(program)
}

/// Translates `program` into an SDFG JSON document.
pub fn translate(program: &Program, options: &TranslateOptions) -> Result<Value, TranslateError> {
    translate_with_lifter(program, options, &PythonLifter)
}

/// Like [`translate`], with a custom expression lifter.
pub fn translate_with_lifter(
    program: &Program,
    options: &TranslateOptions,
    lifter: &dyn ExpressionLifter,
) -> Result<Value, TranslateError> {
    let sdfg = build_sdfg_with_lifter(program, options, lifter)?;
    Ok(Emitter::new(options.emit_debuginfo).sdfg(&sdfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = TranslateOptions::default();
        assert!(opts.lift_tasklets);
        assert!(opts.emit_debuginfo);
        assert!(opts.sdfg_name.is_none());
    }

    #[test]
    fn options_fill_missing_fields_from_default() {
        let opts: TranslateOptions = serde_json::from_str(r#"{ "sdfg_name": "kernel" }"#).unwrap();
        assert!(opts.lift_tasklets);
        assert_eq!(opts.sdfg_name.as_deref(), Some("kernel"));
    }
}
