//! Translation error types.
//!
//! Every failure aborts translation of the whole unit and carries the
//! source location of the instruction being translated.

use sdfg_core::{GraphError, Location};
use thiserror::Error;

/// Broad classification of translation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed structure: conflicting connectors, counts or ranks that do
    /// not match, missing pieces.
    Structural,
    /// A name that does not resolve to a value, state or symbol.
    Reference,
    /// An element type with no target equivalent.
    Type,
    /// A construct without a translation rule.
    Unsupported,
}

/// Errors that can occur while translating a program into an SDFG.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The graph model rejected an operation.
    #[error("{location}: {source}")]
    Graph {
        source: GraphError,
        location: Location,
    },

    #[error("{location}: expected exactly one top-level sdfg, found {count}")]
    TopLevelCount { count: usize, location: Location },

    #[error("{location}: sdfg has no states")]
    MissingStartState { location: Location },

    #[error("{location}: {what} expects {expected} operands, found {found}")]
    ArityMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
        location: Location,
    },

    #[error("{location}: '{data}' has rank {rank} but is indexed with {indices} indices")]
    RankMismatch {
        data: String,
        rank: usize,
        indices: usize,
        location: Location,
    },

    #[error("{location}: malformed assignment '{text}', expected 'key: value'")]
    MalformedAssignment { text: String, location: Location },

    #[error("{location}: '{op}' is not allowed {context}")]
    Misplaced {
        op: &'static str,
        context: &'static str,
        location: Location,
    },

    #[error("{location}: invalid processing element count '{value}'")]
    InvalidPeCount { value: String, location: Location },

    #[error("{location}: '{value}' does not denote a data container")]
    NotAContainer { value: String, location: Location },

    #[error("{location}: unresolved symbol '{name}'")]
    UnresolvedSymbol { name: String, location: Location },

    #[error("{location}: unsupported element type '{ty}'")]
    UnsupportedType { ty: String, location: Location },

    #[error("{location}: tasklets with {count} return values are not supported")]
    MultipleReturnValues { count: usize, location: Location },

    #[error("{location}: no translation for '{op}'")]
    UnsupportedOp { op: &'static str, location: Location },
}

impl TranslateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslateError::Graph { source, .. } if source.is_reference() => ErrorKind::Reference,
            TranslateError::NotAContainer { .. } | TranslateError::UnresolvedSymbol { .. } => {
                ErrorKind::Reference
            }
            TranslateError::UnsupportedType { .. } => ErrorKind::Type,
            TranslateError::MultipleReturnValues { .. } | TranslateError::UnsupportedOp { .. } => {
                ErrorKind::Unsupported
            }
            _ => ErrorKind::Structural,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            TranslateError::Graph { location, .. }
            | TranslateError::TopLevelCount { location, .. }
            | TranslateError::MissingStartState { location }
            | TranslateError::ArityMismatch { location, .. }
            | TranslateError::RankMismatch { location, .. }
            | TranslateError::MalformedAssignment { location, .. }
            | TranslateError::Misplaced { location, .. }
            | TranslateError::InvalidPeCount { location, .. }
            | TranslateError::NotAContainer { location, .. }
            | TranslateError::UnresolvedSymbol { location, .. }
            | TranslateError::UnsupportedType { location, .. }
            | TranslateError::MultipleReturnValues { location, .. }
            | TranslateError::UnsupportedOp { location, .. } => location,
        }
    }
}

/// Attaches a source location to graph-model errors.
pub(crate) trait AtLocation<T> {
    fn at(self, location: &Location) -> Result<T, TranslateError>;
}

impl<T> AtLocation<T> for Result<T, GraphError> {
    fn at(self, location: &Location) -> Result<T, TranslateError> {
        self.map_err(|source| TranslateError::Graph {
            source,
            location: location.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_errors_keep_their_classification() {
        let loc = Location::new("a.mlir", 4, 2);
        let err: Result<(), _> = Err(GraphError::UndefinedValue { value: "%3".into() });
        let err = err.at(&loc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert_eq!(err.to_string(), "a.mlir:4:2: lookup of undefined value '%3'");

        let err: Result<(), _> = Err(GraphError::ConflictingConnector {
            node: sdfg_core::NodeId(1),
            name: "x".into(),
        });
        assert_eq!(err.at(&loc).unwrap_err().kind(), ErrorKind::Structural);
    }

    #[test]
    fn kinds() {
        let loc = Location::default();
        assert_eq!(
            TranslateError::TopLevelCount { count: 2, location: loc.clone() }.kind(),
            ErrorKind::Structural
        );
        assert_eq!(
            TranslateError::UnsupportedType { ty: "complex".into(), location: loc.clone() }.kind(),
            ErrorKind::Type
        );
        assert_eq!(
            TranslateError::UnsupportedOp { op: "subview", location: loc.clone() }.kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            TranslateError::UnresolvedSymbol { name: "N".into(), location: loc }.kind(),
            ErrorKind::Reference
        );
    }

    #[test]
    fn unknown_location_display() {
        let err = TranslateError::MissingStartState {
            location: Location::default(),
        };
        assert_eq!(err.to_string(), "<unknown>: sdfg has no states");
    }
}
