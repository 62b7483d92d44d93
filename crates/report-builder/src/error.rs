//! Errors raised by builder commands.
//!
//! These reject a command outright. Problems with the definition itself are
//! collected by validation instead, see [`crate::validate`].

use report_model::{SourceKind, TransformKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("source '{0}' not found")]
    SourceNotFound(String),

    #[error("index {index} is out of range for {scope} (length {len})")]
    InvalidIndex {
        scope: String,
        index: usize,
        len: usize,
    },

    #[error("source '{id}' is {actual}, not {requested}")]
    KindMismatch {
        id: String,
        actual: SourceKind,
        requested: SourceKind,
    },

    #[error("field '{field}' does not apply to {kind} steps")]
    InapplicableField {
        field: &'static str,
        kind: TransformKind,
    },

    #[error("join can only be added to the global chain")]
    JoinNotLocal,

    #[error("{} sources are not available for this project", .0.label())]
    SourceKindUnavailable(SourceKind),

    #[error("source '{id}' is used by global steps {dependents:?}")]
    SourceInUse { id: String, dependents: Vec<usize> },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,
}

pub type Result<T> = std::result::Result<T, BuilderError>;
