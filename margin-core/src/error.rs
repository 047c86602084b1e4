//! Error types for the content tree and the annotation engine

use thiserror::Error;

use crate::address::Address;

/// Errors raised while parsing page markup
#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("Markup parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },
}

/// Errors raised by range surgery on the content tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Boundary {address}:{offset} does not resolve")]
    InvalidBoundary { address: Address, offset: usize },

    #[error("Range start is after range end")]
    Reversed,

    #[error("Range selects no content")]
    Empty,

    #[error("Node at {0} cannot hold children")]
    NotAnElement(Address),
}

/// Failure taxonomy of the annotation engine.
///
/// None of these are fatal: every engine operation contains them locally and
/// reports them through its outcome type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Annotation {id} has an unresolvable address")]
    UnresolvableAddress { id: String },

    #[error("Selection overlaps existing highlight {existing}")]
    OverlappingSelection { existing: String },

    #[error("Selection is collapsed")]
    CollapsedSelection,

    #[error("Wrap failed: {0}")]
    StructuralWrapFailure(#[from] RangeError),

    #[error("No page or annotation for {0}")]
    MissingPageOrPageData(String),
}
