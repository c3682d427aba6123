//! Error types for scenecrate

use thiserror::Error;

use crate::figure::FigureId;

/// Main error type for scenecrate operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("vertex is already attached to a vertex manager; copy it first")]
    VertexAlreadyAttached,

    #[error("vertex is not attached to this vertex manager")]
    VertexNotAttached,

    #[error("primitive has zero length")]
    ZeroLengthPrimitive,

    #[error("primitive has no parent figure")]
    MissingParentFigure,

    #[error("figure {0} is not registered")]
    FigureNotFound(FigureId),

    #[error("figure {figure} has no primitive at index {index}")]
    PrimitiveNotFound { figure: FigureId, index: usize },

    #[error("figure {0} holds {1} primitives, not the requested kind")]
    PrimitiveKindMismatch(FigureId, crate::primitive::PrimitiveKind),

    #[error("Invalid matrix: {0}")]
    InvalidMatrix(String),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for scenecrate operations
pub type Result<T> = std::result::Result<T, Error>;
