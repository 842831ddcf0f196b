//! Precondition errors for route and progress handling.

use thiserror::Error;

use crate::models::Coordinate;

/// Errors raised when a caller hands the core malformed input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavError {
    #[error("route has no legs")]
    EmptyRoute,

    #[error("leg {leg} has no steps")]
    EmptyLeg { leg: usize },

    #[error("at least 2 coordinates are required, got {got}")]
    InsufficientWaypoints { got: usize },

    #[error("invalid coordinate {0}")]
    InvalidCoordinate(Coordinate),
}

/// Shorthand result type for navigation operations.
pub type NavResult<T> = Result<T, NavError>;
