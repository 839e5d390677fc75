use thiserror::Error;

use crate::NodeId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Node {0} is not part of the street graph")]
    InvalidNode(NodeId),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Design matrix has no usable rows")]
    EmptyDesign,
    #[error("Search cancelled before completion")]
    Cancelled,
    #[error(
        "Solver did not converge after {iterations} iterations (projected gradient {projected_gradient:.3e})"
    )]
    SolverDivergence {
        iterations: usize,
        projected_gradient: f64,
    },
}
