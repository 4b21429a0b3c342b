// Error taxonomy of the lineup engine

use super::solver_service::SolverError;

#[derive(Debug, thiserror::Error)]
pub enum LineupError {
    /// Malformed or insufficient player pool or request, raised before any solve.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A single solve attempt could not satisfy the hard constraints.
    #[error("Infeasible constraints: {0}")]
    InfeasibleConstraints(String),

    /// Exclusions left a slot group with fewer eligible players than slots.
    #[error("Empty pool for slot '{slot}': {available} eligible players for {required} slots")]
    EmptyPool {
        slot: String,
        available: usize,
        required: usize,
    },

    #[error(transparent)]
    Solver(#[from] SolverError),
}

impl LineupError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn infeasible(message: impl Into<String>) -> Self {
        Self::InfeasibleConstraints(message.into())
    }
}

pub type LineupResult<T> = std::result::Result<T, LineupError>;
