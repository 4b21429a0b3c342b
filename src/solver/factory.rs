use crate::domain::{
    models::SolverSettings,
    solver_service::{MipSolver, Result},
    value_objects::SolverBackend,
};
use std::sync::Arc;

/// Factory for creating solver instances based on configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create a solver for the configured backend
    pub fn create_solver(settings: &SolverSettings) -> Result<Arc<dyn MipSolver>> {
        Self::create_from_backend(settings.backend)
    }

    /// Create a solver for a specific backend
    pub fn create_from_backend(backend: SolverBackend) -> Result<Arc<dyn MipSolver>> {
        match backend {
            SolverBackend::Auto => Self::default_solver(),
            SolverBackend::Highs => Self::highs(),
            SolverBackend::CoinCbc => Self::coin_cbc(),
        }
    }

    /// Get the default solver: HiGHS when compiled in, CBC otherwise
    pub fn default_solver() -> Result<Arc<dyn MipSolver>> {
        Self::highs().or_else(|_| Self::coin_cbc())
    }

    #[cfg(feature = "highs")]
    fn highs() -> Result<Arc<dyn MipSolver>> {
        Ok(Arc::new(super::HighsSolver::new()))
    }

    #[cfg(not(feature = "highs"))]
    fn highs() -> Result<Arc<dyn MipSolver>> {
        Err(crate::domain::SolverError::SolverNotAvailable(
            "HiGHS support not compiled in (enable the `highs` feature)".to_string(),
        ))
    }

    #[cfg(feature = "cbc")]
    fn coin_cbc() -> Result<Arc<dyn MipSolver>> {
        Ok(Arc::new(super::CoinCbcSolver::new()))
    }

    #[cfg(not(feature = "cbc"))]
    fn coin_cbc() -> Result<Arc<dyn MipSolver>> {
        Err(crate::domain::SolverError::SolverNotAvailable(
            "COIN-OR CBC support not compiled in (enable the `cbc` feature)".to_string(),
        ))
    }
}
