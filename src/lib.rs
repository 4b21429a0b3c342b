// Domain layer: players, rosters, lineups, rules and the integer-program model
pub mod domain;

// Engine: per-lineup solving, exposure gating, generation and diversification
pub mod engine;

// Application layer: request configuration, orchestration and reporting
pub mod application;

// Solver adapters: concrete MipSolver backends
pub mod solver;

// Infrastructure: logging for the command line front end
#[cfg(feature = "cli")]
pub mod infrastructure;

pub use domain::{
    ExposureLedger, Lineup, LineupBatch, LineupConstraints, LineupError, LineupResult, MipSolver,
    Player, PlayerPool, Position, RosterSlot, RosterTemplate, Site, SolverBackend, SolverError,
    SolverSettings, StackingRule,
};

pub use engine::{
    DiversificationEngine, DiversificationReport, DiversificationSettings, ExposureTracker,
    ExposureUnsatisfiable, GenerationOutcome, GenerationSettings, LineupGenerator, LineupSolver,
    UnresolvedSlot,
};

pub use application::{
    ConfigError, GenerationReport, LineupOptimizer, OptimizationOutcome, RequestConfig,
    RequestDocument,
};

pub use solver::SolverFactory;

#[cfg(feature = "highs")]
pub use solver::HighsSolver;

#[cfg(feature = "cbc")]
pub use solver::CoinCbcSolver;
