// Lineup engine: model building, per-lineup solving, exposure gating,
// batch generation and post-generation diversification

pub mod diversify;
pub mod exposure;
pub mod generator;
pub mod lineup_solver;
pub mod model;

pub use diversify::{
    residual_violations, DiversificationEngine, DiversificationReport, DiversificationSettings,
    ExposureUnsatisfiable, UnresolvedSlot,
};
pub use exposure::ExposureTracker;
pub use generator::{
    FailureKind, GenerationFailure, GenerationOutcome, GenerationSettings, LineupGenerator,
};
pub use lineup_solver::{LineupSolver, SolveRequest};
pub use model::ConstraintModel;
