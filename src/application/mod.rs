// Application layer: request configuration, orchestration and reporting

pub mod config;
pub mod optimizer;
pub mod report;

pub use config::{ConfigError, RequestConfig, RequestDocument};
pub use optimizer::{LineupOptimizer, OptimizationOutcome};
pub use report::{
    ExposureWarningView, GenerationReport, LineupView, PairExposure, PlayerExposure, SlotView,
};
