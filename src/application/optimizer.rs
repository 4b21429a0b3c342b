use super::config::RequestConfig;
use super::report::{GenerationReport, LineupView};
use crate::domain::{
    ExposureLedger, LineupBatch, LineupError, LineupResult, MipSolver, PlayerPool, RosterTemplate,
    SolverSettings,
};
use crate::engine::{
    residual_violations, DiversificationEngine, DiversificationSettings, GenerationSettings,
    LineupGenerator, LineupSolver,
};
use crate::solver::SolverFactory;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Lineups and report of one request
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub batch: LineupBatch,
    pub ledger: ExposureLedger,
    pub template: RosterTemplate,
    pub report: GenerationReport,
}

impl OptimizationOutcome {
    pub fn lineup_views(&self, pool: &PlayerPool) -> Vec<LineupView> {
        LineupView::for_batch(pool, &self.template, &self.batch)
    }
}

/// Runs generation then diversification for one request.
#[derive(Clone)]
pub struct LineupOptimizer {
    solver: LineupSolver,
}

impl LineupOptimizer {
    pub fn new(backend: Arc<dyn MipSolver>) -> Self {
        Self {
            solver: LineupSolver::new(backend),
        }
    }

    pub fn from_settings(settings: &SolverSettings) -> LineupResult<Self> {
        Ok(Self::new(SolverFactory::create_solver(settings)?))
    }

    pub fn optimize(
        &self,
        pool: &PlayerPool,
        config: &RequestConfig,
    ) -> LineupResult<OptimizationOutcome> {
        config
            .validate()
            .map_err(|e| LineupError::validation(e.to_string()))?;

        let template = config.roster_template();
        let constraints = config.lineup_constraints();
        let locked = resolve_ids(pool, &config.locked, "locked")?;
        let excluded = resolve_ids(pool, &config.excluded, "excluded")?;
        if let Some(&p) = locked.intersection(&excluded).next() {
            return Err(LineupError::validation(format!(
                "player '{}' is both locked and excluded",
                pool.get(p).id
            )));
        }

        template
            .check_availability(pool, |p| !excluded.contains(&p))
            .map_err(|shortage| {
                LineupError::validation(format!(
                    "slot '{}' needs {} eligible players, the pool has {}",
                    shortage.slot, shortage.required, shortage.available
                ))
            })?;

        info!(
            event = "request_start",
            lineups = config.lineup_count,
            players = pool.len(),
            slots = template.len(),
            salary_cap = constraints.salary_cap,
            rules = constraints.stacking_rules.len(),
        );

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let settings = GenerationSettings {
            lineup_count: config.lineup_count,
            max_attempts: config.max_attempts(),
            max_exposure: config.max_exposure,
            randomness: config.randomness,
            seed: config.seed,
            locked: locked.clone(),
            excluded: excluded.clone(),
            solver: config.solver.clone(),
        };
        let generator = LineupGenerator::new(&self.solver, pool, &template, &constraints);
        let mut outcome = generator.generate_with_rng(&settings, &mut rng);

        let targets = DiversificationSettings {
            max_exposure: config.max_exposure,
            max_pair_exposure: config.max_pair_exposure,
            randomness: config.randomness,
            seed: config.seed,
        };
        let diversification = if config.diversify && !outcome.batch.is_empty() {
            let engine = DiversificationEngine::new(pool, &template, &constraints, targets)
                .with_excluded(excluded)
                .with_pinned(locked);
            Some(engine.run_with_rng(&mut outcome.batch, &mut outcome.ledger, &mut rng))
        } else {
            None
        };
        let residual = match &diversification {
            Some(report) => report.residual.clone(),
            None => residual_violations(pool, &outcome.ledger, outcome.batch.len(), &targets),
        };

        let report = GenerationReport {
            requested: config.lineup_count,
            produced: outcome.batch.len(),
            shortfall: outcome.shortfall,
            attempts: outcome.attempts,
            failures: outcome.failures,
            player_exposure: GenerationReport::exposure_of(pool, &outcome.ledger),
            pair_exposure: GenerationReport::pairs_of(pool, &outcome.ledger),
            warnings: GenerationReport::warnings_of(pool, &residual),
            diversification,
        };

        info!(
            event = "request_end",
            produced = report.produced,
            shortfall = report.shortfall,
            warnings = report.warnings.len(),
        );

        Ok(OptimizationOutcome {
            batch: outcome.batch,
            ledger: outcome.ledger,
            template,
            report,
        })
    }
}

fn resolve_ids(pool: &PlayerPool, ids: &[String], field: &str) -> LineupResult<BTreeSet<usize>> {
    ids.iter()
        .map(|id| {
            pool.index_of(id).ok_or_else(|| {
                LineupError::validation(format!("{field} player '{id}' is not in the pool"))
            })
        })
        .collect()
}
