use super::exposure::ExposureTracker;
use super::lineup_solver::{LineupSolver, SolveRequest};
use crate::domain::{
    ExposureLedger, Lineup, LineupBatch, LineupConstraints, LineupError, LineupResult, PlayerPool,
    RosterTemplate, SolverSettings,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Knobs of one generation run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub lineup_count: usize,
    /// Upper bound on solver calls, successful or not.
    pub max_attempts: usize,
    pub max_exposure: f64,
    /// Objective jitter as a fraction of projected points.
    pub randomness: f64,
    pub seed: Option<u64>,
    pub locked: BTreeSet<usize>,
    pub excluded: BTreeSet<usize>,
    pub solver: SolverSettings,
}

impl GenerationSettings {
    pub fn new(lineup_count: usize) -> Self {
        Self {
            lineup_count,
            max_attempts: lineup_count.saturating_mul(3),
            max_exposure: 1.0,
            randomness: 0.0,
            seed: None,
            locked: BTreeSet::new(),
            excluded: BTreeSet::new(),
            solver: SolverSettings::default(),
        }
    }

    pub fn with_max_exposure(mut self, max_exposure: f64) -> Self {
        self.max_exposure = max_exposure;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

/// Category of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Infeasible,
    EmptyPool,
    Solver,
}

impl FailureKind {
    fn of(error: &LineupError) -> Self {
        match error {
            LineupError::Validation(_) => FailureKind::Validation,
            LineupError::InfeasibleConstraints(_) => FailureKind::Infeasible,
            LineupError::EmptyPool { .. } => FailureKind::EmptyPool,
            LineupError::Solver(_) => FailureKind::Solver,
        }
    }

    /// Exclusions and prior lineups only ever tighten the model, so these
    /// failures would repeat on every later attempt.
    fn is_terminal(self) -> bool {
        !matches!(self, FailureKind::Solver)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationFailure {
    pub attempt: usize,
    pub kind: FailureKind,
    pub message: String,
}

/// Result of a generation run; partial when `shortfall > 0`.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub batch: LineupBatch,
    pub ledger: ExposureLedger,
    pub attempts: usize,
    pub failures: Vec<GenerationFailure>,
    pub shortfall: usize,
}

impl GenerationOutcome {
    pub fn is_complete(&self) -> bool {
        self.shortfall == 0
    }
}

/// Sequential solve-accept-update loop over one request.
pub struct LineupGenerator<'a> {
    solver: &'a LineupSolver,
    pool: &'a PlayerPool,
    template: &'a RosterTemplate,
    constraints: &'a LineupConstraints,
}

impl<'a> LineupGenerator<'a> {
    pub fn new(
        solver: &'a LineupSolver,
        pool: &'a PlayerPool,
        template: &'a RosterTemplate,
        constraints: &'a LineupConstraints,
    ) -> Self {
        Self {
            solver,
            pool,
            template,
            constraints,
        }
    }

    pub fn generate(&self, settings: &GenerationSettings) -> GenerationOutcome {
        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.generate_with_rng(settings, &mut rng)
    }

    pub fn generate_with_rng<R: Rng>(
        &self,
        settings: &GenerationSettings,
        rng: &mut R,
    ) -> GenerationOutcome {
        info!(
            event = "generation_start",
            lineups = settings.lineup_count,
            max_attempts = settings.max_attempts,
            players = self.pool.len(),
            slots = self.template.len(),
            backend = self.solver.backend_name(),
        );

        let mut tracker =
            ExposureTracker::new(self.pool, settings.lineup_count, settings.max_exposure)
                .with_excluded(settings.excluded.iter().copied())
                .with_locked(settings.locked.iter().copied());
        let mut batch = LineupBatch::new();
        let mut failures = Vec::new();
        let mut attempts = 0;

        while batch.len() < settings.lineup_count && attempts < settings.max_attempts {
            attempts += 1;
            tracker.refresh();
            let points = self.jittered_points(settings.randomness, rng);

            match self.attempt(&tracker, &points, &batch, &settings.solver) {
                Ok(lineup) => {
                    debug!(
                        event = "lineup_accepted",
                        index = batch.len(),
                        salary = lineup.salary(),
                        points = lineup.points(),
                    );
                    tracker.accept(&lineup);
                    batch.push(lineup);
                }
                Err(err) => {
                    let kind = FailureKind::of(&err);
                    warn!(event = "attempt_failed", attempt = attempts, kind = ?kind, error = %err);
                    failures.push(GenerationFailure {
                        attempt: attempts,
                        kind,
                        message: err.to_string(),
                    });
                    if kind.is_terminal() {
                        break;
                    }
                }
            }
        }

        let shortfall = settings.lineup_count - batch.len();
        info!(
            event = "generation_end",
            produced = batch.len(),
            shortfall,
            attempts,
            failures = failures.len(),
        );

        GenerationOutcome {
            batch,
            ledger: tracker.into_ledger(),
            attempts,
            failures,
            shortfall,
        }
    }

    /// One solve; retried once without forced players when forcing them
    /// makes the model infeasible.
    fn attempt(
        &self,
        tracker: &ExposureTracker<'_>,
        points: &[f64],
        batch: &LineupBatch,
        settings: &SolverSettings,
    ) -> LineupResult<Lineup> {
        let forced = tracker.forced_in();
        let mut request = SolveRequest {
            pool: self.pool,
            template: self.template,
            constraints: self.constraints,
            points,
            excluded: tracker.excluded(),
            forced: &forced,
            previous: batch.as_slice(),
            settings,
        };

        match self.solver.solve(&request) {
            Err(LineupError::InfeasibleConstraints(reason)) if !forced.is_empty() => {
                debug!(event = "forced_players_dropped", forced = forced.len(), reason = %reason);
                let none = BTreeSet::new();
                request.forced = &none;
                self.solver.solve(&request)
            }
            other => other,
        }
    }

    fn jittered_points<R: Rng>(&self, randomness: f64, rng: &mut R) -> Vec<f64> {
        self.pool
            .players()
            .iter()
            .map(|player| {
                if randomness > 0.0 {
                    player.projected_points * (1.0 + rng.random_range(-randomness..=randomness))
                } else {
                    player.projected_points
                }
            })
            .collect()
    }
}
