use super::model::{ConstraintModel, ModelInput};
use crate::domain::{
    Lineup, LineupConstraints, LineupError, LineupResult, MipSolver, PlayerPool, RosterTemplate,
    SolutionStatus, SolverError, SolverSettings,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::trace;

/// Inputs for one lineup solve.
#[derive(Debug, Clone, Copy)]
pub struct SolveRequest<'a> {
    pub pool: &'a PlayerPool,
    pub template: &'a RosterTemplate,
    pub constraints: &'a LineupConstraints,
    /// Objective coefficient per pool index.
    pub points: &'a [f64],
    pub excluded: &'a BTreeSet<usize>,
    pub forced: &'a BTreeSet<usize>,
    /// Lineups already in the batch, for the repeat limit.
    pub previous: &'a [Lineup],
    pub settings: &'a SolverSettings,
}

/// Picks the single best lineup for a request.
///
/// Stateless apart from the backend handle; the caller owns exposure state
/// and decides what to do with the result.
#[derive(Clone)]
pub struct LineupSolver {
    backend: Arc<dyn MipSolver>,
}

impl LineupSolver {
    pub fn new(backend: Arc<dyn MipSolver>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn solve(&self, request: &SolveRequest<'_>) -> LineupResult<Lineup> {
        let SolveRequest {
            pool,
            template,
            constraints,
            ..
        } = *request;

        template
            .check_availability(pool, |p| !request.excluded.contains(&p))
            .map_err(|shortage| LineupError::EmptyPool {
                slot: shortage.slot,
                available: shortage.available,
                required: shortage.required,
            })?;

        let model = ConstraintModel::build(
            pool,
            template,
            ModelInput {
                constraints,
                points: request.points,
                excluded: request.excluded,
                forced: request.forced,
                previous: request.previous,
                settings: request.settings,
            },
        );
        if let Some(reason) = model.infeasibility() {
            return Err(LineupError::infeasible(reason));
        }

        trace!(
            variables = model.program.num_variables(),
            constraints = model.program.constraints.len(),
            "built lineup model"
        );

        let solution = self.backend.solve(&model.program)?;
        match solution.status {
            SolutionStatus::Optimal | SolutionStatus::Feasible => {}
            SolutionStatus::Infeasible | SolutionStatus::Unbounded => {
                return Err(LineupError::infeasible(solution.message));
            }
            SolutionStatus::TimeLimit | SolutionStatus::Error => {
                return Err(SolverError::ExecutionFailed(solution.message).into());
            }
        }

        let players = model
            .decode(template.len(), &solution.variable_values)
            .ok_or_else(|| LineupError::infeasible("solver returned an incomplete assignment"))?;
        let lineup = Lineup::new(pool, template, players);

        let mut problems = constraints.violations(template, pool, &lineup);
        if !constraints.respects_repeats(&lineup, request.previous) {
            problems.push("lineup repeats too many players of an earlier lineup".to_string());
        }
        if lineup.players().iter().any(|p| request.excluded.contains(p)) {
            problems.push("lineup uses an excluded player".to_string());
        }
        if !problems.is_empty() {
            return Err(LineupError::infeasible(format!(
                "solver assignment rejected: {}",
                problems.join("; ")
            )));
        }

        Ok(lineup)
    }
}
