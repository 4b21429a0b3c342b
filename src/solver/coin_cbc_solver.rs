// COIN-OR CBC Solver Adapter (through good_lp)

use crate::domain::{
    models::{IntegerProgram, ProgramSolution, SolverStatistics},
    solver_service::{MipSolver, Result, SolverError},
    value_objects::{ConstraintType, OptimizationType, SolutionStatus, VariableType},
};
use good_lp::{
    solvers::coin_cbc, variable, variables, Expression, ResolutionError,
    Solution as GoodLpSolutionTrait, SolverModel, Variable as GoodLpVariable,
};
use std::time::Instant;
use tracing::debug;

pub struct CoinCbcSolver;

impl CoinCbcSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CoinCbcSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MipSolver for CoinCbcSolver {
    fn solve(&self, program: &IntegerProgram) -> Result<ProgramSolution> {
        self.validate(program)?;

        let start_time = Instant::now();

        let mut vars = variables!();
        let mut lp_variables: Vec<GoodLpVariable> = Vec::with_capacity(program.num_variables());

        for var_def in &program.variables {
            let lower = var_def.lower_bound;
            let upper = var_def.upper_bound.unwrap_or(f64::INFINITY);

            let var = match var_def.variable_type {
                VariableType::Binary => vars.add(variable().binary()),
                VariableType::Integer => vars.add(variable().integer().min(lower).max(upper)),
                VariableType::Continuous => vars.add(variable().min(lower).max(upper)),
            };
            lp_variables.push(var);
        }

        // good_lp minimises, so negate for maximisation
        let is_maximize = program.optimization_type == OptimizationType::Maximize;
        let mut obj_expr: Expression = 0.into();
        for (&coeff, &var) in program.objective.iter().zip(&lp_variables) {
            if coeff != 0.0 {
                let c = if is_maximize { -coeff } else { coeff };
                obj_expr += c * var;
            }
        }

        let mut lp_model = vars.minimise(obj_expr).using(coin_cbc::coin_cbc);
        if !program.settings.verbose {
            lp_model.set_parameter("log", "0");
        }
        if let Some(seconds) = program.settings.time_limit_seconds {
            lp_model.set_parameter("sec", &seconds.to_string());
        }

        for constraint in &program.constraints {
            let mut lhs: Expression = 0.into();
            for &(i, coeff) in &constraint.terms {
                if coeff != 0.0 {
                    lhs += coeff * lp_variables[i];
                }
            }

            lp_model = match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => lp_model.with(lhs.leq(constraint.bound)),
                ConstraintType::Equal => lp_model.with(lhs.eq(constraint.bound)),
                ConstraintType::GreaterThanOrEqual => lp_model.with(lhs.geq(constraint.bound)),
            };
        }

        let solution_result = lp_model.solve();
        let statistics =
            SolverStatistics::for_program(program, start_time.elapsed().as_secs_f64() * 1000.0);
        debug!(
            solver = "cbc",
            program = %program.name,
            ok = solution_result.is_ok(),
            solve_time_ms = statistics.solve_time_ms,
        );

        match solution_result {
            Ok(sol) => {
                let variable_values: Vec<f64> =
                    lp_variables.iter().map(|&var| sol.value(var)).collect();
                let objective = program.evaluate(&variable_values);

                let mut solution = ProgramSolution::optimal(objective, variable_values);
                solution.statistics = statistics;
                solution.message = format!("Optimal solution found for '{}'", program.name);
                Ok(solution)
            }
            Err(ResolutionError::Infeasible) => Ok(ProgramSolution::new(
                SolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            )
            .with_statistics(statistics)),
            Err(ResolutionError::Unbounded) => Ok(ProgramSolution::new(
                SolutionStatus::Unbounded,
                "Problem is unbounded: objective can be improved infinitely",
            )
            .with_statistics(statistics)),
            Err(e) => Err(SolverError::ExecutionFailed(format!("{:?}", e))),
        }
    }

    fn name(&self) -> &str {
        "COIN-OR CBC"
    }

    fn supports_mip(&self) -> bool {
        true
    }
}
