// HiGHS Solver Adapter
// Implements the MipSolver interface for HiGHS
// Translates the domain IntegerProgram into a HiGHS RowProblem

use crate::domain::{
    models::{IntegerProgram, ProgramSolution, SolverStatistics},
    solver_service::{MipSolver, Result, SolverError},
    value_objects::{ConstraintType, OptimizationType, SolutionStatus, VariableType},
};
use highs::{HighsModelStatus, RowProblem, Sense};
use std::time::Instant;
use tracing::debug;

const FEASIBILITY_TOLERANCE: f64 = 1e-6;

pub struct HighsSolver;

impl HighsSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MipSolver for HighsSolver {
    fn solve(&self, program: &IntegerProgram) -> Result<ProgramSolution> {
        self.validate(program)?;

        let start_time = Instant::now();

        let mut pb = RowProblem::default();
        let mut cols = Vec::with_capacity(program.num_variables());

        for (var_def, &obj_coeff) in program.variables.iter().zip(&program.objective) {
            let lower = var_def.lower_bound;
            let upper = var_def.upper_bound.unwrap_or(f64::INFINITY);

            let col = match var_def.variable_type {
                VariableType::Integer | VariableType::Binary => {
                    pb.add_integer_column(obj_coeff, lower..=upper)
                }
                VariableType::Continuous => pb.add_column(obj_coeff, lower..=upper),
            };
            cols.push(col);
        }

        for constraint in &program.constraints {
            let terms: Vec<_> = constraint
                .terms
                .iter()
                .filter(|(_, coeff)| *coeff != 0.0)
                .map(|&(i, coeff)| (cols[i], coeff))
                .collect();

            match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => {
                    pb.add_row(..=constraint.bound, &terms);
                }
                ConstraintType::Equal => {
                    pb.add_row(constraint.bound..=constraint.bound, &terms);
                }
                ConstraintType::GreaterThanOrEqual => {
                    pb.add_row(constraint.bound.., &terms);
                }
            }
        }

        let sense = if program.optimization_type == OptimizationType::Maximize {
            Sense::Maximise
        } else {
            Sense::Minimise
        };

        let mut model = pb.optimise(sense);
        model.set_option("output_flag", program.settings.verbose);
        if let Some(seconds) = program.settings.time_limit_seconds {
            model.set_option("time_limit", seconds);
        }

        let solved = model.solve();
        let statistics =
            SolverStatistics::for_program(program, start_time.elapsed().as_secs_f64() * 1000.0);
        debug!(
            solver = "highs",
            program = %program.name,
            status = ?solved.status(),
            solve_time_ms = statistics.solve_time_ms,
        );

        match solved.status() {
            HighsModelStatus::Optimal => {
                let variable_values = solved.get_solution().columns().to_vec();
                let objective = program.evaluate(&variable_values);

                let mut solution = ProgramSolution::optimal(objective, variable_values);
                solution.statistics = statistics;
                solution.message = format!("Optimal solution found for '{}'", program.name);
                Ok(solution)
            }
            HighsModelStatus::ReachedTimeLimit => {
                // The incumbent is only usable if it satisfies every row.
                let variable_values = solved.get_solution().columns().to_vec();
                if is_feasible_assignment(program, &variable_values) {
                    let mut solution = ProgramSolution::new(
                        SolutionStatus::Feasible,
                        "Time limit reached with a feasible incumbent",
                    )
                    .with_statistics(statistics);
                    solution.optimal_value = Some(program.evaluate(&variable_values));
                    solution.variable_values = variable_values;
                    Ok(solution)
                } else {
                    Ok(ProgramSolution::new(
                        SolutionStatus::TimeLimit,
                        "Time limit reached before a feasible solution was found",
                    )
                    .with_statistics(statistics))
                }
            }
            HighsModelStatus::Infeasible => Ok(ProgramSolution::new(
                SolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            )
            .with_statistics(statistics)),
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                Ok(ProgramSolution::new(
                    SolutionStatus::Unbounded,
                    "Problem is unbounded or infeasible",
                )
                .with_statistics(statistics))
            }
            status => Err(SolverError::ExecutionFailed(format!(
                "HiGHS solver returned status: {:?}",
                status
            ))),
        }
    }

    fn name(&self) -> &str {
        "HiGHS"
    }

    fn supports_mip(&self) -> bool {
        true
    }
}

fn is_feasible_assignment(program: &IntegerProgram, values: &[f64]) -> bool {
    values.len() == program.num_variables()
        && program
            .variables
            .iter()
            .zip(values)
            .all(|(var, v)| !var.is_integer() || (v - v.round()).abs() <= FEASIBILITY_TOLERANCE)
        && program
            .constraints
            .iter()
            .all(|c| c.is_satisfied(values, FEASIBILITY_TOLERANCE))
}
