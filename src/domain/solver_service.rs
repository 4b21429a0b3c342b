// Domain service interface for solving integer programs
// Any backend adapter implements this contract; the lineup engine only sees the trait

use super::models::{IntegerProgram, ProgramSolution};

/// Error types for the solver service
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),

    #[error("Solver execution failed: {0}")]
    ExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Domain service interface for integer-programming solvers
pub trait MipSolver: Send + Sync {
    /// Solve an integer program
    fn solve(&self, program: &IntegerProgram) -> Result<ProgramSolution>;

    /// Validate a program without solving it
    fn validate(&self, program: &IntegerProgram) -> Result<()> {
        let mut errors = Vec::new();

        let num_vars = program.num_variables();

        if program.objective.len() != num_vars {
            errors.push(format!(
                "Objective has {} coefficients but program has {} variables",
                program.objective.len(),
                num_vars
            ));
        }

        for (i, constraint) in program.constraints.iter().enumerate() {
            if let Some(&(index, _)) = constraint.terms.iter().find(|(index, _)| *index >= num_vars)
            {
                errors.push(format!(
                    "Constraint {} '{}' references variable {} but program has {} variables",
                    i, constraint.name, index, num_vars
                ));
            }
        }

        for (i, var) in program.variables.iter().enumerate() {
            if let Some(upper) = var.upper_bound {
                if var.lower_bound > upper {
                    errors.push(format!(
                        "Variable {} '{}' has lower bound ({}) > upper bound ({})",
                        i, var.name, var.lower_bound, upper
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SolverError::InvalidProblem(errors.join("; ")))
        }
    }

    /// Get the name of this solver backend
    fn name(&self) -> &str;

    /// Check if this solver supports mixed-integer programming
    fn supports_mip(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Constraint, Variable};
    use crate::domain::value_objects::OptimizationType;

    struct NullSolver;

    impl MipSolver for NullSolver {
        fn solve(&self, _program: &IntegerProgram) -> Result<ProgramSolution> {
            Err(SolverError::SolverNotAvailable("null".into()))
        }

        fn name(&self) -> &str {
            "null"
        }

        fn supports_mip(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_program() {
        let mut program = IntegerProgram::new(OptimizationType::Maximize);
        let x = program.add_variable(Variable::binary("x"), 1.0);
        program.add_constraint(Constraint::leq(vec![(x, 1.0)], 1.0));
        assert!(NullSolver.validate(&program).is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_terms_and_bounds() {
        let mut program = IntegerProgram::new(OptimizationType::Maximize);
        program.add_variable(Variable::integer("x").with_bounds(3.0, Some(1.0)), 1.0);
        program.add_constraint(Constraint::leq(vec![(7, 1.0)], 1.0).with_name("bad"));

        let err = NullSolver.validate(&program).unwrap_err().to_string();
        assert!(err.contains("references variable 7"));
        assert!(err.contains("lower bound"));
    }
}
