//! The solver seam: anything that can sample a [`ConstrainedQuadraticModel`].
//!
//! Remote hybrid solvers live outside this crate and implement [`CqmSolver`].
//! They own networking, authentication, time budgets and retries; this crate
//! only distinguishes an unreachable solver from one that answered.

use crate::model::ConstrainedQuadraticModel;
use crate::sampleset::SampleSet;
use rayon::prelude::*;
use thiserror::Error;

pub const DEFAULT_EXACT_MAX_VARIABLES: usize = 16;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("solver unavailable: {0}")]
    Unavailable(String),
    #[error("solver authentication failed: {0}")]
    Authentication(String),
    #[error("solver rejected the problem: {0}")]
    Rejected(String),
}

pub trait CqmSolver {
    /// Samples `model`. `time_limit` is in seconds; `None` leaves it to the solver.
    fn sample_cqm(
        &self,
        model: &ConstrainedQuadraticModel,
        time_limit: Option<f64>,
    ) -> Result<SampleSet, SolverError>;
}

impl<T: CqmSolver + ?Sized> CqmSolver for &T {
    fn sample_cqm(
        &self,
        model: &ConstrainedQuadraticModel,
        time_limit: Option<f64>,
    ) -> Result<SampleSet, SolverError> {
        (**self).sample_cqm(model, time_limit)
    }
}

/// Brute-force solver returning every assignment of the model's variables,
/// feasible or not, in binary counting order (variable 0 is the lowest bit).
#[derive(Clone, Debug)]
pub struct ExactCqmSolver {
    max_variables: usize,
}

impl Default for ExactCqmSolver {
    fn default() -> Self {
        Self {
            max_variables: DEFAULT_EXACT_MAX_VARIABLES,
        }
    }
}

impl ExactCqmSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upper bound on model size; the sample set grows as `2^n`. Values above
    /// 63 are clamped.
    pub fn with_max_variables(mut self, max_variables: usize) -> Self {
        self.max_variables = max_variables.min(63);
        self
    }

    pub fn max_variables(&self) -> usize {
        self.max_variables
    }
}

impl CqmSolver for ExactCqmSolver {
    fn sample_cqm(
        &self,
        model: &ConstrainedQuadraticModel,
        time_limit: Option<f64>,
    ) -> Result<SampleSet, SolverError> {
        if let Some(limit) = time_limit {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(SolverError::Rejected(format!(
                    "time_limit must be a positive number of seconds, given {limit}"
                )));
            }
        }
        let n = model.num_variables();
        if n > self.max_variables {
            return Err(SolverError::Rejected(format!(
                "exact enumeration supports at most {} variables, model has {n}",
                self.max_variables
            )));
        }

        let count = 1u64 << n;
        log::debug!("Enumerating {count} assignments over {n} variables");
        let samples = (0..count)
            .into_par_iter()
            .map(|bits| {
                let values = (0..n).map(|v| ((bits >> v) & 1) as u8).collect();
                model.evaluate(values)
            })
            .collect();

        SampleSet::new(model.variables().to_vec(), samples)
            .map_err(|e| SolverError::Rejected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::cardinality_constraint;
    use crate::types::Variable;

    fn two_of_three() -> ConstrainedQuadraticModel {
        let mut model = ConstrainedQuadraticModel::with_binary_variables(3);
        model.objective_mut().add_linear(Variable(0), -1.0);
        model.objective_mut().add_linear(Variable(2), -2.0);
        let c = cardinality_constraint(model.variables(), 2, true).unwrap();
        model.add_constraint(c).unwrap();
        model
    }

    #[test]
    fn enumerates_every_assignment() {
        let model = two_of_three();
        let set = ExactCqmSolver::new().sample_cqm(&model, None).unwrap();
        assert_eq!(set.len(), 8);
        assert_eq!(set.num_feasible(), 3);
        assert_eq!(set.samples()[5].values, vec![1, 0, 1]);

        let best = set.feasible();
        let best = best.lowest().unwrap();
        assert_eq!(best.values, vec![1, 0, 1]);
        assert_eq!(best.energy, -3.0);
    }

    #[test]
    fn rejects_oversized_models_and_bad_time_limits() {
        let model = ConstrainedQuadraticModel::with_binary_variables(5);
        let small = ExactCqmSolver::new().with_max_variables(4);
        assert!(matches!(
            small.sample_cqm(&model, None),
            Err(SolverError::Rejected(_))
        ));

        let solver = ExactCqmSolver::new();
        assert!(matches!(
            solver.sample_cqm(&model, Some(-1.0)),
            Err(SolverError::Rejected(_))
        ));
        assert!(matches!(
            solver.sample_cqm(&model, Some(f64::NAN)),
            Err(SolverError::Rejected(_))
        ));
        assert!(solver.sample_cqm(&model, Some(5.0)).is_ok());
    }

    #[test]
    fn empty_model_has_one_empty_sample() {
        let model = ConstrainedQuadraticModel::with_binary_variables(0);
        let set = ExactCqmSolver::new().sample_cqm(&model, None).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.samples()[0].values.is_empty());
    }
}
