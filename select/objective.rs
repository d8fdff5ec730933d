//! Relevance/redundancy objective built from an absolute correlation matrix.
//!
//! Following Milne, Rounds and Goddard (2017), "Optimal Feature Selection in
//! Credit Scoring and Classification Using a Quantum Annealer":
//!
//! - feature `i` carries a linear bias of `-alpha * |corr(i, label)|`;
//! - every ordered pair `(i, j)`, `i != j`, adds `|corr(i, j)|` to the pair's
//!   quadratic bias, so each unordered pair ends up with twice the correlation.
//!
//! Only the relevance term is weighted by `alpha`. The redundancy term keeps
//! its full magnitude for every `alpha`, which keeps the solutions identical to
//! the full symmetric-matrix formulation of the paper.

use crate::config::validate_alpha;
use crate::correlation::CorrelationMatrix;
use crate::error::SelectionError;
use crate::model::ConstrainedQuadraticModel;
use crate::types::Variable;
use itertools::iproduct;

/// Writes the selection objective for `correlations` into `model`.
///
/// `model` must have exactly one variable per feature, in column order.
pub fn assemble_objective(
    model: &mut ConstrainedQuadraticModel,
    correlations: &CorrelationMatrix,
    alpha: f64,
) -> Result<(), SelectionError> {
    validate_alpha(alpha)?;
    let n_features = correlations.n_features();
    if model.num_variables() != n_features {
        return Err(SelectionError::invalid(format!(
            "model has {} variables but the correlation matrix covers {} features",
            model.num_variables(),
            n_features
        )));
    }

    let matrix = correlations.view();
    let label = correlations.label_index();
    let objective = model.objective_mut();
    for (i, j) in iproduct!(0..n_features, 0..n_features) {
        let bias = if i == j {
            -matrix[(i, label)] * alpha
        } else {
            matrix[(i, j)]
        };
        objective.add_quadratic(Variable(i), Variable(j), bias);
    }

    log::debug!(
        "Assembled objective over {} variables ({} quadratic pairs)",
        n_features,
        n_features * n_features.saturating_sub(1) / 2
    );
    Ok(())
}
