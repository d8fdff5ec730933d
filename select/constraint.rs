use crate::config::validate_num_features;
use crate::error::SelectionError;
use crate::model::{LinearConstraint, Sense};
use crate::types::Variable;

pub const CARDINALITY_LABEL: &str = "num_features";

/// `sum(variables) == k` when `strict`, otherwise `sum(variables) <= k`.
pub fn cardinality_constraint(
    variables: &[Variable],
    k: usize,
    strict: bool,
) -> Result<LinearConstraint, SelectionError> {
    validate_num_features(k)?;
    Ok(LinearConstraint {
        label: CARDINALITY_LABEL.to_string(),
        terms: variables.iter().map(|&v| (v, 1.0)).collect(),
        sense: if strict { Sense::Eq } else { Sense::Le },
        rhs: k as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_every_variable_with_unit_weight() {
        let vars: Vec<Variable> = (0..4).map(Variable).collect();
        let c = cardinality_constraint(&vars, 2, true).unwrap();
        assert_eq!(c.sense, Sense::Eq);
        assert_eq!(c.rhs, 2.0);
        assert_eq!(c.terms.len(), 4);
        assert!(c.terms.iter().all(|&(_, coeff)| coeff == 1.0));
        assert_eq!(c.lhs(&[1, 0, 1, 1]), 3.0);
    }

    #[test]
    fn relaxed_constraint_is_an_upper_bound() {
        let vars: Vec<Variable> = (0..3).map(Variable).collect();
        let c = cardinality_constraint(&vars, 2, false).unwrap();
        assert_eq!(c.sense, Sense::Le);
        assert!(c.is_satisfied(&[0, 0, 0], 1e-6));
        assert!(!c.is_satisfied(&[1, 1, 1], 1e-6));
    }

    #[test]
    fn zero_k_is_invalid() {
        let vars = [Variable(0)];
        assert!(matches!(
            cardinality_constraint(&vars, 0, true),
            Err(SelectionError::InvalidInput(_))
        ));
    }
}
