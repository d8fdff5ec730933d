use crate::error::SelectionError;
use crate::sampleset::SampleSet;
use crate::types::{SelectionMask, Variable};
use std::collections::HashMap;

/// Picks the lowest-energy feasible sample and projects it onto `variables`.
///
/// The sample set may list its variables in any order; the mask always follows
/// `variables`, which is the model's (column) order.
pub fn select_mask(
    sampleset: &SampleSet,
    variables: &[Variable],
) -> Result<SelectionMask, SelectionError> {
    let feasible = sampleset.feasible();
    log::debug!(
        "Solver returned {} samples, {} feasible",
        sampleset.len(),
        feasible.len()
    );

    let best = feasible.lowest().ok_or(SelectionError::NoFeasibleSolution)?;

    let positions: HashMap<Variable, usize> = sampleset
        .variables()
        .iter()
        .enumerate()
        .map(|(pos, &v)| (v, pos))
        .collect();

    let mask = variables
        .iter()
        .map(|v| {
            positions
                .get(v)
                .map(|&pos| best.values[pos] != 0)
                .ok_or_else(|| {
                    SelectionError::MalformedSampleSet(format!(
                        "variable {v} is missing from the returned samples"
                    ))
                })
        })
        .collect::<Result<Vec<bool>, _>>()?;

    log::info!(
        "Selected {} of {} features (energy {:.6})",
        mask.iter().filter(|&&keep| keep).count(),
        mask.len(),
        best.energy
    );
    Ok(SelectionMask::new(mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampleset::Sample;

    fn sample(values: Vec<u8>, energy: f64, is_feasible: bool) -> Sample {
        Sample {
            values,
            energy,
            is_feasible,
            is_satisfied: vec![is_feasible],
        }
    }

    fn vars(n: usize) -> Vec<Variable> {
        (0..n).map(Variable).collect()
    }

    #[test]
    fn infeasible_samples_never_win() {
        let set = SampleSet::new(
            vars(3),
            vec![
                sample(vec![1, 1, 1], -10.0, false),
                sample(vec![0, 1, 0], -1.0, true),
                sample(vec![1, 0, 0], -0.5, true),
            ],
        )
        .unwrap();
        let mask = select_mask(&set, &vars(3)).unwrap();
        assert_eq!(&*mask, &[false, true, false]);
    }

    #[test]
    fn no_feasible_sample_is_an_error() {
        let set = SampleSet::new(vars(2), vec![sample(vec![1, 1], -3.0, false)]).unwrap();
        assert!(matches!(
            select_mask(&set, &vars(2)),
            Err(SelectionError::NoFeasibleSolution)
        ));

        let empty = SampleSet::new(vars(2), Vec::new()).unwrap();
        assert!(matches!(
            select_mask(&empty, &vars(2)),
            Err(SelectionError::NoFeasibleSolution)
        ));
    }

    #[test]
    fn mask_follows_model_order_not_sample_order() {
        let shuffled = vec![Variable(2), Variable(0), Variable(1)];
        let set = SampleSet::new(shuffled, vec![sample(vec![1, 0, 0], 0.0, true)]).unwrap();
        let mask = select_mask(&set, &vars(3)).unwrap();
        assert_eq!(&*mask, &[false, false, true]);
    }

    #[test]
    fn missing_variable_is_reported() {
        let set = SampleSet::new(vars(2), vec![sample(vec![1, 0], 0.0, true)]).unwrap();
        assert!(matches!(
            select_mask(&set, &vars(3)),
            Err(SelectionError::MalformedSampleSet(_))
        ));
    }
}
