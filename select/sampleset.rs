use crate::error::SelectionError;
use crate::types::Variable;

/// One candidate assignment returned by a solver.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// 0/1 value per variable, in the owning [`SampleSet`]'s variable order.
    pub values: Vec<u8>,
    pub energy: f64,
    pub is_feasible: bool,
    /// Per-constraint satisfaction, in model constraint order.
    pub is_satisfied: Vec<bool>,
}

/// Samples in solver order together with the variable order their values use.
///
/// No ordering by energy is implied; use [`lowest`](Self::lowest) to pick the
/// best sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleSet {
    variables: Vec<Variable>,
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn new(variables: Vec<Variable>, samples: Vec<Sample>) -> Result<Self, SelectionError> {
        if let Some((idx, sample)) = samples
            .iter()
            .enumerate()
            .find(|(_, sample)| sample.values.len() != variables.len())
        {
            return Err(SelectionError::MalformedSampleSet(format!(
                "sample {idx} assigns {} values over {} variables",
                sample.values.len(),
                variables.len()
            )));
        }
        Ok(Self { variables, samples })
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// A sample set with only the samples satisfying `keep`, order preserved.
    pub fn filter<F>(&self, mut keep: F) -> SampleSet
    where
        F: FnMut(&Sample) -> bool,
    {
        SampleSet {
            variables: self.variables.clone(),
            samples: self.samples.iter().filter(|s| keep(*s)).cloned().collect(),
        }
    }

    pub fn feasible(&self) -> SampleSet {
        self.filter(|sample| sample.is_feasible)
    }

    /// Lowest-energy sample; among equal energies the earliest one wins.
    pub fn lowest(&self) -> Option<&Sample> {
        self.samples
            .iter()
            .min_by(|a, b| a.energy.total_cmp(&b.energy))
    }

    pub fn num_feasible(&self) -> usize {
        self.samples.iter().filter(|s| s.is_feasible).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(values: Vec<u8>, energy: f64, is_feasible: bool) -> Sample {
        Sample {
            values,
            energy,
            is_feasible,
            is_satisfied: vec![is_feasible],
        }
    }

    #[test]
    fn lowest_prefers_first_on_ties() {
        let set = SampleSet::new(
            vec![Variable(0), Variable(1)],
            vec![
                sample(vec![1, 0], -1.0, true),
                sample(vec![0, 1], -2.0, true),
                sample(vec![1, 1], -2.0, true),
            ],
        )
        .unwrap();
        assert_eq!(set.lowest().unwrap().values, vec![0, 1]);
    }

    #[test]
    fn feasible_filter_keeps_order() {
        let set = SampleSet::new(
            vec![Variable(0), Variable(1)],
            vec![
                sample(vec![1, 1], -5.0, false),
                sample(vec![1, 0], -1.0, true),
                sample(vec![0, 1], -0.5, true),
            ],
        )
        .unwrap();
        let feasible = set.feasible();
        assert_eq!(feasible.len(), 2);
        assert_eq!(set.num_feasible(), 2);
        assert_eq!(feasible.samples()[0].values, vec![1, 0]);
        assert_eq!(feasible.lowest().unwrap().energy, -1.0);
    }

    #[test]
    fn ragged_samples_are_rejected() {
        let err = SampleSet::new(vec![Variable(0)], vec![sample(vec![1, 0], 0.0, true)])
            .err()
            .unwrap();
        assert!(matches!(err, SelectionError::MalformedSampleSet(_)));
    }
}
