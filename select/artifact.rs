//! Persisted selections: the configuration a selector was fitted with plus the
//! mask it produced, stored as TOML so a later run can `transform` new data
//! without solving again.

use crate::config::SelectorConfig;
use crate::error::SelectionError;
use crate::selector::QuadraticModelSelector;
use crate::solver::CqmSolver;
use crate::types::SelectionMask;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionArtifact {
    pub n_features: usize,
    pub mask: SelectionMask,
    /// Names of the input columns, when the selection was fitted on a table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub config: SelectorConfig,
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to read or write selection file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML selection file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize selection to TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Selection mask has {found} entries but n_features is {expected}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Selection names {names} columns but n_features is {expected}")]
    NameMismatch { expected: usize, names: usize },
    #[error(transparent)]
    Invalid(#[from] SelectionError),
}

impl SelectionArtifact {
    pub fn new(config: SelectorConfig, mask: SelectionMask) -> Self {
        Self {
            n_features: mask.len(),
            mask,
            feature_names: None,
            config,
        }
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// Names of the kept columns. `None` when the artifact carries no column
    /// names, or too few of them to cover the selection.
    pub fn selected_names(&self) -> Option<Vec<&str>> {
        let names = self.feature_names.as_ref()?;
        self.mask
            .indices()
            .into_iter()
            .map(|idx| names.get(idx).map(String::as_str))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        self.config.validate()?;
        if self.mask.len() != self.n_features {
            return Err(ArtifactError::LengthMismatch {
                expected: self.n_features,
                found: self.mask.len(),
            });
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.n_features {
                return Err(ArtifactError::NameMismatch {
                    expected: self.n_features,
                    names: names.len(),
                });
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        self.validate()?;
        fs::write(path, toml::to_string_pretty(self)?)?;
        log::info!(
            "Saved selection of {} / {} features to {}",
            self.mask.num_selected(),
            self.n_features,
            path.display()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let text = fs::read_to_string(path)?;
        let artifact: Self = toml::from_str(&text)?;
        artifact.validate()?;
        Ok(artifact)
    }
}

impl<S: CqmSolver> QuadraticModelSelector<S> {
    /// Snapshot of the fitted selection. Fails with `NotFitted` before `fit`.
    pub fn artifact(&self) -> Result<SelectionArtifact, SelectionError> {
        let mask = self.get_support_mask()?.clone();
        Ok(SelectionArtifact::new(self.config().clone(), mask))
    }

    pub fn from_artifact(artifact: SelectionArtifact, solver: S) -> Result<Self, ArtifactError> {
        artifact.validate()?;
        Ok(Self::fitted(artifact.config, solver, artifact.mask)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::FitOptions;
    use crate::solver::ExactCqmSolver;
    use ndarray::array;

    #[test]
    fn fitted_selection_survives_a_round_trip_through_disk() {
        let x = array![
            [1.0, 0.3, 7.0],
            [2.0, 0.9, 2.0],
            [6.0, 0.1, 5.0],
            [4.0, 0.5, 1.0],
            [8.0, 0.4, 4.0]
        ];
        let y = array![0.5, 1.0, 3.0, 2.0, 4.0];
        let config = SelectorConfig::default().with_num_features(1).with_alpha(1.0);
        let mut selector = QuadraticModelSelector::new(config, ExactCqmSolver::new()).unwrap();
        selector.fit(x.view(), y.view(), FitOptions::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection.toml");
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let artifact = selector.artifact().unwrap().with_feature_names(names);
        artifact.save(&path).unwrap();

        let loaded = SelectionArtifact::load(&path).unwrap();
        assert_eq!(loaded, artifact);
        assert_eq!(loaded.selected_names(), Some(vec!["a"]));

        let restored = QuadraticModelSelector::from_artifact(loaded, ExactCqmSolver::new()).unwrap();
        assert_eq!(
            restored.get_support_mask().unwrap(),
            selector.get_support_mask().unwrap()
        );
        assert_eq!(restored.transform(x.view()).unwrap(), selector.transform(x.view()).unwrap());
    }

    #[test]
    fn short_name_list_yields_no_names() {
        let mask = SelectionMask::new(vec![false, true, true]);
        let artifact = SelectionArtifact::new(SelectorConfig::default(), mask)
            .with_feature_names(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(artifact.selected_names(), None);
        assert!(matches!(
            artifact.validate(),
            Err(ArtifactError::NameMismatch {
                expected: 3,
                names: 2
            })
        ));

        let unnamed = SelectionArtifact::new(SelectorConfig::default(), SelectionMask::all(2));
        assert_eq!(unnamed.selected_names(), None);
    }

    #[test]
    fn unfitted_selector_has_no_artifact() {
        let selector =
            QuadraticModelSelector::new(SelectorConfig::default(), ExactCqmSolver::new()).unwrap();
        assert!(matches!(selector.artifact(), Err(SelectionError::NotFitted)));
    }

    #[test]
    fn inconsistent_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection.toml");
        fs::write(
            &path,
            "n_features = 3\nmask = [true, false]\n\n[config]\nnum_features = 1\n",
        )
        .unwrap();
        assert!(matches!(
            SelectionArtifact::load(&path),
            Err(ArtifactError::LengthMismatch {
                expected: 3,
                found: 2
            })
        ));

        fs::write(&path, "n_features = 1\nmask = [true]\n\n[config]\nalpha = 3.0\n").unwrap();
        assert!(matches!(
            SelectionArtifact::load(&path),
            Err(ArtifactError::Invalid(SelectionError::InvalidInput(_)))
        ));
    }
}
