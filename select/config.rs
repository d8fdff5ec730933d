use crate::error::SelectionError;
use crate::storage::StoragePolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_ALPHA: f64 = 0.5;
pub const DEFAULT_NUM_FEATURES: usize = 10;

/// How feature relevance and redundancy are scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum SelectionMethod {
    /// Absolute Pearson correlation.
    #[default]
    Correlation,
}

impl SelectionMethod {
    pub const ACCEPTED: &'static [&'static str] = &["correlation"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correlation => "correlation",
        }
    }
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionMethod {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "correlation" => Ok(Self::Correlation),
            "mutual information" | "mutual_information" => Err(SelectionError::invalid(
                "method 'mutual information' is not implemented",
            )),
            other => Err(SelectionError::invalid(format!(
                "method must be one of {:?}, given '{other}'",
                Self::ACCEPTED
            ))),
        }
    }
}

impl TryFrom<String> for SelectionMethod {
    type Error = SelectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Constructor arguments of a [`QuadraticModelSelector`](crate::selector::QuadraticModelSelector).
///
/// `alpha` weighs relevance against redundancy: `0` leaves only the
/// redundancy penalty, larger values reward correlation with the label more.
/// The redundancy penalty is never scaled by `alpha`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub alpha: f64,
    pub method: SelectionMethod,
    pub num_features: usize,
    /// Seconds handed to the solver; unset uses the solver's default.
    pub time_limit: Option<f64>,
    /// `true` selects exactly `num_features`, `false` at most that many.
    pub strict: bool,
    pub storage: StoragePolicy,
    /// Directory for spilled scratch files; the system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            method: SelectionMethod::Correlation,
            num_features: DEFAULT_NUM_FEATURES,
            time_limit: None,
            strict: true,
            storage: StoragePolicy::Auto,
            scratch_dir: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config to TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Invalid(#[from] SelectionError),
}

pub(crate) fn validate_alpha(alpha: f64) -> Result<(), SelectionError> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(SelectionError::invalid(format!(
            "alpha must be between 0 and 1, given {alpha}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_num_features(num_features: usize) -> Result<(), SelectionError> {
    if num_features == 0 {
        return Err(SelectionError::invalid(
            "num_features must be a positive integer, given 0",
        ));
    }
    Ok(())
}

impl SelectorConfig {
    pub fn validate(&self) -> Result<(), SelectionError> {
        validate_alpha(self.alpha)?;
        validate_num_features(self.num_features)
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_num_features(mut self, num_features: usize) -> Self {
        self.num_features = num_features;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Option<f64>) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_storage(mut self, storage: StoragePolicy) -> Self {
        self.storage = storage;
        self
    }

    /// Sets the method from its textual name, rejecting unsupported ones.
    pub fn with_method_name(mut self, name: &str) -> Result<Self, SelectionError> {
        self.method = name.parse()?;
        Ok(self)
    }

    /// Loads and validates a config from a TOML file. An unsupported `method`
    /// is reported as invalid input, as with [`with_method_name`](Self::with_method_name).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let mut table: toml::Table = toml::from_str(&text)?;
        let method = match table.remove("method") {
            Some(toml::Value::String(name)) => Some(name.parse::<SelectionMethod>()?),
            Some(other) => {
                return Err(SelectionError::invalid(format!(
                    "method must be a string, given {other}"
                ))
                .into());
            }
            None => None,
        };
        let mut config: Self = toml::Value::Table(table).try_into()?;
        if let Some(method) = method {
            config.method = method;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SelectorConfig::default();
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.num_features, 10);
        assert!(config.strict);
        assert!(config.time_limit.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn validation_rejects_bad_hyperparameters() {
        for alpha in [-0.1, 1.01, f64::NAN, f64::INFINITY] {
            let config = SelectorConfig::default().with_alpha(alpha);
            assert!(matches!(config.validate(), Err(SelectionError::InvalidInput(_))));
        }
        let config = SelectorConfig::default().with_num_features(0);
        assert!(matches!(config.validate(), Err(SelectionError::InvalidInput(_))));
    }

    #[test]
    fn method_names() {
        assert_eq!(
            "correlation".parse::<SelectionMethod>().unwrap(),
            SelectionMethod::Correlation
        );
        assert!("mutual information".parse::<SelectionMethod>().is_err());
        assert!("lasso".parse::<SelectionMethod>().is_err());
        assert!(SelectorConfig::default().with_method_name("pca").is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selector.toml");
        fs::write(&path, "alpha = 0.25\nnum_features = 3\nstorage = \"disk\"\n").unwrap();
        let config = SelectorConfig::load(&path).unwrap();
        assert_eq!(config.alpha, 0.25);
        assert_eq!(config.num_features, 3);
        assert_eq!(config.storage, StoragePolicy::Disk);
        assert_eq!(config.method, SelectionMethod::Correlation);
        assert!(config.strict);

        fs::write(&path, "alpha = 2.0\n").unwrap();
        assert!(matches!(
            SelectorConfig::load(&path),
            Err(ConfigError::Invalid(SelectionError::InvalidInput(_)))
        ));

        fs::write(&path, "alpha = [1, 2]\n").unwrap();
        assert!(matches!(SelectorConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn unsupported_method_in_a_file_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selector.toml");
        for body in [
            "method = \"mutual_information\"\n",
            "method = \"mutual information\"\n",
            "method = \"lasso\"\n",
            "method = 3\n",
        ] {
            fs::write(&path, body).unwrap();
            assert!(
                matches!(
                    SelectorConfig::load(&path),
                    Err(ConfigError::Invalid(SelectionError::InvalidInput(_)))
                ),
                "{body}"
            );
        }

        fs::write(&path, "method = \"correlation\"\nnum_features = 2\n").unwrap();
        let config = SelectorConfig::load(&path).unwrap();
        assert_eq!(config.method, SelectionMethod::Correlation);
        assert_eq!(config.num_features, 2);
    }

    #[test]
    fn embedded_method_goes_through_the_name_parser() {
        let parsed: Result<SelectorConfig, _> = toml::from_str("method = \"mutual_information\"\n");
        let err = parsed.unwrap_err();
        assert!(err.to_string().contains("not implemented"), "{err}");
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selector.toml");
        let config = SelectorConfig::default()
            .with_alpha(0.8)
            .with_time_limit(Some(12.5))
            .with_strict(false);
        config.save(&path).unwrap();
        assert_eq!(SelectorConfig::load(&path).unwrap(), config);
    }
}
