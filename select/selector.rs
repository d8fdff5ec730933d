//! The fit / unfit lifecycle of a quadratic-model feature selector.
//!
//! A selector starts `Unfitted`. A successful `fit` stores a mask and moves it
//! to `Fitted`; `unfit` drops the mask again. A failing `fit` leaves the state
//! exactly as it was, so no partial or invalid mask is ever observable.

use crate::config::{SelectionMethod, SelectorConfig, validate_alpha, validate_num_features};
use crate::constraint::cardinality_constraint;
use crate::correlation::CorrelationMatrixBuilder;
use crate::data::{as_feature_matrix, as_label_vector};
use crate::error::SelectionError;
use crate::model::ConstrainedQuadraticModel;
use crate::objective::assemble_objective;
use crate::progress::{CorrelationProgressObserver, NoopCorrelationProgress};
use crate::solution::select_mask;
use crate::solver::{CqmSolver, ExactCqmSolver};
use crate::types::SelectionMask;
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewD, Axis};

/// Per-call overrides for [`QuadraticModelSelector::fit`]. Unset fields fall
/// back to the selector's [`SelectorConfig`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FitOptions {
    pub alpha: Option<f64>,
    pub num_features: Option<usize>,
    pub time_limit: Option<f64>,
}

impl FitOptions {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn with_num_features(mut self, num_features: usize) -> Self {
        self.num_features = Some(num_features);
        self
    }

    pub fn with_time_limit(mut self, time_limit: f64) -> Self {
        self.time_limit = Some(time_limit);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SelectionState {
    #[default]
    Unfitted,
    Fitted(SelectionMask),
}

/// Builds the correlation-based selection model: one binary variable per
/// column of `x`, a cardinality constraint on `num_features`, and the
/// relevance/redundancy objective.
///
/// Scratch space for the correlation matrix is released before returning.
pub fn build_correlation_model(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    alpha: f64,
    num_features: usize,
    strict: bool,
    builder: &CorrelationMatrixBuilder,
) -> Result<ConstrainedQuadraticModel, SelectionError> {
    build_correlation_model_with_progress(
        x,
        y,
        alpha,
        num_features,
        strict,
        builder,
        &NoopCorrelationProgress,
    )
}

pub fn build_correlation_model_with_progress<P>(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    alpha: f64,
    num_features: usize,
    strict: bool,
    builder: &CorrelationMatrixBuilder,
    progress: &P,
) -> Result<ConstrainedQuadraticModel, SelectionError>
where
    P: CorrelationProgressObserver,
{
    validate_alpha(alpha)?;
    validate_num_features(num_features)?;
    validate_finite(x, y)?;

    let (n_samples, n_features) = x.dim();
    log::info!(
        "Building correlation model: {n_samples} samples, {n_features} features, num_features={num_features}, alpha={alpha}, strict={strict}"
    );

    let mut model = ConstrainedQuadraticModel::with_binary_variables(n_features);
    let constraint = cardinality_constraint(model.variables(), num_features, strict)?;
    model.add_constraint(constraint)?;

    let correlations = builder.build_with_progress(x, y, progress)?;
    assemble_objective(&mut model, &correlations, alpha)?;
    drop(correlations);

    Ok(model)
}

fn validate_finite(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), SelectionError> {
    if let Some(((row, col), _)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(SelectionError::invalid(format!(
            "X contains a non-finite value at row {row}, column {col}"
        )));
    }
    if let Some((idx, _)) = y.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(SelectionError::invalid(format!(
            "y contains a non-finite value at index {idx}"
        )));
    }
    Ok(())
}

/// Selects `num_features` features by solving a constrained quadratic model.
pub struct QuadraticModelSelector<S = ExactCqmSolver> {
    config: SelectorConfig,
    solver: S,
    state: SelectionState,
}

impl<S: CqmSolver> QuadraticModelSelector<S> {
    pub fn new(config: SelectorConfig, solver: S) -> Result<Self, SelectionError> {
        config.validate()?;
        Ok(Self {
            config,
            solver,
            state: SelectionState::Unfitted,
        })
    }

    /// A selector already in the `Fitted` state, e.g. restored from disk.
    pub fn fitted(
        config: SelectorConfig,
        solver: S,
        mask: SelectionMask,
    ) -> Result<Self, SelectionError> {
        let mut selector = Self::new(config, solver)?;
        selector.state = SelectionState::Fitted(mask);
        Ok(selector)
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, SelectionState::Fitted(_))
    }

    fn correlation_builder(&self) -> CorrelationMatrixBuilder {
        let builder = CorrelationMatrixBuilder::new().with_policy(self.config.storage);
        match &self.config.scratch_dir {
            Some(dir) => builder.with_spill_dir(dir.clone()),
            None => builder,
        }
    }

    pub fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        options: FitOptions,
    ) -> Result<&SelectionMask, SelectionError> {
        self.fit_with_progress(x, y, options, &NoopCorrelationProgress)
    }

    /// [`fit`](Self::fit) for inputs whose dimensionality is not known
    /// statically. A one-dimensional `x` is read as a single sample.
    pub fn fit_dyn(
        &mut self,
        x: ArrayViewD<'_, f64>,
        y: ArrayViewD<'_, f64>,
        options: FitOptions,
    ) -> Result<&SelectionMask, SelectionError> {
        let x = as_feature_matrix(x)?;
        let y = as_label_vector(y)?;
        self.fit(x, y, options)
    }

    pub fn fit_with_progress<P>(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        options: FitOptions,
        progress: &P,
    ) -> Result<&SelectionMask, SelectionError>
    where
        P: CorrelationProgressObserver,
    {
        let alpha = options.alpha.unwrap_or(self.config.alpha);
        let num_features = options.num_features.unwrap_or(self.config.num_features);
        let time_limit = options.time_limit.or(self.config.time_limit);
        validate_alpha(alpha)?;
        validate_num_features(num_features)?;

        let (n_samples, n_features) = x.dim();
        if y.len() != n_samples {
            return Err(SelectionError::invalid(format!(
                "y has {} entries but X has {} samples",
                y.len(),
                n_samples
            )));
        }

        if num_features >= n_features {
            log::info!(
                "Requested {num_features} features and only {n_features} are available; keeping all of them"
            );
            self.state = SelectionState::Fitted(SelectionMask::all(n_features));
            return self.get_support_mask();
        }

        if n_samples == 0 {
            return Err(SelectionError::invalid("X must contain at least one sample"));
        }

        let model = match self.config.method {
            SelectionMethod::Correlation => build_correlation_model_with_progress(
                x,
                y,
                alpha,
                num_features,
                self.config.strict,
                &self.correlation_builder(),
                progress,
            )?,
        };

        log::info!(
            "Dispatching model with {} variables and {} constraint(s) to the solver (time limit: {:?})",
            model.num_variables(),
            model.constraints().len(),
            time_limit
        );
        let sampleset = self.solver.sample_cqm(&model, time_limit)?;
        let mask = select_mask(&sampleset, model.variables())?;
        debug_assert_eq!(mask.len(), n_features);

        self.state = SelectionState::Fitted(mask);
        self.get_support_mask()
    }

    /// Drops the stored mask and returns it. Fails with `NotFitted` when there
    /// is nothing to drop.
    pub fn unfit(&mut self) -> Result<SelectionMask, SelectionError> {
        match std::mem::take(&mut self.state) {
            SelectionState::Fitted(mask) => Ok(mask),
            SelectionState::Unfitted => Err(SelectionError::NotFitted),
        }
    }

    pub fn get_support_mask(&self) -> Result<&SelectionMask, SelectionError> {
        match &self.state {
            SelectionState::Fitted(mask) => Ok(mask),
            SelectionState::Unfitted => Err(SelectionError::NotFitted),
        }
    }

    pub fn support_indices(&self) -> Result<Vec<usize>, SelectionError> {
        Ok(self.get_support_mask()?.indices())
    }

    /// Keeps only the selected columns of `x`.
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, SelectionError> {
        let mask = self.get_support_mask()?;
        if x.ncols() != mask.len() {
            return Err(SelectionError::invalid(format!(
                "X has {} features, but the selector was fitted on {}",
                x.ncols(),
                mask.len()
            )));
        }
        Ok(x.select(Axis(1), &mask.indices()))
    }
}
