//! Pairwise absolute Pearson correlation between every feature column and the label.
//!
//! The caller's matrix is never touched. Features and label are copied into a
//! single feature-major working buffer (one contiguous row per variable, the
//! label last), standardized in place, and the correlation matrix is the Gram
//! matrix of those unit rows. Both buffers come from [`ScratchMatrix`] and spill
//! to disk when the configured [`StoragePolicy`] says so.

use crate::data::{as_feature_matrix, as_label_vector};
use crate::error::SelectionError;
use crate::progress::{CorrelationProgressObserver, CorrelationStage, NoopCorrelationProgress};
use crate::storage::{ScratchLocation, ScratchMatrix, StoragePolicy, scratch_size_bytes};
use ndarray::parallel::prelude::*;
use ndarray::{ArrayView1, ArrayView2, ArrayViewD, ArrayViewMut1, Axis, s};
use std::path::PathBuf;

/// Square `(m + 1) x (m + 1)` matrix of absolute correlations. Indices `0..m`
/// are the feature columns, index `m` is the label.
pub struct CorrelationMatrix {
    matrix: ScratchMatrix,
    constant: Vec<bool>,
}

impl CorrelationMatrix {
    pub fn dim(&self) -> usize {
        self.matrix.shape().0
    }

    pub fn n_features(&self) -> usize {
        self.dim() - 1
    }

    pub fn label_index(&self) -> usize {
        self.n_features()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    /// `|corr(feature, label)|`.
    pub fn relevance(&self, feature: usize) -> f64 {
        self.view()[(feature, self.label_index())]
    }

    /// `|corr(a, b)|` between two features.
    pub fn redundancy(&self, a: usize, b: usize) -> f64 {
        self.view()[(a, b)]
    }

    /// Per variable (features then label): whether it had zero variance.
    pub fn constant_variables(&self) -> &[bool] {
        &self.constant
    }

    pub fn is_spilled(&self) -> bool {
        self.matrix.is_spilled()
    }
}

#[derive(Clone, Debug, Default)]
pub struct CorrelationMatrixBuilder {
    policy: StoragePolicy,
    spill_dir: Option<PathBuf>,
}

impl CorrelationMatrixBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: StoragePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    pub fn build(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<CorrelationMatrix, SelectionError> {
        self.build_with_progress(x, y, &NoopCorrelationProgress)
    }

    /// Same as [`build`](Self::build) for inputs of unchecked dimensionality.
    pub fn build_dyn(
        &self,
        x: ArrayViewD<'_, f64>,
        y: ArrayViewD<'_, f64>,
    ) -> Result<CorrelationMatrix, SelectionError> {
        let x = as_feature_matrix(x)?;
        let y = as_label_vector(y)?;
        self.build(x, y)
    }

    pub fn build_with_progress<P>(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        progress: &P,
    ) -> Result<CorrelationMatrix, SelectionError>
    where
        P: CorrelationProgressObserver,
    {
        let (n_samples, n_features) = x.dim();
        if y.len() != n_samples {
            return Err(SelectionError::invalid(format!(
                "y has {} entries but X has {} samples",
                y.len(),
                n_samples
            )));
        }

        let dim = n_features + 1;
        let required = scratch_size_bytes(dim, n_samples)
            .zip(scratch_size_bytes(dim, dim))
            .and_then(|(work, out)| work.checked_add(out));
        let location = self.policy.resolve(required);
        match (location, required) {
            (ScratchLocation::Disk, Some(bytes)) => {
                log::debug!("Spilling {bytes} bytes of correlation scratch space to disk")
            }
            (ScratchLocation::Disk, None) => {
                log::debug!("Correlation scratch size overflows; spilling to disk")
            }
            (ScratchLocation::Memory, _) => {
                log::debug!("Keeping correlation scratch space ({required:?} bytes) in memory")
            }
        }
        let spill_dir = self.spill_dir.as_deref();

        let mut work = ScratchMatrix::zeros(dim, n_samples, location, spill_dir)?;
        let constant = {
            let mut view = work.view_mut();
            view.slice_mut(s![..n_features, ..]).assign(&x.t());
            view.row_mut(n_features).assign(&y);

            progress.on_stage_start(CorrelationStage::Standardize, dim);
            let constant: Vec<bool> = view
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .map(|row| {
                    let is_constant = standardize_row(row);
                    progress.on_stage_advance(CorrelationStage::Standardize, 1);
                    is_constant
                })
                .collect();
            progress.on_stage_finish(CorrelationStage::Standardize);
            constant
        };

        for (idx, &is_constant) in constant.iter().enumerate() {
            if !is_constant {
                continue;
            }
            if idx == n_features {
                log::warn!("Label has zero variance; every feature has zero relevance");
            } else {
                log::warn!("Feature column {idx} has zero variance; its correlations are set to 0");
            }
        }

        let mut out = ScratchMatrix::zeros(dim, dim, location, spill_dir)?;
        {
            let rows = work.view();
            let mut out_view = out.view_mut();

            progress.on_stage_start(CorrelationStage::Products, dim);
            out_view
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(i, mut out_row)| {
                    let left = rows.row(i);
                    out_row[i] = if constant[i] { 0.0 } else { 1.0 };
                    for j in (i + 1)..dim {
                        out_row[j] = left.dot(&rows.row(j)).clamp(-1.0, 1.0);
                    }
                    progress.on_stage_advance(CorrelationStage::Products, 1);
                });

            // Upper triangle is authoritative.
            for i in 1..dim {
                for j in 0..i {
                    out_view[(i, j)] = out_view[(j, i)];
                }
            }

            // Direction of a correlation does not matter for relevance or redundancy.
            out_view.mapv_inplace(f64::abs);
            progress.on_stage_finish(CorrelationStage::Products);
        }
        drop(work);

        Ok(CorrelationMatrix {
            matrix: out,
            constant,
        })
    }
}

/// Centres `row` and scales it to unit norm. Returns `true` (and zeroes the
/// row) when it has no variance to scale.
///
/// A row is constant when all its values are equal, or when its centred norm
/// is within the rounding noise of centring (`eps * max|x| * sqrt(n)`). The
/// cutoff follows float resolution only, so a large offset never hides real
/// variance.
fn standardize_row(mut row: ArrayViewMut1<'_, f64>) -> bool {
    let n = row.len();
    if n == 0 {
        return true;
    }
    let (min, max) = row
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let max_abs = min.abs().max(max.abs());
    let mean = row.sum() / n as f64;
    row.mapv_inplace(|value| value - mean);
    let norm = row.dot(&row).sqrt();
    let noise = f64::EPSILON * max_abs * (n as f64).sqrt();
    if min == max || !(norm > noise) {
        row.fill(0.0);
        return true;
    }
    let inv = norm.recip();
    row.mapv_inplace(|value| value * inv);
    false
}
