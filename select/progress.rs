use std::fmt;

/// Stages reported while building the correlation matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CorrelationStage {
    Standardize,
    Products,
}

impl CorrelationStage {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Standardize => "column standardization",
            Self::Products => "pairwise correlation products",
        }
    }
}

impl fmt::Display for CorrelationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Observer for incremental progress during the correlation computation.
///
/// Rows are processed on the rayon pool, so callbacks take `&self` and may be
/// invoked from several threads at once.
pub trait CorrelationProgressObserver: Sync {
    fn on_stage_start(&self, stage: CorrelationStage, total_rows: usize) {
        let _ = (stage, total_rows);
    }
    fn on_stage_advance(&self, stage: CorrelationStage, rows: usize) {
        let _ = (stage, rows);
    }
    fn on_stage_finish(&self, stage: CorrelationStage) {
        let _ = stage;
    }
}

#[derive(Default)]
pub struct NoopCorrelationProgress;

impl CorrelationProgressObserver for NoopCorrelationProgress {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_describe_themselves() {
        assert_eq!(CorrelationStage::Products.to_string(), "pairwise correlation products");
        assert_eq!(CorrelationStage::Standardize.describe(), "column standardization");
    }
}
