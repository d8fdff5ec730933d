//! # Input Conversion and CSV Loading
//!
//! The core works on `ndarray` views. This module turns the looser shapes
//! callers have (nested rows, arrays of unchecked dimensionality, CSV files)
//! into those views, rejecting anything that is not a rectangular numeric
//! matrix plus a one-dimensional label vector.

use crate::error::SelectionError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewD, Ix1, Ix2};
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Interprets `x` as `(n_samples, n_features)`. A one-dimensional input is a
/// single sample; anything above two dimensions is rejected.
pub fn as_feature_matrix(x: ArrayViewD<'_, f64>) -> Result<ArrayView2<'_, f64>, SelectionError> {
    match x.ndim() {
        0 | 1 => {
            let len = x.len();
            x.into_shape_with_order((1, len))
                .map_err(|e| SelectionError::invalid(format!("cannot view X as a row: {e}")))
        }
        2 => x
            .into_dimensionality::<Ix2>()
            .map_err(|e| SelectionError::invalid(format!("X: {e}"))),
        ndim => Err(SelectionError::invalid(format!(
            "X must be a 2-dimensional array-like, given {ndim} dimensions"
        ))),
    }
}

pub fn as_label_vector(y: ArrayViewD<'_, f64>) -> Result<ArrayView1<'_, f64>, SelectionError> {
    let ndim = y.ndim();
    if ndim != 1 {
        return Err(SelectionError::invalid(format!(
            "y must be a 1-dimensional array-like, given {ndim} dimensions"
        )));
    }
    y.into_dimensionality::<Ix1>()
        .map_err(|e| SelectionError::invalid(format!("y: {e}")))
}

/// Builds a feature matrix from rows, which must all have the same length.
pub fn matrix_from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Array2<f64>, SelectionError> {
    let n_features = rows.first().map_or(0, |row| row.as_ref().len());
    let mut values = Vec::with_capacity(rows.len() * n_features);
    for (idx, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != n_features {
            return Err(SelectionError::invalid(format!(
                "X is ragged: row {idx} has {} values, row 0 has {n_features}",
                row.len()
            )));
        }
        values.extend_from_slice(row);
    }
    Array2::from_shape_vec((rows.len(), n_features), values)
        .map_err(|e| SelectionError::invalid(format!("X: {e}")))
}

/// A tabular dataset split into named feature columns and a label.
#[derive(Debug)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub label_name: Option<String>,
    /// Shape: `[n_samples, n_features]`.
    pub x: Array2<f64>,
    pub y: Option<Array1<f64>>,
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error reading CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("The label column '{0}' was not found in the header. Please check spelling and case.")]
    ColumnNotFound(String),
    #[error("Row {row}, column '{column}' holds '{value}', which is not a number.")]
    NonNumeric {
        row: usize,
        column: String,
        value: String,
    },
    #[error("Row {row}, column '{column}' is not finite (NaN or Infinity). All values must be finite.")]
    NonFinite { row: usize, column: String },
    #[error("The input file contains no data rows.")]
    Empty,
    #[error("Loaded values do not form a rectangular matrix: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Loads a headered CSV of numeric cells. When `label` is given, that column
/// becomes `y` and every other column is a feature.
pub fn load_dataset(path: &Path, label: Option<&str>) -> Result<Dataset, DataError> {
    let mut reader = csv::Reader::from_reader(File::open(path)?);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let label_idx = match label {
        Some(name) => Some(
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))?,
        ),
        None => None,
    };
    let feature_names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != label_idx)
        .map(|(_, name)| name.clone())
        .collect();

    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut n_rows = 0usize;
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        for (col_idx, cell) in record.iter().enumerate() {
            let value: f64 = cell.trim().parse().map_err(|_| DataError::NonNumeric {
                row: row_idx + 1,
                column: headers[col_idx].clone(),
                value: cell.to_string(),
            })?;
            if !value.is_finite() {
                return Err(DataError::NonFinite {
                    row: row_idx + 1,
                    column: headers[col_idx].clone(),
                });
            }
            if Some(col_idx) == label_idx {
                labels.push(value);
            } else {
                features.push(value);
            }
        }
        n_rows += 1;
    }
    if n_rows == 0 {
        return Err(DataError::Empty);
    }

    let x = Array2::from_shape_vec((n_rows, feature_names.len()), features)?;
    Ok(Dataset {
        feature_names,
        label_name: label_idx.map(|idx| headers[idx].clone()),
        x,
        y: label_idx.map(|_| Array1::from_vec(labels)),
    })
}

/// Writes the named columns of `x` (plus an optional trailing label) as CSV.
pub fn write_columns(
    path: &Path,
    names: &[String],
    x: ArrayView2<'_, f64>,
    label: Option<(&str, ArrayView1<'_, f64>)>,
) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header: Vec<&str> = names.iter().map(String::as_str).collect();
    if let Some((name, _)) = label {
        header.push(name);
    }
    writer.write_record(&header)?;

    for (row_idx, row) in x.rows().into_iter().enumerate() {
        let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        if let Some((_, y)) = label {
            record.push(y[row_idx].to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, array};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn one_dimensional_x_is_a_single_row() {
        let x = array![1.0, 2.0, 3.0].into_dyn();
        let view = as_feature_matrix(x.view()).unwrap();
        assert_eq!(view.dim(), (1, 3));
    }

    #[test]
    fn higher_rank_inputs_are_rejected() {
        let x = Array3::<f64>::zeros((2, 2, 2)).into_dyn();
        assert!(matches!(
            as_feature_matrix(x.view()),
            Err(SelectionError::InvalidInput(_))
        ));
        let y = Array2::<f64>::zeros((3, 1)).into_dyn();
        assert!(matches!(
            as_label_vector(y.view()),
            Err(SelectionError::InvalidInput(_))
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            matrix_from_rows(&rows),
            Err(SelectionError::InvalidInput(_))
        ));
        let ok = matrix_from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(ok, array![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn csv_label_column_is_split_out() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a,target,b").unwrap();
        writeln!(file, "1.0,0,2.0").unwrap();
        writeln!(file, "3.0,1,4.5").unwrap();
        file.flush().unwrap();

        let data = load_dataset(file.path(), Some("target")).unwrap();
        assert_eq!(data.feature_names, vec!["a", "b"]);
        assert_eq!(data.label_name.as_deref(), Some("target"));
        assert_eq!(data.x, array![[1.0, 2.0], [3.0, 4.5]]);
        assert_eq!(data.y.unwrap(), array![0.0, 1.0]);
    }

    #[test]
    fn csv_errors_are_specific() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a,y").unwrap();
        writeln!(file, "oops,1").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            load_dataset(file.path(), Some("y")),
            Err(DataError::NonNumeric { row: 1, .. })
        ));
        assert!(matches!(
            load_dataset(file.path(), Some("label")),
            Err(DataError::ColumnNotFound(_))
        ));

        let mut empty = NamedTempFile::new().unwrap();
        writeln!(empty, "a,y").unwrap();
        empty.flush().unwrap();
        assert!(matches!(
            load_dataset(empty.path(), Some("y")),
            Err(DataError::Empty)
        ));
    }

    #[test]
    fn written_columns_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let x = array![[1.5, 2.0], [3.0, 4.0]];
        let y = array![0.0, 1.0];
        let names = vec!["f0".to_string(), "f2".to_string()];
        write_columns(&path, &names, x.view(), Some(("y", y.view()))).unwrap();

        let data = load_dataset(&path, Some("y")).unwrap();
        assert_eq!(data.feature_names, names);
        assert_eq!(data.x, x);
        assert_eq!(data.y.unwrap(), y);
    }
}
