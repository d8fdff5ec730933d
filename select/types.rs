use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// A binary decision variable, identified by the feature column it stands for.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variable(pub usize);

impl Variable {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for Variable {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// Boolean mask over feature columns, in column order. `true` keeps the column.
#[repr(transparent)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionMask(pub Vec<bool>);

impl SelectionMask {
    pub fn new(values: Vec<bool>) -> Self {
        Self(values)
    }

    pub fn all(len: usize) -> Self {
        Self(vec![true; len])
    }

    pub fn num_selected(&self) -> usize {
        self.0.iter().filter(|&&keep| keep).count()
    }

    /// Column indices of the retained features, ascending.
    pub fn indices(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(idx, &keep)| keep.then_some(idx))
            .collect()
    }

    pub fn to_array(&self) -> Array1<bool> {
        Array1::from_vec(self.0.clone())
    }

    pub fn into_inner(self) -> Vec<bool> {
        self.0
    }
}

impl Deref for SelectionMask {
    type Target = [bool];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<bool>> for SelectionMask {
    fn from(values: Vec<bool>) -> Self {
        Self(values)
    }
}
