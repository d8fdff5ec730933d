#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

//! Feature selection formulated as a constrained binary quadratic model.
//!
//! A feature matrix and a label vector are turned into a minimisation problem
//! over one binary variable per feature: relevance to the label is rewarded on
//! the diagonal, redundancy between features is penalised off the diagonal, and
//! a cardinality constraint fixes how many features are kept. The model is
//! handed to a [`solver::CqmSolver`] and the best feasible sample becomes the
//! selection mask.

pub mod artifact;
pub mod config;
pub mod constraint;
pub mod correlation;
pub mod data;
pub mod error;
pub mod model;
pub mod objective;
pub mod progress;
pub mod sampleset;
pub mod selector;
pub mod solution;
pub mod solver;
pub mod storage;
pub mod types;

pub use config::{SelectionMethod, SelectorConfig};
pub use error::SelectionError;
pub use model::{ConstrainedQuadraticModel, LinearConstraint, Sense};
pub use sampleset::{Sample, SampleSet};
pub use selector::{FitOptions, QuadraticModelSelector, SelectionState};
pub use solver::{CqmSolver, ExactCqmSolver, SolverError};
pub use storage::StoragePolicy;
pub use types::{SelectionMask, Variable};
