//! Constrained quadratic model over binary variables.
//!
//! The objective is `offset + sum_i a_i x_i + sum_{i<j} b_ij x_i x_j` with
//! `x_i` in {0, 1}. Quadratic biases are stored once per unordered pair in a
//! packed upper-triangular buffer; adding a bias for `(i, j)` and again for
//! `(j, i)` accumulates both into the same slot.

use crate::error::SelectionError;
use crate::sampleset::Sample;
use crate::types::Variable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute tolerance when checking constraint satisfaction.
pub const FEASIBILITY_TOLERANCE: f64 = 1.0e-6;

#[derive(Clone, Debug, PartialEq)]
pub struct QuadraticObjective {
    linear: Vec<f64>,
    quadratic: Vec<f64>,
    offset: f64,
}

impl QuadraticObjective {
    pub fn zeros(num_variables: usize) -> Self {
        Self {
            linear: vec![0.0; num_variables],
            quadratic: vec![0.0; num_variables * num_variables.saturating_sub(1) / 2],
            offset: 0.0,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.linear.len()
    }

    /// Position of the unordered pair `{u, v}` (`u != v`) in the packed buffer.
    fn pair_index(&self, u: usize, v: usize) -> usize {
        let (i, j) = if u < v { (u, v) } else { (v, u) };
        let n = self.num_variables();
        debug_assert!(j < n && i != j);
        i * (2 * n - i - 1) / 2 + (j - i - 1)
    }

    pub fn linear(&self, v: Variable) -> f64 {
        self.linear[v.index()]
    }

    pub fn linear_biases(&self) -> &[f64] {
        &self.linear
    }

    pub fn add_linear(&mut self, v: Variable, bias: f64) {
        self.linear[v.index()] += bias;
    }

    /// Bias on the product `x_u x_v`. A self-product on a binary variable is
    /// the variable itself, so `(v, v)` folds into the linear bias.
    pub fn add_quadratic(&mut self, u: Variable, v: Variable, bias: f64) {
        if u == v {
            self.add_linear(u, bias);
            return;
        }
        let idx = self.pair_index(u.index(), v.index());
        self.quadratic[idx] += bias;
    }

    pub fn quadratic(&self, u: Variable, v: Variable) -> f64 {
        if u == v {
            return 0.0;
        }
        self.quadratic[self.pair_index(u.index(), v.index())]
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn add_offset(&mut self, bias: f64) {
        self.offset += bias;
    }

    /// Every pair `(u, v, bias)` with `u < v`, including zero biases.
    pub fn iter_quadratic(&self) -> impl Iterator<Item = (Variable, Variable, f64)> + '_ {
        let n = self.num_variables();
        (0..n).flat_map(move |i| {
            ((i + 1)..n).map(move |j| {
                (
                    Variable(i),
                    Variable(j),
                    self.quadratic[self.pair_index(i, j)],
                )
            })
        })
    }

    pub fn energy(&self, values: &[u8]) -> f64 {
        debug_assert_eq!(values.len(), self.num_variables());
        let n = self.num_variables();
        let mut energy = self.offset;
        let mut idx = 0;
        for i in 0..n {
            let row_len = n - i - 1;
            if values[i] != 0 {
                energy += self.linear[i];
                let row = &self.quadratic[idx..idx + row_len];
                for (bias, &value) in row.iter().zip(&values[i + 1..]) {
                    if value != 0 {
                        energy += bias;
                    }
                }
            }
            idx += row_len;
        }
        energy
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// `lhs == rhs`
    Eq,
    /// `lhs <= rhs`
    Le,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "==",
            Self::Le => "<=",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinearConstraint {
    pub label: String,
    pub terms: Vec<(Variable, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn lhs(&self, values: &[u8]) -> f64 {
        self.terms
            .iter()
            .map(|&(v, coeff)| coeff * f64::from(values[v.index()]))
            .sum()
    }

    /// Amount by which `values` breaks the constraint; `0.0` when satisfied exactly.
    pub fn violation(&self, values: &[u8]) -> f64 {
        let diff = self.lhs(values) - self.rhs;
        match self.sense {
            Sense::Eq => diff.abs(),
            Sense::Le => diff.max(0.0),
        }
    }

    pub fn is_satisfied(&self, values: &[u8], atol: f64) -> bool {
        self.violation(values) <= atol
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} terms {} {}",
            self.label,
            self.terms.len(),
            self.sense,
            self.rhs
        )
    }
}

/// Binary variables in a fixed order, a quadratic objective to minimise, and
/// linear constraints over the same variables.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstrainedQuadraticModel {
    variables: Vec<Variable>,
    objective: QuadraticObjective,
    constraints: Vec<LinearConstraint>,
}

impl ConstrainedQuadraticModel {
    /// `num_variables` binary variables labelled `0..num_variables`.
    pub fn with_binary_variables(num_variables: usize) -> Self {
        Self {
            variables: (0..num_variables).map(Variable).collect(),
            objective: QuadraticObjective::zeros(num_variables),
            constraints: Vec::new(),
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn objective(&self) -> &QuadraticObjective {
        &self.objective
    }

    pub fn objective_mut(&mut self) -> &mut QuadraticObjective {
        &mut self.objective
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) -> Result<(), SelectionError> {
        let n = self.num_variables();
        if let Some((v, _)) = constraint.terms.iter().find(|(v, _)| v.index() >= n) {
            return Err(SelectionError::invalid(format!(
                "constraint '{}' references variable {v}, but the model has {n} variables",
                constraint.label
            )));
        }
        self.constraints.push(constraint);
        Ok(())
    }

    /// Energy and feasibility of one assignment, in variable order.
    pub fn evaluate(&self, values: Vec<u8>) -> Sample {
        debug_assert_eq!(values.len(), self.num_variables());
        let energy = self.objective.energy(&values);
        let is_satisfied: Vec<bool> = self
            .constraints
            .iter()
            .map(|c| c.is_satisfied(&values, FEASIBILITY_TOLERANCE))
            .collect();
        let is_feasible = is_satisfied.iter().all(|&ok| ok);
        Sample {
            values,
            energy,
            is_feasible,
            is_satisfied,
        }
    }
}
