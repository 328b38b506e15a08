//! Accepted sweep states and polynomial extrapolation between them.

use crate::error::{Result, ScftError};
use crate::field::{self, Field, FieldSet};
use crate::history::History;

/// A converged solution kept for extrapolating the next initial guess.
#[derive(Debug, Clone)]
pub struct AcceptedState {
    /// Path coordinate.
    pub s: f64,
    pub w_fields: FieldSet,
    /// Unit-cell parameters at convergence.
    pub cell: Vec<f64>,
}

impl AcceptedState {
    pub fn zeros(n_monomer: usize, n_basis: usize, n_cell: usize) -> Self {
        Self {
            s: 0.0,
            w_fields: field::allocate(n_monomer, n_basis),
            cell: vec![0.0; n_cell],
        }
    }
}

/// Lagrange basis coefficients over the path coordinates `s`, newest first,
/// evaluated at `s_new`.
///
/// With one point the guess repeats the last solution; with two it is the
/// straight line through both.
pub fn lagrange_coefficients(s_new: f64, s: &[f64]) -> Result<Vec<f64>> {
    if !(1..=2).contains(&s.len()) {
        return Err(ScftError::InvalidHistorySize {
            size: s.len(),
            reason: "extrapolation uses one or two accepted states",
        });
    }
    let coefficients = (0..s.len())
        .map(|i| {
            let mut numerator = 1.0;
            let mut denominator = 1.0;
            for j in (0..s.len()).filter(|&j| j != i) {
                numerator *= s_new - s[j];
                denominator *= s[i] - s[j];
            }
            numerator / denominator
        })
        .collect();
    Ok(coefficients)
}

/// Writes the extrapolated fields and cell at `s_new` from the newest (up
/// to two) accepted states.
pub fn extrapolate(
    states: &History<AcceptedState>,
    s_new: f64,
    w_fields: &mut [Field],
    cell: &mut [f64],
) -> Result<()> {
    let n = states.len().min(2);
    let s = states
        .iter()
        .take(n)
        .map(|state| state.s)
        .collect::<Vec<_>>();
    let coefficients = lagrange_coefficients(s_new, &s)?;

    w_fields
        .iter_mut()
        .for_each(|field| field.iter_mut().for_each(|v| *v = 0.0));
    cell.iter_mut().for_each(|v| *v = 0.0);

    for (state, &c) in states.iter().zip(&coefficients) {
        let n_basis = state.w_fields.first().map_or(0, |f| f.len());
        field::check_shape(w_fields, state.w_fields.len(), n_basis)?;
        for (out, saved) in w_fields.iter_mut().zip(&state.w_fields) {
            for (v, w) in out.iter_mut().zip(saved) {
                *v += c * w;
            }
        }
        for (v, p) in cell.iter_mut().zip(&state.cell) {
            *v += c * p;
        }
    }
    Ok(())
}
