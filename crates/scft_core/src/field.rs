//! Per-monomer field storage.
//!
//! A field holds one real coefficient per basis function. A field set holds
//! one field per monomer type, indexed `[monomer][basis]`.

use crate::error::{Result, ScftError};

pub type Field = Vec<f64>;
pub type FieldSet = Vec<Field>;

/// Allocates a zeroed field set with `n_monomer` fields of length `n_basis`.
pub fn allocate(n_monomer: usize, n_basis: usize) -> FieldSet {
    vec![vec![0.0; n_basis]; n_monomer]
}

pub fn has_shape(fields: &[Field], n_monomer: usize, n_basis: usize) -> bool {
    fields.len() == n_monomer && fields.iter().all(|f| f.len() == n_basis)
}

pub fn check_shape(fields: &[Field], n_monomer: usize, n_basis: usize) -> Result<()> {
    if fields.len() != n_monomer {
        return Err(ScftError::ShapeMismatch {
            what: "monomer fields",
            expected: n_monomer,
            actual: fields.len(),
        });
    }
    for field in fields {
        if field.len() != n_basis {
            return Err(ScftError::ShapeMismatch {
                what: "basis coefficients",
                expected: n_basis,
                actual: field.len(),
            });
        }
    }
    Ok(())
}

/// Copies `rhs` into `lhs` without reallocating. Shapes must agree.
pub fn assign(lhs: &mut [Field], rhs: &[Field]) -> Result<()> {
    let n_basis = rhs.first().map_or(0, |f| f.len());
    check_shape(lhs, rhs.len(), n_basis)?;
    check_shape(rhs, rhs.len(), n_basis)?;
    for (dst, src) in lhs.iter_mut().zip(rhs) {
        dst.copy_from_slice(src);
    }
    Ok(())
}

/// Largest absolute value over every coefficient of every field.
pub fn max_abs(fields: &[Field]) -> f64 {
    fields
        .iter()
        .flat_map(|f| f.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
}
