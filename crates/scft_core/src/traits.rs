use crate::error::Result;
use crate::field::Field;
use crate::interaction::ChiInteraction;
use crate::mixture::Mixture;
use crate::unit_cell::UnitCell;

/// Everything a propagator may read while solving, plus the mixture it
/// reports computed species properties into.
pub struct SolveContext<'a> {
    /// Closed species get `mu` filled in, open species get `phi`.
    pub mixture: &'a mut Mixture,
    pub interaction: &'a ChiInteraction,
    pub unit_cell: &'a UnitCell,
}

/// External modified-diffusion-equation solver.
///
/// Implementations must be idempotent: identical fields and unit cell give
/// identical concentrations.
pub trait Propagator {
    /// Computes concentration fields for the given chemical potential fields.
    /// w_fields: input, `[monomer][basis]`
    /// c_fields: output buffer with the same shape
    fn solve(
        &mut self,
        ctx: SolveContext<'_>,
        w_fields: &[Field],
        c_fields: &mut [Field],
    ) -> anyhow::Result<()>;

    /// Derivatives of the free energy with respect to each unit-cell
    /// parameter, for the most recent `solve`.
    fn compute_stress(
        &mut self,
        mixture: &Mixture,
        unit_cell: &UnitCell,
        stress: &mut [f64],
    ) -> anyhow::Result<()>;
}

/// The host system as seen by the Anderson mixing iterator.
pub trait ScfSystem {
    fn n_monomer(&self) -> usize;

    /// Number of basis functions per field.
    fn n_basis(&self) -> usize;

    fn interaction(&self) -> &ChiInteraction;

    /// True when every species ensemble is closed.
    fn is_canonical(&self) -> bool;

    fn w_fields(&self) -> &[Field];

    fn w_fields_mut(&mut self) -> &mut [Field];

    fn c_fields(&self) -> &[Field];

    /// Runs the propagator for the current w fields.
    fn compute(&mut self) -> Result<()>;

    /// Refreshes [`ScfSystem::stress`] for the current solution.
    fn compute_stress(&mut self) -> Result<()>;

    fn stress(&self) -> &[f64];

    fn unit_cell_parameters(&self) -> &[f64];

    fn set_unit_cell_parameters(&mut self, parameters: &[f64]) -> Result<()>;
}

/// The host system as seen by sweep parameters.
pub trait ParameterHost {
    fn mixture(&self) -> &Mixture;

    fn mixture_mut(&mut self) -> &mut Mixture;

    fn interaction(&self) -> &ChiInteraction;

    fn interaction_mut(&mut self) -> &mut ChiInteraction;
}
