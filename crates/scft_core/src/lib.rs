pub mod config;
pub mod error;
pub mod field;
pub mod history;
pub mod interaction;
pub mod iterator;
pub mod mixture;
/// The `scft_core` crate solves the self-consistent field equations of polymer
/// field theory and follows converged solutions through parameter space.
///
/// Key components:
/// - **Iterator**: Anderson mixing (`AmIterator`) over the w fields, optionally relaxing the
///   unit cell.
/// - **Sweep**: linear continuation (`LinearSweep`) with extrapolated initial guesses and step
///   halving.
/// - **System**: the host model (`System`) of mixture, chi interaction and unit cell around an
///   injected `Propagator` that solves the modified diffusion equations.
pub mod system;
pub mod sweep;
pub mod traits;
pub mod unit_cell;

#[cfg(test)]
mod testing;

pub use error::{Result, ScftError};
pub use iterator::{AmIterator, AmSettings, SolveReport, SolveStatus};
pub use sweep::{LinearSweep, SweepParameter, SweepSettings};
pub use system::{System, Thermo};
