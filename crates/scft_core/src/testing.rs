//! Test doubles shared by the iterator and sweep tests.

use crate::error::Result;
use crate::field::{self, Field, FieldSet};
use crate::interaction::ChiInteraction;
use crate::mixture::{Block, Ensemble, Mixture, Monomer, Polymer};
use crate::sweep::output::{AcceptedPoint, SweepObserver};
use crate::system::System;
use crate::traits::{Propagator, SolveContext};
use crate::unit_cell::{LatticeSystem, UnitCell};

/// Propagator whose SCFT residual is exactly `target - w` for every
/// coefficient that enters the residual, and `cell_target - cell` for the
/// negated stress.
///
/// The target profile scales with `chi(0, n - 1)`, so it moves along a sweep
/// of the interaction strength.
pub struct LinearResponse {
    amplitude: Vec<f64>,
    cell_target: Vec<f64>,
    /// Above this `chi(0, n - 1)` every residual is shifted by one.
    stall_above: Option<f64>,
    solves: usize,
    stress_calls: usize,
    chi_log: Vec<f64>,
}

impl LinearResponse {
    pub fn new(amplitude: Vec<f64>) -> Self {
        Self {
            amplitude,
            cell_target: Vec::new(),
            stall_above: None,
            solves: 0,
            stress_calls: 0,
            chi_log: Vec::new(),
        }
    }

    pub fn with_cell_target(mut self, cell_target: Vec<f64>) -> Self {
        self.cell_target = cell_target;
        self
    }

    /// Shifts the residual by a constant once the interaction passes
    /// `limit`, so no single iteration can converge there.
    pub fn with_stall_above(mut self, limit: f64) -> Self {
        self.stall_above = Some(limit);
        self
    }

    pub fn solves(&self) -> usize {
        self.solves
    }

    pub fn stress_calls(&self) -> usize {
        self.stress_calls
    }

    /// Value of `chi(0, n - 1)` seen by each call to `solve`.
    pub fn chi_log(&self) -> &[f64] {
        &self.chi_log
    }

    pub fn target(&self, interaction: &ChiInteraction, monomer: usize, basis: usize) -> f64 {
        let scale = interaction.chi(0, interaction.n_monomer() - 1);
        let sign = if monomer % 2 == 0 { 1.0 } else { -1.0 };
        if basis == 0 {
            0.5 * scale
        } else {
            sign * scale * self.amplitude.get(basis - 1).copied().unwrap_or(0.0)
        }
    }

    /// Exact self-consistent w fields for the given interaction.
    pub fn solution(&self, interaction: &ChiInteraction, n_basis: usize) -> FieldSet {
        let n_monomer = interaction.n_monomer();
        let mut fields = field::allocate(n_monomer, n_basis);
        for (i, field) in fields.iter_mut().enumerate() {
            for (n, value) in field.iter_mut().enumerate() {
                *value = self.target(interaction, i, n);
            }
        }
        fields
    }
}

fn monomer_fractions(mixture: &Mixture) -> Vec<f64> {
    let mut fractions = vec![0.0; mixture.n_monomer()];
    for polymer in &mixture.polymers {
        let length = polymer.length();
        for block in &polymer.blocks {
            fractions[block.monomer_id] += polymer.phi * block.length / length;
        }
    }
    for solvent in &mixture.solvents {
        fractions[solvent.monomer_id] += solvent.phi;
    }
    fractions
}

impl Propagator for LinearResponse {
    fn solve(
        &mut self,
        ctx: SolveContext<'_>,
        w_fields: &[Field],
        c_fields: &mut [Field],
    ) -> anyhow::Result<()> {
        self.solves += 1;
        let chi = ctx.interaction;
        let n_monomer = chi.n_monomer();
        let scale = chi.chi(0, n_monomer - 1);
        self.chi_log.push(scale);
        let offset = match self.stall_above {
            Some(limit) if scale > limit => 1.0,
            _ => 0.0,
        };

        let canonical = ctx.mixture.is_canonical();
        for polymer in &mut ctx.mixture.polymers {
            match polymer.ensemble {
                Ensemble::Closed => polymer.mu = polymer.phi.ln(),
                Ensemble::Open => polymer.phi = polymer.mu.exp().min(1.0),
            }
        }

        let fractions = monomer_fractions(ctx.mixture);
        let n_basis = w_fields[0].len();
        let mut y = vec![0.0; n_monomer];
        for n in 0..n_basis {
            if n == 0 && canonical {
                for i in 0..n_monomer {
                    c_fields[i][0] = fractions[i];
                }
                continue;
            }
            for i in 0..n_monomer {
                let projected: f64 = (0..n_monomer)
                    .map(|j| chi.idempotent(i, j) * w_fields[j][n])
                    .sum();
                y[i] = projected + self.target(chi, i, n) - w_fields[i][n] + offset;
                if n == 0 {
                    y[i] += 1.0 / chi.sum_inverse();
                }
            }
            for i in 0..n_monomer {
                c_fields[i][n] = (0..n_monomer).map(|j| chi.chi_inverse(i, j) * y[j]).sum();
            }
        }
        Ok(())
    }

    fn compute_stress(
        &mut self,
        _mixture: &Mixture,
        unit_cell: &UnitCell,
        stress: &mut [f64],
    ) -> anyhow::Result<()> {
        self.stress_calls += 1;
        for (p, value) in stress.iter_mut().enumerate() {
            let target = self
                .cell_target
                .get(p)
                .copied()
                .unwrap_or(unit_cell.parameters()[p]);
            *value = unit_cell.parameters()[p] - target;
        }
        Ok(())
    }
}

/// Symmetric AB diblock melt, closed ensemble, lamellar cell of width 1.5.
pub fn diblock_mixture(ensemble: Ensemble) -> Mixture {
    Mixture {
        monomers: vec![Monomer { kuhn: 1.0 }, Monomer { kuhn: 1.0 }],
        polymers: vec![Polymer {
            blocks: vec![
                Block {
                    monomer_id: 0,
                    length: 0.5,
                    kuhn: 1.0,
                },
                Block {
                    monomer_id: 1,
                    length: 0.5,
                    kuhn: 1.0,
                },
            ],
            ensemble,
            phi: 1.0,
            mu: 0.0,
        }],
        solvents: Vec::new(),
    }
}

pub fn diblock_chi(chi: f64) -> ChiInteraction {
    ChiInteraction::from_rows(&[vec![0.0, chi], vec![chi, 0.0]]).expect("invertible chi")
}

pub fn diblock_system(
    chi: f64,
    n_basis: usize,
    propagator: LinearResponse,
) -> System<LinearResponse> {
    System::new(
        diblock_mixture(Ensemble::Closed),
        diblock_chi(chi),
        UnitCell::new(LatticeSystem::Lamellar, vec![1.5]).expect("valid cell"),
        n_basis,
        propagator,
    )
    .expect("valid system")
}

/// Observer that remembers what it was shown.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub setups: usize,
    pub cleanups: usize,
    /// `(index, s, values)` for every accepted point.
    pub points: Vec<(usize, f64, Vec<f64>)>,
}

impl SweepObserver for RecordingObserver {
    fn setup(&mut self) -> Result<()> {
        self.setups += 1;
        Ok(())
    }

    fn accept(&mut self, point: &AcceptedPoint<'_>) -> Result<()> {
        self.points.push((point.index, point.s, point.values.to_vec()));
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.cleanups += 1;
        Ok(())
    }
}
