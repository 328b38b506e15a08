//! Anderson mixing iterator.
//!
//! Each iteration archives the current w fields and their SCFT residual,
//! picks the affine combination of archived states whose residual has the
//! smallest norm, and steps from it along its residual. With a flexible unit
//! cell the lattice parameters and negated stress ride along as extra
//! components of the state and residual.

use super::dense::DenseSolver;
use super::{AmSettings, SolveReport, SolveStatus};
use crate::error::{Result, ScftError};
use crate::field::{self, Field, FieldSet};
use crate::history::History;
use crate::traits::ScfSystem;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, warn};

/// One archived trial state.
#[derive(Debug, Clone)]
struct HistoryEntry {
    fields: FieldSet,
    residual: FieldSet,
    cell: Vec<f64>,
    /// Negated stress, the residual of the cell parameters.
    stress: Vec<f64>,
}

impl HistoryEntry {
    fn zeros(n_monomer: usize, n_basis: usize, n_cell: usize) -> Self {
        Self {
            fields: field::allocate(n_monomer, n_basis),
            residual: field::allocate(n_monomer, n_basis),
            cell: vec![0.0; n_cell],
            stress: vec![0.0; n_cell],
        }
    }
}

/// Mixing weight for iteration `k`: ramps up while the history is short,
/// then mixes at full strength.
pub fn mixing_weight(k: usize, max_hist: usize) -> f64 {
    if k <= max_hist {
        1.0 - 0.9_f64.powi(k as i32)
    } else {
        1.0
    }
}

/// Largest residual magnitude, with stress residuals multiplied by
/// `stress_scale`.
pub fn residual_error(residual: &[Field], stress: &[f64], stress_scale: f64) -> f64 {
    let field_error = field::max_abs(residual);
    let stress_error = stress.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()));
    field_error.max(stress_scale * stress_error)
}

/// History of an iterator, or an empty-history error before the first
/// [`AmIterator::setup`].
fn allocated(history: &Option<History<HistoryEntry>>) -> Result<&History<HistoryEntry>> {
    history
        .as_ref()
        .ok_or(ScftError::IndexOutOfRange { index: 0, size: 0 })
}

pub struct AmIterator {
    settings: AmSettings,
    /// Allocated by [`AmIterator::setup`] once the system shape is known.
    history: Option<History<HistoryEntry>>,
    trial_fields: FieldSet,
    trial_residual: FieldSet,
    trial_cell: Vec<f64>,
    trial_stress: Vec<f64>,
    zeroth: Vec<f64>,
    shape: (usize, usize, usize),
    is_canonical: bool,
    itr: usize,
    lambda: f64,
    n_coefficients: usize,
}

impl AmIterator {
    pub fn new(settings: AmSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            history: None,
            trial_fields: FieldSet::new(),
            trial_residual: FieldSet::new(),
            trial_cell: Vec::new(),
            trial_stress: Vec::new(),
            zeroth: Vec::new(),
            shape: (0, 0, 0),
            is_canonical: true,
            itr: 0,
            lambda: 0.0,
            n_coefficients: 0,
        })
    }

    pub fn settings(&self) -> &AmSettings {
        &self.settings
    }

    pub fn is_flexible(&self) -> bool {
        self.settings.is_flexible
    }

    /// Iteration counter of the current or most recent solve.
    pub fn iteration(&self) -> usize {
        self.itr
    }

    /// Mixing weight used by the most recent trial step.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Canonical flag of the most recent solve.
    pub fn is_canonical(&self) -> bool {
        self.is_canonical
    }

    /// Mixing coefficients used by the most recent trial step, after any
    /// singular history entries were shed.
    pub fn n_coefficients(&self) -> usize {
        self.n_coefficients
    }

    pub fn n_history(&self) -> usize {
        self.history.as_ref().map_or(0, |history| history.len())
    }

    /// Most recently archived residual, `[monomer][basis]`.
    pub fn residual(&self) -> Result<&[Field]> {
        Ok(&allocated(&self.history)?.get(0)?.residual)
    }

    /// Most recently archived stress residual (empty for a rigid cell).
    pub fn stress_residual(&self) -> Result<&[f64]> {
        Ok(&allocated(&self.history)?.get(0)?.stress)
    }

    /// Allocates history and work arrays for the shape of `system`.
    pub fn setup<S: ScfSystem + ?Sized>(&mut self, system: &S) -> Result<()> {
        let n_monomer = system.n_monomer();
        let n_basis = system.n_basis();
        let n_cell = if self.settings.is_flexible {
            system.unit_cell_parameters().len()
        } else {
            0
        };
        self.history = Some(History::new(
            self.settings.max_hist + 1,
            HistoryEntry::zeros(n_monomer, n_basis, n_cell),
        )?);
        self.trial_fields = field::allocate(n_monomer, n_basis);
        self.trial_residual = field::allocate(n_monomer, n_basis);
        self.trial_cell = vec![0.0; n_cell];
        self.trial_stress = vec![0.0; n_cell];
        self.zeroth = vec![0.0; n_monomer];
        self.shape = (n_monomer, n_basis, n_cell);
        Ok(())
    }

    fn ensure_allocated<S: ScfSystem + ?Sized>(&mut self, system: &S) -> Result<()> {
        let n_cell = if self.settings.is_flexible {
            let n_cell = system.unit_cell_parameters().len();
            if system.stress().len() != n_cell {
                return Err(ScftError::ShapeMismatch {
                    what: "stress components",
                    expected: n_cell,
                    actual: system.stress().len(),
                });
            }
            n_cell
        } else {
            0
        };
        let shape = (system.n_monomer(), system.n_basis(), n_cell);
        if self.history.is_none() || self.shape != shape {
            self.setup(system)?;
        }
        field::check_shape(system.w_fields(), self.shape.0, self.shape.1)?;
        field::check_shape(system.c_fields(), self.shape.0, self.shape.1)
    }

    /// Iterates the system to self-consistency starting from its current
    /// w fields.
    ///
    /// Running out of iterations is reported as [`SolveStatus::Failed`];
    /// errors are reserved for collaborator failures and an unusable mixing
    /// history.
    pub fn solve<S: ScfSystem + ?Sized>(
        &mut self,
        system: &mut S,
        is_continuation: bool,
    ) -> Result<SolveReport> {
        self.ensure_allocated(system)?;
        self.is_canonical = system.is_canonical();
        if let Some(history) = self.history.as_mut() {
            history.clear();
        }
        self.itr = 0;
        self.lambda = 0.0;
        self.n_coefficients = 0;

        let max_hist = self.settings.max_hist;
        let mut u = DMatrix::zeros(max_hist, max_hist);
        let mut v = DVector::zeros(max_hist);
        let mut solver = DenseSolver::new(max_hist);

        debug!(
            is_continuation,
            is_canonical = self.is_canonical,
            is_flexible = self.settings.is_flexible,
            "starting Anderson mixing"
        );

        self.compute(system)?;

        let mut error = f64::INFINITY;
        for k in 1..=self.settings.max_itr {
            self.itr = k;
            self.update_history(system)?;

            let entry = allocated(&self.history)?.get(0)?;
            error = residual_error(&entry.residual, &entry.stress, self.settings.stress_scale);
            debug!(iteration = k, error, "Anderson mixing");

            if error < self.settings.epsilon {
                if !self.settings.is_flexible {
                    system.compute_stress()?;
                }
                info!(iterations = k, error, "SCFT iterator converged");
                return Ok(SolveReport {
                    status: SolveStatus::Converged,
                    iterations: k,
                    error,
                });
            }

            let n_hist = (k - 1).min(max_hist);
            let n_coeff = if n_hist > 0 {
                self.minimize(n_hist, &mut u, &mut v, &mut solver)?
            } else {
                0
            };
            self.lambda = mixing_weight(k, max_hist);
            self.n_coefficients = n_coeff;
            self.build_trial(system, solver.solution(n_coeff))?;
            self.compute(system)?;
        }

        info!(
            iterations = self.settings.max_itr,
            error, "SCFT iterator failed to converge"
        );
        Ok(SolveReport {
            status: SolveStatus::Failed,
            iterations: self.settings.max_itr,
            error,
        })
    }

    fn compute<S: ScfSystem + ?Sized>(&mut self, system: &mut S) -> Result<()> {
        system.compute()?;
        if self.settings.is_flexible {
            system.compute_stress()?;
        }
        Ok(())
    }

    /// Archives the current fields and writes their residual into the new
    /// history slot.
    fn update_history<S: ScfSystem + ?Sized>(&mut self, system: &S) -> Result<()> {
        let (n_monomer, n_basis, _) = self.shape;
        let start = if self.is_canonical { 1 } else { 0 };
        let interaction = system.interaction();
        let w = system.w_fields();
        let c = system.c_fields();

        let entry = self
            .history
            .as_mut()
            .ok_or(ScftError::IndexOutOfRange { index: 0, size: 0 })?
            .advance();
        field::assign(&mut entry.fields, w)?;

        for i in 0..n_monomer {
            let residual = &mut entry.residual[i];
            residual.iter_mut().for_each(|r| *r = 0.0);
            for j in 0..n_monomer {
                let chi = interaction.chi(i, j);
                let idempotent = interaction.idempotent(i, j);
                for n in start..n_basis {
                    residual[n] += chi * c[j][n] - idempotent * w[j][n];
                }
            }
        }

        // Open ensembles: the uniform component carries the incompressibility
        // offset.
        if !self.is_canonical && n_basis > 0 {
            let shift = 1.0 / interaction.sum_inverse();
            for residual in entry.residual.iter_mut() {
                residual[0] -= shift;
            }
        }

        if self.settings.is_flexible {
            entry.cell.copy_from_slice(system.unit_cell_parameters());
            for (r, s) in entry.stress.iter_mut().zip(system.stress()) {
                *r = -s;
            }
        }
        Ok(())
    }

    /// Fills `u` and `v` from the newest `n_hist + 1` residuals and solves
    /// for the mixing coefficients, shedding the oldest differences if the
    /// system is singular. Returns the number of coefficients.
    fn minimize(
        &self,
        n_hist: usize,
        u: &mut DMatrix<f64>,
        v: &mut DVector<f64>,
        solver: &mut DenseSolver,
    ) -> Result<usize> {
        let (n_monomer, n_basis, _) = self.shape;
        let start = if self.is_canonical { 1 } else { 0 };
        let history = allocated(&self.history)?;
        let newest = history.get(0)?;

        for p in 0..n_hist {
            let hp = history.get(p + 1)?;
            for q in p..n_hist {
                let hq = history.get(q + 1)?;
                let mut sum = 0.0;
                for i in 0..n_monomer {
                    let r0 = &newest.residual[i];
                    for n in start..n_basis {
                        sum += (r0[n] - hp.residual[i][n]) * (r0[n] - hq.residual[i][n]);
                    }
                }
                for (m, s0) in newest.stress.iter().enumerate() {
                    sum += (s0 - hp.stress[m]) * (s0 - hq.stress[m]);
                }
                u[(p, q)] = sum;
                u[(q, p)] = sum;
            }

            let mut sum = 0.0;
            for i in 0..n_monomer {
                let r0 = &newest.residual[i];
                for n in start..n_basis {
                    sum += (r0[n] - hp.residual[i][n]) * r0[n];
                }
            }
            for (m, s0) in newest.stress.iter().enumerate() {
                sum += (s0 - hp.stress[m]) * s0;
            }
            v[p] = sum;
        }

        let mut n = n_hist;
        loop {
            solver.load(u, v, n)?;
            match solver.solve(n) {
                Ok(_) => break,
                Err(ScftError::SingularHistoryMatrix { size }) if size > 1 => {
                    warn!(
                        iteration = self.itr,
                        size, "singular mixing history, dropping oldest entry"
                    );
                    n -= 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(n)
    }

    /// Forms the extrapolated state and residual from the history and
    /// writes the next trial fields (and cell) into the system.
    fn build_trial<S: ScfSystem + ?Sized>(
        &mut self,
        system: &mut S,
        coefficients: &[f64],
    ) -> Result<()> {
        let (n_monomer, n_basis, _) = self.shape;
        let history = allocated(&self.history)?;
        let newest = history.get(0)?;

        field::assign(&mut self.trial_fields, &newest.fields)?;
        field::assign(&mut self.trial_residual, &newest.residual)?;
        self.trial_cell.copy_from_slice(&newest.cell);
        self.trial_stress.copy_from_slice(&newest.stress);

        for (p, &coefficient) in coefficients.iter().enumerate() {
            let hp = history.get(p + 1)?;
            for i in 0..n_monomer {
                for n in 0..n_basis {
                    self.trial_fields[i][n] +=
                        coefficient * (hp.fields[i][n] - newest.fields[i][n]);
                    self.trial_residual[i][n] +=
                        coefficient * (hp.residual[i][n] - newest.residual[i][n]);
                }
            }
            for m in 0..self.trial_cell.len() {
                self.trial_cell[m] += coefficient * (hp.cell[m] - newest.cell[m]);
                self.trial_stress[m] += coefficient * (hp.stress[m] - newest.stress[m]);
            }
        }

        let lambda = self.lambda;
        for i in 0..n_monomer {
            for n in 0..n_basis {
                self.trial_fields[i][n] += lambda * self.trial_residual[i][n];
            }
        }

        // The uniform component is fixed by the conserved total density
        // rather than mixed.
        if self.is_canonical && n_basis > 0 {
            let interaction = system.interaction();
            let c = system.c_fields();
            for i in 0..n_monomer {
                self.zeroth[i] = (0..n_monomer)
                    .map(|j| interaction.chi(i, j) * c[j][0])
                    .sum();
            }
            for i in 0..n_monomer {
                self.trial_fields[i][0] = self.zeroth[i];
            }
        }

        field::assign(system.w_fields_mut(), &self.trial_fields)?;

        if self.settings.is_flexible {
            for m in 0..self.trial_cell.len() {
                self.trial_cell[m] += lambda * self.trial_stress[m];
            }
            system.set_unit_cell_parameters(&self.trial_cell)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::ChiInteraction;
    use crate::mixture::{Block, Ensemble, Mixture, Monomer, Polymer};
    use crate::system::System;
    use crate::testing::{diblock_chi, diblock_mixture, diblock_system, LinearResponse};
    use crate::traits::{Propagator, SolveContext};
    use crate::unit_cell::{LatticeSystem, UnitCell};
    use approx::assert_relative_eq;

    fn settings(max_itr: usize) -> AmSettings {
        AmSettings {
            max_itr,
            epsilon: 1e-8,
            max_hist: 10,
            is_flexible: false,
            stress_scale: 100.0,
        }
    }

    fn zeroth_from_concentration(system: &System<LinearResponse>, i: usize) -> f64 {
        let interaction = system.interaction();
        (0..2)
            .map(|j| interaction.chi(i, j) * system.c_fields()[j][0])
            .sum()
    }

    #[test]
    fn mixing_weight_ramps_then_saturates() {
        assert_relative_eq!(mixing_weight(1, 3), 0.1, epsilon = 1e-15);
        assert_relative_eq!(mixing_weight(2, 3), 0.19, epsilon = 1e-15);
        assert_relative_eq!(mixing_weight(3, 3), 0.271, epsilon = 1e-15);
        assert_eq!(mixing_weight(4, 3), 1.0);
    }

    #[test]
    fn residual_error_takes_the_largest_magnitude() {
        let mut residual = vec![vec![0.001, 0.02, 0.0005]];
        let epsilon = 0.01;
        assert!(!(residual_error(&residual, &[], 100.0) < epsilon));
        residual[0][1] = 0.005;
        assert!(residual_error(&residual, &[], 100.0) < epsilon);
    }

    #[test]
    fn residual_error_scales_stress() {
        let residual = vec![vec![0.001]];
        assert_relative_eq!(
            residual_error(&residual, &[-0.0002], 100.0),
            0.02,
            epsilon = 1e-15
        );
    }

    #[test]
    fn converges_linear_response_in_three_iterations() {
        let propagator = LinearResponse::new(vec![0.2, -0.1, 0.05]);
        let mut system = diblock_system(10.0, 4, propagator);
        let expected = system
            .propagator()
            .solution(system.interaction(), 4);
        let mut iterator = AmIterator::new(settings(50)).unwrap();

        let report = iterator.solve(&mut system, false).unwrap();

        assert!(report.is_converged(), "report: {report:?}");
        assert_eq!(report.iterations, 3);
        assert!(report.error < 1e-8);
        for i in 0..2 {
            for n in 1..4 {
                assert_relative_eq!(system.w_fields()[i][n], expected[i][n], epsilon = 1e-10);
            }
            assert_eq!(system.w_fields()[i][0], zeroth_from_concentration(&system, i));
        }
        // initial solve, two trial solves, and the final stress report
        assert_eq!(system.propagator().solves(), 3);
        assert_eq!(system.propagator().stress_calls(), 1);
    }

    #[test]
    fn first_iteration_is_a_plain_mixing_step() {
        let mut system = diblock_system(10.0, 3, LinearResponse::new(vec![0.2, -0.1]));
        let expected = system.propagator().solution(system.interaction(), 3);
        let mut iterator = AmIterator::new(settings(1)).unwrap();

        let report = iterator.solve(&mut system, false).unwrap();

        assert_eq!(report.status, SolveStatus::Failed);
        assert_eq!(report.iterations, 1);
        assert_relative_eq!(iterator.lambda(), 0.1, epsilon = 1e-15);
        for i in 0..2 {
            for n in 1..3 {
                assert_relative_eq!(
                    system.w_fields()[i][n],
                    0.1 * expected[i][n],
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn canonical_solve_excludes_and_pins_the_uniform_coefficient() {
        let mut system = diblock_system(10.0, 3, LinearResponse::new(vec![0.2, -0.1]));
        let mut iterator = AmIterator::new(settings(1)).unwrap();

        iterator.solve(&mut system, false).unwrap();

        assert!(iterator.is_canonical());
        let residual = iterator.residual().unwrap();
        for i in 0..2 {
            assert_eq!(residual[i][0], 0.0);
            assert!(residual[i][1].abs() > 0.0);
            assert_eq!(system.w_fields()[i][0], zeroth_from_concentration(&system, i));
        }
        assert_eq!(system.w_fields()[0][0], 5.0);
    }

    #[test]
    fn grand_canonical_solve_mixes_the_uniform_coefficient() {
        let mut system = System::new(
            diblock_mixture(Ensemble::Open),
            diblock_chi(10.0),
            UnitCell::new(LatticeSystem::Lamellar, vec![1.5]).unwrap(),
            3,
            LinearResponse::new(vec![0.2, -0.1]),
        )
        .unwrap();
        let expected = system.propagator().solution(system.interaction(), 3);

        let mut first_step = AmIterator::new(settings(1)).unwrap();
        first_step.solve(&mut system, false).unwrap();
        assert!(!first_step.is_canonical());
        // Residual of the zero initial guess is the target itself.
        let residual = first_step.residual().unwrap();
        assert_relative_eq!(residual[0][0], expected[0][0], epsilon = 1e-12);
        assert_relative_eq!(residual[1][0], expected[1][0], epsilon = 1e-12);

        let mut iterator = AmIterator::new(settings(50)).unwrap();
        let report = iterator.solve(&mut system, true).unwrap();
        assert!(report.is_converged(), "report: {report:?}");
        for i in 0..2 {
            for n in 0..3 {
                assert_relative_eq!(system.w_fields()[i][n], expected[i][n], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn flexible_cell_relaxes_with_the_fields() {
        let propagator = LinearResponse::new(vec![0.2]).with_cell_target(vec![1.6]);
        let mut system = diblock_system(12.0, 2, propagator);
        let mut flexible = settings(50);
        flexible.is_flexible = true;
        let mut iterator = AmIterator::new(flexible).unwrap();

        let report = iterator.solve(&mut system, false).unwrap();

        assert!(report.is_converged(), "report: {report:?}");
        assert_relative_eq!(system.unit_cell().parameters()[0], 1.6, epsilon = 1e-10);
        assert!(iterator.stress_residual().unwrap()[0].abs() < 1e-10);
        // stress follows every propagator solve, with no extra call at the end
        assert_eq!(
            system.propagator().stress_calls(),
            system.propagator().solves()
        );
    }

    #[test]
    fn flexible_first_step_moves_cell_along_negated_stress() {
        let propagator = LinearResponse::new(vec![0.2]).with_cell_target(vec![1.6]);
        let mut system = diblock_system(12.0, 2, propagator);
        let mut flexible = settings(1);
        flexible.is_flexible = true;
        let mut iterator = AmIterator::new(flexible).unwrap();

        let report = iterator.solve(&mut system, false).unwrap();

        assert_eq!(report.status, SolveStatus::Failed);
        // stress residual 0.1 scaled by 100 dominates the field residual
        assert_relative_eq!(report.error, 10.0, epsilon = 1e-10);
        assert_relative_eq!(system.unit_cell().parameters()[0], 1.51, epsilon = 1e-12);
    }

    /// Concentrations that ignore the fields, so the residual never moves.
    struct Frozen;

    impl Propagator for Frozen {
        fn solve(
            &mut self,
            _ctx: SolveContext<'_>,
            _w_fields: &[Field],
            c_fields: &mut [Field],
        ) -> anyhow::Result<()> {
            for c in c_fields.iter_mut() {
                c.iter_mut().for_each(|v| *v = 0.3);
            }
            Ok(())
        }

        fn compute_stress(
            &mut self,
            _mixture: &Mixture,
            _unit_cell: &UnitCell,
            stress: &mut [f64],
        ) -> anyhow::Result<()> {
            stress.iter_mut().for_each(|s| *s = 0.0);
            Ok(())
        }
    }

    /// Single closed homopolymer with `chi = [[2]]`, whose projector
    /// vanishes so the residual is `2 c` regardless of the fields.
    fn homopolymer_system<P: Propagator>(propagator: P) -> System<P> {
        let mixture = Mixture {
            monomers: vec![Monomer { kuhn: 1.0 }],
            polymers: vec![Polymer {
                blocks: vec![Block {
                    monomer_id: 0,
                    length: 1.0,
                    kuhn: 1.0,
                }],
                ensemble: Ensemble::Closed,
                phi: 1.0,
                mu: 0.0,
            }],
            solvents: Vec::new(),
        };
        System::new(
            mixture,
            ChiInteraction::from_rows(&[vec![2.0]]).unwrap(),
            UnitCell::new(LatticeSystem::Lamellar, vec![1.0]).unwrap(),
            3,
            propagator,
        )
        .unwrap()
    }

    #[test]
    fn stagnant_residual_reports_singular_history() {
        let mut system = homopolymer_system(Frozen);
        let mut iterator = AmIterator::new(settings(20)).unwrap();

        let err = iterator
            .solve(&mut system, false)
            .expect_err("residual differences vanish");
        assert!(matches!(err, ScftError::SingularHistoryMatrix { size: 1 }));
        assert_eq!(iterator.iteration(), 2);
    }

    /// Residual cycles through `cycle`, one entry per solve, whatever the
    /// fields.
    struct Cycling {
        cycle: Vec<[f64; 2]>,
        solves: usize,
    }

    impl Propagator for Cycling {
        fn solve(
            &mut self,
            ctx: SolveContext<'_>,
            _w_fields: &[Field],
            c_fields: &mut [Field],
        ) -> anyhow::Result<()> {
            let residual = self.cycle[self.solves % self.cycle.len()];
            self.solves += 1;
            let chi = ctx.interaction.chi(0, 0);
            c_fields[0][0] = 1.0;
            c_fields[0][1] = residual[0] / chi;
            c_fields[0][2] = residual[1] / chi;
            Ok(())
        }

        fn compute_stress(
            &mut self,
            _mixture: &Mixture,
            _unit_cell: &UnitCell,
            stress: &mut [f64],
        ) -> anyhow::Result<()> {
            stress.iter_mut().for_each(|s| *s = 0.0);
            Ok(())
        }
    }

    #[test]
    fn repeated_residual_sheds_the_oldest_history_entry() {
        // Residuals a, b, a: at the third iteration the oldest difference is
        // zero, so the 2x2 system is singular while its leading 1x1 block is
        // not.
        let propagator = Cycling {
            cycle: vec![[1.0, 0.0], [0.0, 1.0]],
            solves: 0,
        };
        let mut system = homopolymer_system(propagator);
        let mut iterator = AmIterator::new(settings(3)).unwrap();

        let report = iterator.solve(&mut system, false).unwrap();

        assert_eq!(report.status, SolveStatus::Failed);
        assert_eq!(report.iterations, 3);
        assert_eq!(iterator.n_history(), 3);
        assert_eq!(iterator.n_coefficients(), 1);

        // w2 = 0.1 a, w3 = 0.5 w2 + 0.19 (a + b) / 2, and the third step
        // mixes w3 and w2 with weight 0.5 before adding 0.271 (a + b) / 2.
        let w = &system.w_fields()[0];
        assert_relative_eq!(w[1], 0.258, epsilon = 1e-12);
        assert_relative_eq!(w[2], 0.183, epsilon = 1e-12);
        assert_eq!(w[0], 2.0);
    }

    #[test]
    fn history_is_allocated_on_first_solve() {
        let iterator = AmIterator::new(settings(5)).unwrap();
        assert_eq!(iterator.n_history(), 0);
        assert!(matches!(
            iterator.residual(),
            Err(ScftError::IndexOutOfRange { index: 0, size: 0 })
        ));
        assert!(iterator.stress_residual().is_err());

        let mut system = diblock_system(10.0, 3, LinearResponse::new(vec![0.2, -0.1]));
        let mut iterator = iterator;
        iterator.solve(&mut system, false).unwrap();
        assert_eq!(iterator.residual().unwrap().len(), 2);
    }

    #[test]
    fn history_is_bounded_by_max_hist_plus_one() {
        let mut system = diblock_system(10.0, 3, LinearResponse::new(vec![0.2, -0.1]));
        let mut iterator = AmIterator::new(AmSettings {
            max_hist: 1,
            ..settings(2)
        })
        .unwrap();
        iterator.solve(&mut system, false).unwrap();
        assert!(iterator.n_history() <= 2);
        assert!(iterator.residual().is_ok());
    }
}
