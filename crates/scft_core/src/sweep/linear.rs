//! Linear sweep: continuation along a straight line in parameter space.
//!
//! Every sweep parameter moves as `initial + s * change` while the path
//! coordinate `s` runs from 0 to 1. Each new point starts from a guess
//! extrapolated through the most recent accepted solutions; a failed solve
//! restores the last accepted state and halves the step.

use super::output::{AcceptedPoint, SweepObserver};
use super::parameter::SweepParameter;
use super::state::{self, AcceptedState};
use crate::error::{Result, ScftError};
use crate::field::{self, FieldSet};
use crate::history::History;
use crate::iterator::AmIterator;
use crate::system::System;
use crate::traits::{Propagator, ScfSystem};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Accepted states needed for linear extrapolation.
pub const DEFAULT_HISTORY_CAPACITY: usize = 2;

/// The sweep is done once an accepted point lies this close to `s = 1`.
const END_TOLERANCE: f64 = 1e-7;

/// Smallest allowed step as a fraction of the initial step.
const MIN_STEP_FRACTION: f64 = 0.1;

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepSettings {
    /// Number of path subdivisions; the initial step is `1 / ns`.
    pub ns: usize,
    /// Prefix for output files.
    #[serde(default)]
    pub base_file_name: String,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Initial step, overriding `1 / ns`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    pub parameters: Vec<SweepParameter>,
}

impl SweepSettings {
    pub fn new(ns: usize, parameters: Vec<SweepParameter>) -> Self {
        Self {
            ns,
            base_file_name: String::new(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            step: None,
            parameters,
        }
    }

    pub fn initial_step(&self) -> f64 {
        self.step.unwrap_or(1.0 / self.ns as f64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ns == 0 {
            return Err(ScftError::InvalidSettings(
                "ns must be greater than zero".into(),
            ));
        }
        if let Some(step) = self.step {
            if !(step > 0.0 && step <= 1.0) {
                return Err(ScftError::InvalidSettings(format!(
                    "sweep step must lie in (0, 1], got {step}"
                )));
            }
        }
        if self.history_capacity != DEFAULT_HISTORY_CAPACITY {
            return Err(ScftError::InvalidHistorySize {
                size: self.history_capacity,
                reason: "accepted-state history must hold exactly two states",
            });
        }
        if self.parameters.is_empty() {
            return Err(ScftError::InvalidSettings(
                "sweep has no parameters".into(),
            ));
        }
        Ok(())
    }
}

/// Where a sweep is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepStatus {
    Setup,
    Solving,
    Accepted,
    Failed,
    Finished,
}

/// Summary of one accepted point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepPoint {
    pub index: usize,
    pub s: f64,
    pub f_helmholtz: f64,
    pub pressure: f64,
    /// Sweep parameter values, in the order of [`SweepBranch::parameters`].
    pub parameters: Vec<f64>,
}

/// Accepted points of a completed sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SweepBranch {
    pub parameters: Vec<SweepParameter>,
    pub points: Vec<SweepPoint>,
}

pub struct LinearSweep {
    settings: SweepSettings,
    states: History<AcceptedState>,
    guess: FieldSet,
    guess_cell: Vec<f64>,
    values: Vec<f64>,
    branch: SweepBranch,
    status: SweepStatus,
    n_accept: usize,
}

impl LinearSweep {
    pub fn new(settings: SweepSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            states: History::new(settings.history_capacity, AcceptedState::zeros(0, 0, 0))?,
            settings,
            guess: FieldSet::new(),
            guess_cell: Vec::new(),
            values: Vec::new(),
            branch: SweepBranch::default(),
            status: SweepStatus::Setup,
            n_accept: 0,
        })
    }

    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    pub fn parameters(&self) -> &[SweepParameter] {
        &self.settings.parameters
    }

    pub fn status(&self) -> SweepStatus {
        self.status
    }

    /// Number of points accepted so far.
    pub fn n_accept(&self) -> usize {
        self.n_accept
    }

    pub fn branch(&self) -> &SweepBranch {
        &self.branch
    }

    /// Accepted state of the given age; age 0 is the most recent.
    pub fn accepted(&self, age: usize) -> Result<&AcceptedState> {
        self.states.get(age)
    }

    /// Runs the sweep from the fields currently loaded in `system`.
    ///
    /// The starting point must converge. Later points recover from failed
    /// solves by halving the step until it drops below a tenth of the
    /// initial step.
    pub fn sweep<P: Propagator>(
        &mut self,
        system: &mut System<P>,
        iterator: &mut AmIterator,
        observer: &mut dyn SweepObserver,
    ) -> Result<SweepBranch> {
        let result = self.run(system, iterator, observer);
        if result.is_err() {
            self.status = SweepStatus::Failed;
        }
        result
    }

    fn run<P: Propagator>(
        &mut self,
        system: &mut System<P>,
        iterator: &mut AmIterator,
        observer: &mut dyn SweepObserver,
    ) -> Result<SweepBranch> {
        self.status = SweepStatus::Setup;
        let flexible = iterator.is_flexible();
        self.setup(system, flexible)?;
        observer.setup()?;

        let ds0 = self.settings.initial_step();
        let min_ds = MIN_STEP_FRACTION * ds0;
        info!(
            ds0,
            n_parameter = self.settings.parameters.len(),
            "starting linear sweep"
        );

        self.status = SweepStatus::Solving;
        iterator.solve(system, false)?.into_result()?;
        self.accept(system, 0.0, observer)?;

        let mut ds = ds0;
        loop {
            let s0 = self.states.get(0)?.s;
            if s0 >= 1.0 - END_TOLERANCE {
                break;
            }
            // The step is clamped, not just the target, so a failure near the
            // end halves the distance actually attempted.
            let remaining = 1.0 - s0;
            let s_new = if ds >= remaining {
                ds = remaining;
                1.0
            } else {
                s0 + ds
            };

            for parameter in &self.settings.parameters {
                parameter.update(system, s_new)?;
            }
            state::extrapolate(&self.states, s_new, &mut self.guess, &mut self.guess_cell)?;
            system.set_w_fields(&self.guess)?;
            if flexible {
                system.set_unit_cell_parameters(&self.guess_cell)?;
            }

            self.status = SweepStatus::Solving;
            let report = iterator.solve(system, true)?;
            if report.is_converged() {
                self.accept(system, s_new, observer)?;
                continue;
            }

            self.status = SweepStatus::Failed;
            self.restore(system, flexible)?;
            ds *= 0.5;
            warn!(
                s = s_new,
                iterations = report.iterations,
                error = report.error,
                ds,
                "sweep step failed, halving step"
            );
            if ds < min_ds {
                return Err(ScftError::StepSizeUnderflow { s: s0, ds, min_ds });
            }
        }

        observer.cleanup()?;
        self.status = SweepStatus::Finished;
        info!(n_accept = self.n_accept, "linear sweep finished");
        Ok(self.branch.clone())
    }

    fn setup<P: Propagator>(&mut self, system: &System<P>, flexible: bool) -> Result<()> {
        let n_monomer = system.n_monomer();
        let n_basis = system.n_basis();
        let n_cell = if flexible {
            system.unit_cell().n_parameter()
        } else {
            0
        };
        self.states = History::new(
            self.settings.history_capacity,
            AcceptedState::zeros(n_monomer, n_basis, n_cell),
        )?;
        self.guess = field::allocate(n_monomer, n_basis);
        self.guess_cell = vec![0.0; n_cell];
        self.n_accept = 0;

        for parameter in &mut self.settings.parameters {
            parameter.get_initial(system)?;
        }
        self.branch = SweepBranch {
            parameters: self.settings.parameters.clone(),
            points: Vec::new(),
        };
        Ok(())
    }

    fn accept<P: Propagator>(
        &mut self,
        system: &System<P>,
        s: f64,
        observer: &mut dyn SweepObserver,
    ) -> Result<()> {
        self.status = SweepStatus::Accepted;
        let state = self.states.advance();
        state.s = s;
        field::assign(&mut state.w_fields, system.w_fields())?;
        for (saved, &parameter) in state.cell.iter_mut().zip(system.unit_cell().parameters()) {
            *saved = parameter;
        }

        let index = self.n_accept;
        self.n_accept += 1;
        self.values.clear();
        for parameter in &self.settings.parameters {
            self.values.push(parameter.get(system)?);
        }
        let thermo = system.compute_free_energy();

        observer.accept(&AcceptedPoint {
            index,
            s,
            thermo,
            parameters: &self.settings.parameters,
            values: &self.values,
            mixture: system.mixture(),
            interaction: system.interaction(),
            unit_cell: system.unit_cell(),
            w_fields: system.w_fields(),
            c_fields: system.c_fields(),
        })?;
        self.branch.points.push(SweepPoint {
            index,
            s,
            f_helmholtz: thermo.f_helmholtz,
            pressure: thermo.pressure,
            parameters: self.values.clone(),
        });
        info!(
            index,
            s,
            f_helmholtz = thermo.f_helmholtz,
            pressure = thermo.pressure,
            "accepted sweep point"
        );
        Ok(())
    }

    /// Reloads the most recent accepted fields (and cell) into the system.
    fn restore<P: Propagator>(&self, system: &mut System<P>, flexible: bool) -> Result<()> {
        let state = self.states.get(0)?;
        system.set_w_fields(&state.w_fields)?;
        if flexible {
            system.set_unit_cell_parameters(&state.cell)?;
        }
        Ok(())
    }
}
