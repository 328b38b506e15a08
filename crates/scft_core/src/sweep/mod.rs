//! Parameter sweeps: continuation of converged solutions along a path.

pub mod linear;
pub mod output;
pub mod parameter;
pub mod state;

pub use linear::{LinearSweep, SweepBranch, SweepPoint, SweepSettings, SweepStatus};
pub use output::{
    AcceptedPoint, BasisFieldWriter, FieldWriter, FileOutput, NullObserver, SweepObserver,
};
pub use parameter::{ParameterKind, ParameterType, SweepParameter};
pub use state::{lagrange_coefficients, AcceptedState};
