//! Per-sample nonlinear solver.
//!
//! The capacitor is discretized with backward Euler, which turns the node
//! equation into an implicit nonlinear equation in the output voltage. It is
//! solved each sample by a bounded Newton-Raphson loop warm-started from the
//! previous sample's voltage.

mod clipper;
mod newton;

pub use clipper::{ChannelState, DiodeClipper, SolverConfig, SolverStats};
pub use newton::{limit_voltage_step, NewtonRaphson, Solution};

/// Convergence tolerance for Newton-Raphson iteration (volts).
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Maximum Newton-Raphson iterations per sample.
pub const DEFAULT_MAX_ITERATIONS: usize = 8;

/// Largest voltage change a single Newton update may apply (volts).
pub const DEFAULT_MAX_STEP: f64 = 0.25;
