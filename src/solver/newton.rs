//! Newton-Raphson iteration for the clipper node equation.

use crate::components::Diode;
use super::{DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_STEP, DEFAULT_TOLERANCE};

/// Outcome of one per-sample solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    /// Node voltage after the last update
    pub voltage: f64,
    /// Newton updates performed (1..=max_iterations)
    pub iterations: usize,
    /// Whether the last update fell below the tolerance
    pub converged: bool,
}

/// Newton-Raphson solver for the diode-loaded RC node.
///
/// Each sample solves the backward-Euler KCL equation
///
/// ```text
/// f(v) = (vin - v)/R - C*(v - prev)/dt - Id(v) = 0
/// ```
///
/// starting from the previous sample's voltage.
#[derive(Debug, Clone, Copy)]
pub struct NewtonRaphson {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Convergence tolerance (volts)
    pub tolerance: f64,
    /// Largest voltage change applied by one update (volts)
    pub max_step: f64,
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        Self::new()
    }
}

impl NewtonRaphson {
    /// Create a new Newton-Raphson solver.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, DEFAULT_MAX_STEP)
    }

    /// Create a solver with custom limits.
    pub fn with_config(max_iterations: usize, tolerance: f64, max_step: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
            max_step,
        }
    }

    /// Solve one sample.
    ///
    /// `g_r` is `1/R` and `g_c` is `C/dt`, both precomputed by the caller.
    /// Never fails: when the cap is reached the latest estimate is returned
    /// with `converged == false`.
    pub fn solve(&self, diode: &Diode, g_r: f64, g_c: f64, v_in: f64, v_prev: f64) -> Solution {
        let mut v = v_prev;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;

            let i_d = diode.pair_current(v);
            let g_d = diode.pair_conductance(v);

            let f = (v_in - v) * g_r - g_c * (v - v_prev) - i_d;
            // Strictly negative: -g_r < 0 and the other terms are <= 0
            let df = -g_r - g_c - g_d;

            let v_new = limit_voltage_step(v, v - f / df, self.max_step);
            let delta = v_new - v;
            v = v_new;

            if delta.abs() < self.tolerance {
                converged = true;
                break;
            }
        }

        Solution {
            voltage: v,
            iterations,
            converged,
        }
    }
}

/// Limit a Newton update to at most `max_step` volts.
///
/// Without it, a large input edge sends the first update far past the
/// diode knee, and the exponential then needs many more iterations than
/// the cap allows to walk back.
pub fn limit_voltage_step(v_old: f64, v_new: f64, max_step: f64) -> f64 {
    if (v_new - v_old).abs() > max_step {
        if v_new > v_old {
            v_old + max_step
        } else {
            v_old - max_step
        }
    } else {
        v_new
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::components::CircuitParams;

    /// Residual of the node equation at `v`, in amperes.
    fn residual(diode: &Diode, circuit: &CircuitParams, dt: f64, v_in: f64, v_prev: f64, v: f64) -> f64 {
        (v_in - v) / circuit.resistance - circuit.capacitance * (v - v_prev) / dt - diode.pair_current(v)
    }

    fn setup(sample_rate: f64) -> (Diode, CircuitParams, f64, f64, f64) {
        let circuit = CircuitParams::default();
        let diode = Diode::new(circuit.diode);
        let dt = 1.0 / sample_rate;
        (diode, circuit, dt, 1.0 / circuit.resistance, circuit.capacitance / dt)
    }

    #[test]
    fn test_zero_input_is_fixed_point() {
        let (diode, _, _, g_r, g_c) = setup(44100.0);
        let sol = NewtonRaphson::new().solve(&diode, g_r, g_c, 0.0, 0.0);
        assert_eq!(sol.voltage, 0.0);
        assert_eq!(sol.iterations, 1);
        assert!(sol.converged);
    }

    #[test]
    fn test_small_signal_converges_to_root() {
        let (diode, circuit, dt, g_r, g_c) = setup(44100.0);
        let sol = NewtonRaphson::new().solve(&diode, g_r, g_c, 0.1, 0.0);
        assert!(sol.converged);
        assert!(sol.iterations <= 3);

        // Nearly linear here: divider between 1/R and C/dt
        assert_abs_diff_eq!(sol.voltage, 0.1 * g_r / (g_r + g_c), epsilon = 1e-3);
        let r = residual(&diode, &circuit, dt, 0.1, 0.0, sol.voltage);
        assert!(r.abs() < 1e-9);
    }

    #[test]
    fn test_iteration_cap_is_hard_bound() {
        let (diode, _, _, g_r, g_c) = setup(8000.0);
        let solver = NewtonRaphson::with_config(2, 1e-12, DEFAULT_MAX_STEP);
        let sol = solver.solve(&diode, g_r, g_c, 10.0, 0.0);
        assert_eq!(sol.iterations, 2);
        assert!(!sol.converged);
        assert!(sol.voltage.is_finite());
    }

    #[test]
    fn test_large_edge_stays_near_knee() {
        let (diode, _, _, g_r, g_c) = setup(8000.0);
        let sol = NewtonRaphson::new().solve(&diode, g_r, g_c, 10.0, 0.0);
        assert!(sol.voltage > 0.0);
        assert!(sol.voltage < 1.0);
    }

    #[test]
    fn test_limit_voltage_step() {
        assert_eq!(limit_voltage_step(0.0, 0.1, 0.25), 0.1);
        assert_eq!(limit_voltage_step(0.0, 5.0, 0.25), 0.25);
        assert_eq!(limit_voltage_step(0.5, -5.0, 0.25), 0.25);
    }
}
