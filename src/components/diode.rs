//! Diode model.
//!
//! Uses the Shockley diode equation:
//!   I = Is * (exp(V / (n * Vt)) - 1)
//!
//! The exponential is only evaluated inside a guarded band of ±10·n·Vt
//! around zero. Below the band the diode sits at its reverse saturation
//! current; above it the `- 1` term is dropped since it is negligible next
//! to the exponential.
//!
//! The clipper uses two diodes in antiparallel, so the net current through
//! the pair is `I(v) - I(-v)`.

use crate::error::{ensure_positive, Result};
use crate::THERMAL_VOLTAGE;

/// Width of the guarded exponential band in units of n·Vt.
pub const KNEE_FACTOR: f64 = 10.0;

/// Parameters for a diode model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiodeParams {
    /// Saturation current (Is) in amperes
    pub saturation_current: f64,
    /// Thermal voltage (Vt) in volts
    pub thermal_voltage: f64,
    /// Ideality factor (n), typically 1.0 to 2.0
    pub ideality: f64,
}

impl Default for DiodeParams {
    fn default() -> Self {
        Self::silicon()
    }
}

impl DiodeParams {
    /// 1N4148 small-signal silicon diode.
    pub fn silicon() -> Self {
        Self {
            saturation_current: 2.52e-9,
            thermal_voltage: THERMAL_VOLTAGE,
            ideality: 1.752,
        }
    }

    /// Germanium diode (1N34A class). Clips earlier and softer than silicon.
    pub fn germanium() -> Self {
        Self {
            saturation_current: 1e-6,
            thermal_voltage: THERMAL_VOLTAGE,
            ideality: 1.3,
        }
    }

    /// Thermal voltage times ideality factor.
    pub fn n_vt(&self) -> f64 {
        self.ideality * self.thermal_voltage
    }

    /// Check that every parameter is finite and positive.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("saturation_current", self.saturation_current)?;
        ensure_positive("thermal_voltage", self.thermal_voltage)?;
        ensure_positive("ideality", self.ideality)
    }
}

/// A diode with its derived constants precomputed.
#[derive(Debug, Clone, Copy)]
pub struct Diode {
    pub params: DiodeParams,
    n_vt: f64,
    /// Edge of the guarded exponential band (10·n·Vt)
    knee: f64,
    /// Is / (n·Vt)
    g_scale: f64,
}

impl Default for Diode {
    fn default() -> Self {
        Self::new(DiodeParams::default())
    }
}

impl Diode {
    /// Create a new diode.
    pub fn new(params: DiodeParams) -> Self {
        let n_vt = params.n_vt();
        Self {
            params,
            n_vt,
            knee: KNEE_FACTOR * n_vt,
            g_scale: params.saturation_current / n_vt,
        }
    }

    /// Edge of the guarded band in volts.
    pub fn knee(&self) -> f64 {
        self.knee
    }

    /// Calculate the diode current at a given voltage.
    pub fn current(&self, v: f64) -> f64 {
        let is = self.params.saturation_current;

        if v < -self.knee {
            // Deep reverse bias
            -is
        } else if v > self.knee {
            // Forward bias; the -1 is below the exponential's resolution
            is * (v / self.n_vt).exp()
        } else {
            is * ((v / self.n_vt).exp() - 1.0)
        }
    }

    /// Calculate the conductance (dI/dV) at a given voltage.
    ///
    /// Zero in the reverse saturation region, where the current is flat.
    /// Above the band it differentiates the forward branch of [`Self::current`].
    pub fn conductance(&self, v: f64) -> f64 {
        if v < -self.knee {
            0.0
        } else {
            self.g_scale * (v / self.n_vt).exp()
        }
    }

    /// Net current through an antiparallel pair: `I(v) - I(-v)`.
    pub fn pair_current(&self, v: f64) -> f64 {
        self.current(v) - self.current(-v)
    }

    /// Conductance of an antiparallel pair: `G(v) + G(-v)`.
    pub fn pair_conductance(&self, v: f64) -> f64 {
        self.conductance(v) + self.conductance(-v)
    }
}
