//! Component models for the clipper stage.
//!
//! The stage is a series resistor feeding a node that is loaded to ground by
//! a capacitor and an antiparallel diode pair:
//!
//! ```text
//!   Vin ──[ R ]──┬──────┬──────┬── Vout
//!                │      │      │
//!               ═╪═ C  ─▶─ D1  ─◀─ D2
//!                │      │      │
//!   GND ─────────┴──────┴──────┘
//! ```

mod diode;

pub use diode::{Diode, DiodeParams, KNEE_FACTOR};

use crate::error::{ensure_positive, Result};

/// Physical values of the modeled hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitParams {
    /// Series resistance in ohms
    pub resistance: f64,
    /// Shunt capacitance in farads
    pub capacitance: f64,
    /// Model shared by both diodes of the pair
    pub diode: DiodeParams,
}

impl Default for CircuitParams {
    fn default() -> Self {
        Self {
            resistance: 2200.0,
            capacitance: 10e-9,
            diode: DiodeParams::default(),
        }
    }
}

impl CircuitParams {
    /// Create a new circuit description with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the series resistance (ohms).
    pub fn with_resistance(mut self, resistance: f64) -> Self {
        self.resistance = resistance;
        self
    }

    /// Set the shunt capacitance (farads).
    pub fn with_capacitance(mut self, capacitance: f64) -> Self {
        self.capacitance = capacitance;
        self
    }

    /// Swap the diode model.
    pub fn with_diode(mut self, diode: DiodeParams) -> Self {
        self.diode = diode;
        self
    }

    /// Check that every value is physically meaningful.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("resistance", self.resistance)?;
        ensure_positive("capacitance", self.capacitance)?;
        self.diode.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClipperError;

    #[test]
    fn test_default_circuit() {
        let c = CircuitParams::default();
        assert_eq!(c.resistance, 2200.0);
        assert_eq!(c.capacitance, 10e-9);
        assert_eq!(c.diode, DiodeParams::silicon());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_invalid_resistance() {
        let c = CircuitParams::new().with_resistance(-10.0);
        match c.validate() {
            Err(ClipperError::InvalidParameter { param, .. }) => assert_eq!(param, "resistance"),
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }
}
