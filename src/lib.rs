//! # Diode Clipper
//!
//! A real-time model of an analog diode clipper (soft saturation) stage.
//!
//! This library provides:
//! - A resistor-capacitor node loaded by an antiparallel diode pair
//! - Per-sample implicit solving with a bounded Newton-Raphson loop
//! - Independent state per audio channel, with block and interleaved helpers
//!
//! ## Architecture
//!
//! - [`components`] - Circuit values and the Shockley diode model
//! - [`solver`] - The per-sample Newton-Raphson kernel and [`DiodeClipper`]
//! - [`error`] - Unified error type
//! - `audio` - Raw PCM streaming for the CLI (feature `cli`)
//!
//! ## Usage
//!
//! ### Library
//!
//! ```
//! use diode_clipper::DiodeClipper;
//!
//! let mut clipper = DiodeClipper::default();
//! clipper.configure(44100.0, 2)?;
//!
//! let out = clipper.process_sample(1.0, 0)?;
//! assert!(out > 0.0 && out < 1.0);
//! # Ok::<(), diode_clipper::ClipperError>(())
//! ```
//!
//! ### Native CLI
//!
//! ```bash
//! ffmpeg -i input.wav -f f32le -ac 2 -ar 44100 - | diode-clipper -c 2 | ffmpeg -f f32le -ac 2 -ar 44100 -i - output.wav
//! ```
//!
//! ## Circuit Simulation Method
//!
//! For each time step dt = 1/sample_rate the capacitor current is
//! discretized with backward Euler, giving the node equation
//!
//! ```text
//! (vin - v)/R - C*(v - prev)/dt - (Id(v) - Id(-v)) = 0
//! ```
//!
//! which is solved by at most `max_iterations` Newton-Raphson updates,
//! starting from the previous sample's voltage.

pub mod components;
pub mod error;
pub mod solver;

#[cfg(feature = "cli")]
pub mod audio;

// Re-export main types for convenience
pub use components::{CircuitParams, DiodeParams};
pub use error::{ClipperError, Result};
pub use solver::{DiodeClipper, SolverConfig, SolverStats};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmDiodeClipper;

/// Sample rate assumed before the first `configure` call, in Hz
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Thermal voltage at room temperature (26mV)
pub const THERMAL_VOLTAGE: f64 = 0.026;
