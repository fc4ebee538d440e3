//! WASM bindings for the diode clipper.
//!
//! This module provides JavaScript-friendly bindings for use in web browsers
//! with Web Audio API's AudioWorklet.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmDiodeClipper } from 'diode_clipper';
//!
//! await init();
//!
//! const clipper = new WasmDiodeClipper(sampleRate, 2);
//!
//! // In AudioWorkletProcessor.process():
//! for (let ch = 0; ch < 2; ch++) {
//!   clipper.process_channel(ch, inputs[0][ch], outputs[0][ch]);
//! }
//! ```

use wasm_bindgen::prelude::*;

use crate::components::{CircuitParams, DiodeParams};
use crate::error::ClipperError;
use crate::solver::{DiodeClipper, SolverConfig};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(e: ClipperError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-compatible diode clipper.
///
/// Wraps the native [`DiodeClipper`] with a JavaScript-friendly API for
/// processing audio blocks in a Web Audio AudioWorklet.
#[wasm_bindgen]
pub struct WasmDiodeClipper {
    clipper: DiodeClipper,
}

#[wasm_bindgen]
impl WasmDiodeClipper {
    /// Create a configured clipper with the default 1N4148 circuit.
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz (typically 44100 or 48000)
    /// * `num_channels` - Number of independent channels
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f64, num_channels: usize) -> Result<WasmDiodeClipper, JsValue> {
        let mut clipper = DiodeClipper::default();
        clipper.configure(sample_rate, num_channels).map_err(to_js)?;
        Ok(WasmDiodeClipper { clipper })
    }

    /// Create a clipper with custom solver limits and diode model.
    ///
    /// # Arguments
    /// * `max_iterations` - Newton-Raphson iterations per sample (default: 8)
    /// * `tolerance` - Convergence tolerance in volts (default: 1e-6)
    /// * `germanium` - Use the germanium preset instead of silicon
    #[wasm_bindgen]
    pub fn with_config(
        sample_rate: f64,
        num_channels: usize,
        max_iterations: usize,
        tolerance: f64,
        germanium: bool,
    ) -> Result<WasmDiodeClipper, JsValue> {
        let diode = if germanium {
            DiodeParams::germanium()
        } else {
            DiodeParams::silicon()
        };
        let config = SolverConfig::new()
            .with_max_iterations(max_iterations)
            .with_tolerance(tolerance);

        let mut clipper =
            DiodeClipper::new(CircuitParams::new().with_diode(diode), config).map_err(to_js)?;
        clipper.configure(sample_rate, num_channels).map_err(to_js)?;

        Ok(WasmDiodeClipper { clipper })
    }

    /// Reconfigure sample rate and channel count. Clears state.
    #[wasm_bindgen]
    pub fn configure(&mut self, sample_rate: f64, num_channels: usize) -> Result<(), JsValue> {
        self.clipper.configure(sample_rate, num_channels).map_err(to_js)
    }

    /// Clear the capacitor voltage on every channel.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.clipper.reset();
    }

    /// Process one channel of a block.
    ///
    /// Designed to be called from an AudioWorkletProcessor's `process()`.
    #[wasm_bindgen]
    pub fn process_channel(&mut self, channel: usize, input: &[f32], output: &mut [f32]) -> Result<(), JsValue> {
        self.clipper
            .process_channel(channel, input, output)
            .map_err(to_js)
    }

    /// Process one channel, returning a new Float32Array.
    #[wasm_bindgen]
    pub fn process_channel_alloc(&mut self, channel: usize, input: &[f32]) -> Result<Vec<f32>, JsValue> {
        let mut output = vec![0.0; input.len()];
        self.process_channel(channel, input, &mut output)?;
        Ok(output)
    }

    /// Get the sample rate this clipper was configured with.
    #[wasm_bindgen(getter)]
    pub fn sample_rate(&self) -> f64 {
        self.clipper.sample_rate()
    }

    /// Get the number of configured channels.
    #[wasm_bindgen(getter)]
    pub fn num_channels(&self) -> usize {
        self.clipper.num_channels()
    }

    /// Samples that hit the iteration cap since the last reset.
    #[wasm_bindgen(getter)]
    pub fn unconverged(&self) -> f64 {
        self.clipper.stats().unconverged as f64
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
