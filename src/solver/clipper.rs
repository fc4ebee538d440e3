//! Main clipper interface.

use tracing::{debug, warn};

use crate::components::{CircuitParams, Diode};
use crate::error::{ensure_positive, ClipperError, Result};
use crate::DEFAULT_SAMPLE_RATE;

use super::{NewtonRaphson, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_STEP, DEFAULT_TOLERANCE};

/// Configuration for the per-sample solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Maximum Newton-Raphson iterations per sample.
    pub max_iterations: usize,
    /// Convergence tolerance for Newton-Raphson (volts).
    pub tolerance: f64,
    /// Largest voltage change per Newton update (volts).
    pub max_step: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            max_step: DEFAULT_MAX_STEP,
        }
    }
}

impl SolverConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum Newton-Raphson iterations.
    ///
    /// This is the hard per-sample CPU bound. The default of 8 is enough
    /// for signals up to a few volts.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance (in volts).
    ///
    /// Higher tolerance = earlier exit but less accuracy.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the Newton step limit (in volts).
    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.max_step = max_step;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ClipperError::invalid_parameter(
                "max_iterations",
                "must be at least 1",
            ));
        }
        ensure_positive("tolerance", self.tolerance)?;
        ensure_positive("max_step", self.max_step)?;
        // A clamped step must never pass the convergence test
        if self.tolerance >= self.max_step {
            return Err(ClipperError::invalid_parameter(
                "tolerance",
                format!(
                    "must be below max_step ({}), got {}",
                    self.max_step, self.tolerance
                ),
            ));
        }
        Ok(())
    }
}

/// Solver diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    /// Samples processed
    pub samples: u64,
    /// Newton updates performed
    pub iterations: u64,
    /// Samples that hit the iteration cap before converging
    pub unconverged: u64,
    /// Non-finite block samples replaced by the held voltage
    pub held: u64,
}

impl SolverStats {
    /// Average Newton updates per sample.
    pub fn mean_iterations(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.iterations as f64 / self.samples as f64
        }
    }

    fn merge(self, other: SolverStats) -> SolverStats {
        SolverStats {
            samples: self.samples + other.samples,
            iterations: self.iterations + other.iterations,
            unconverged: self.unconverged + other.unconverged,
            held: self.held + other.held,
        }
    }
}

/// Constants shared by every channel, derived from circuit and sample rate.
#[derive(Debug, Clone, Copy)]
struct Stage {
    diode: Diode,
    newton: NewtonRaphson,
    /// 1/R
    g_r: f64,
    /// C/dt
    g_c: f64,
}

impl Stage {
    fn new(circuit: &CircuitParams, config: &SolverConfig, sample_rate: f64) -> Self {
        Self {
            diode: Diode::new(circuit.diode),
            newton: NewtonRaphson::with_config(config.max_iterations, config.tolerance, config.max_step),
            g_r: 1.0 / circuit.resistance,
            g_c: circuit.capacitance * sample_rate,
        }
    }
}

/// Per-channel capacitor voltage and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelState {
    voltage: f64,
    stats: SolverStats,
}

impl ChannelState {
    /// Capacitor voltage after the last processed sample.
    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    /// Diagnostics accumulated since the last reset.
    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    fn tick(&mut self, stage: &Stage, channel: usize, v_in: f64) -> Result<f64> {
        if !v_in.is_finite() {
            return Err(ClipperError::NonFiniteInput {
                channel,
                value: v_in,
            });
        }

        let sol = stage
            .newton
            .solve(&stage.diode, stage.g_r, stage.g_c, v_in, self.voltage);

        self.voltage = sol.voltage;
        self.stats.samples += 1;
        self.stats.iterations += sol.iterations as u64;
        if !sol.converged {
            self.stats.unconverged += 1;
        }
        Ok(sol.voltage)
    }

    /// Block-path step: a non-finite input holds the current voltage.
    #[inline]
    fn tick_or_hold(&mut self, stage: &Stage, channel: usize, v_in: f32) -> f32 {
        match self.tick(stage, channel, v_in as f64) {
            Ok(v) => v as f32,
            Err(_) => {
                self.stats.held += 1;
                self.voltage as f32
            }
        }
    }

    fn run(&mut self, stage: &Stage, channel: usize, input: &[f32], output: &mut [f32]) {
        for (x, y) in input.iter().zip(output.iter_mut()) {
            *y = self.tick_or_hold(stage, channel, *x);
        }
    }

    fn run_in_place(&mut self, stage: &Stage, channel: usize, buffer: &mut [f32]) {
        for s in buffer.iter_mut() {
            *s = self.tick_or_hold(stage, channel, *s);
        }
    }
}

/// The diode clipper stage.
///
/// Owns one capacitor voltage per channel. The channel vector is only
/// resized by [`DiodeClipper::configure`]; the processing methods never
/// allocate, lock, or log.
#[derive(Debug, Clone)]
pub struct DiodeClipper {
    circuit: CircuitParams,
    config: SolverConfig,
    stage: Stage,
    sample_rate: f64,
    channels: Vec<ChannelState>,
}

impl Default for DiodeClipper {
    fn default() -> Self {
        let circuit = CircuitParams::default();
        let config = SolverConfig::default();
        let sample_rate = DEFAULT_SAMPLE_RATE;
        Self {
            stage: Stage::new(&circuit, &config, sample_rate),
            circuit,
            config,
            sample_rate,
            channels: Vec::new(),
        }
    }
}

impl DiodeClipper {
    /// Create an unconfigured clipper for the given circuit.
    ///
    /// Call [`DiodeClipper::configure`] before processing.
    pub fn new(circuit: CircuitParams, config: SolverConfig) -> Result<Self> {
        circuit.validate()?;
        config.validate()?;
        let sample_rate = DEFAULT_SAMPLE_RATE;
        Ok(Self {
            stage: Stage::new(&circuit, &config, sample_rate),
            circuit,
            config,
            sample_rate,
            channels: Vec::new(),
        })
    }

    /// Set the sample rate and channel count.
    ///
    /// Every call fully reinitializes the channel state to 0 V. On error the
    /// previous configuration and state are kept.
    pub fn configure(&mut self, sample_rate: f64, num_channels: usize) -> Result<()> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            warn!(sample_rate, "rejected sample rate");
            return Err(ClipperError::invalid_configuration(format!(
                "sample rate must be finite and positive, got {sample_rate}"
            )));
        }
        if num_channels == 0 {
            warn!("rejected zero channel count");
            return Err(ClipperError::invalid_configuration(
                "channel count must be at least 1",
            ));
        }

        self.sample_rate = sample_rate;
        self.stage = Stage::new(&self.circuit, &self.config, sample_rate);
        self.channels.clear();
        self.channels.resize(num_channels, ChannelState::default());

        debug!(sample_rate, num_channels, "configured diode clipper");
        Ok(())
    }

    /// Clear every channel's capacitor voltage and diagnostics.
    pub fn reset(&mut self) {
        self.channels.iter_mut().for_each(ChannelState::reset);
        debug!(num_channels = self.channels.len(), "reset diode clipper");
    }

    /// Swap the circuit model. Channel voltages are kept.
    pub fn set_circuit(&mut self, circuit: CircuitParams) -> Result<()> {
        circuit.validate()?;
        self.circuit = circuit;
        self.stage = Stage::new(&self.circuit, &self.config, self.sample_rate);
        Ok(())
    }

    /// Replace the solver limits. Channel voltages are kept.
    pub fn set_config(&mut self, config: SolverConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.stage = Stage::new(&self.circuit, &self.config, self.sample_rate);
        Ok(())
    }

    /// Solve one sample on one channel and return the output voltage.
    pub fn process_sample(&mut self, v_in: f64, channel: usize) -> Result<f64> {
        let num_channels = self.channels.len();
        let state = self
            .channels
            .get_mut(channel)
            .ok_or(ClipperError::IndexOutOfRange {
                channel,
                num_channels,
            })?;
        state.tick(&self.stage, channel, v_in)
    }

    /// Process a run of samples on one channel.
    pub fn process_channel(&mut self, channel: usize, input: &[f32], output: &mut [f32]) -> Result<()> {
        if input.len() != output.len() {
            return Err(ClipperError::buffer_mismatch(format!(
                "input has {} samples, output has {}",
                input.len(),
                output.len()
            )));
        }
        let num_channels = self.channels.len();
        let state = self
            .channels
            .get_mut(channel)
            .ok_or(ClipperError::IndexOutOfRange {
                channel,
                num_channels,
            })?;
        state.run(&self.stage, channel, input, output);
        Ok(())
    }

    /// Process one block of per-channel buffers.
    ///
    /// `inputs[ch]` is processed into `outputs[ch]`. All buffers must have
    /// the same length and there may be no more of them than configured
    /// channels.
    ///
    /// Block processing never aborts part-way. A NaN or infinite sample
    /// leaves its channel's voltage unchanged, writes that voltage to the
    /// output, and is counted in [`SolverStats::held`]. Only layout errors
    /// are returned, before any sample is touched.
    pub fn process_block(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) -> Result<()> {
        if inputs.len() != outputs.len() {
            return Err(ClipperError::buffer_mismatch(format!(
                "{} input channels, {} output channels",
                inputs.len(),
                outputs.len()
            )));
        }
        self.check_layout(inputs.iter().map(|b| b.len()).chain(outputs.iter().map(|b| b.len())), inputs.len())?;

        for (ch, (state, (input, output))) in self
            .channels
            .iter_mut()
            .zip(inputs.iter().zip(outputs.iter_mut()))
            .enumerate()
        {
            state.run(&self.stage, ch, input, output);
        }
        Ok(())
    }

    /// Process one block in place.
    pub fn process_block_in_place(&mut self, buffers: &mut [&mut [f32]]) -> Result<()> {
        self.check_layout(buffers.iter().map(|b| b.len()), buffers.len())?;

        for (ch, (state, buffer)) in self.channels.iter_mut().zip(buffers.iter_mut()).enumerate() {
            state.run_in_place(&self.stage, ch, buffer);
        }
        Ok(())
    }

    /// Process one block in place, one rayon task per channel.
    ///
    /// Channels share no state, so the result is identical to
    /// [`DiodeClipper::process_block_in_place`].
    #[cfg(feature = "parallel")]
    pub fn process_block_parallel(&mut self, buffers: &mut [&mut [f32]]) -> Result<()> {
        use rayon::prelude::*;

        self.check_layout(buffers.iter().map(|b| b.len()), buffers.len())?;

        let stage = self.stage;
        self.channels
            .par_iter_mut()
            .zip(buffers.par_iter_mut())
            .enumerate()
            .for_each(|(ch, (state, buffer))| state.run_in_place(&stage, ch, buffer));
        Ok(())
    }

    /// Process interleaved frames in place (`[l0, r0, l1, r1, ...]`).
    ///
    /// The frame width is the configured channel count.
    pub fn process_interleaved(&mut self, frames: &mut [f32]) -> Result<()> {
        let width = self.channels.len();
        if width == 0 {
            return Err(ClipperError::invalid_configuration("clipper is not configured"));
        }
        if frames.len() % width != 0 {
            return Err(ClipperError::buffer_mismatch(format!(
                "{} samples is not a whole number of {width}-channel frames",
                frames.len()
            )));
        }

        for frame in frames.chunks_exact_mut(width) {
            for (ch, (state, s)) in self.channels.iter_mut().zip(frame.iter_mut()).enumerate() {
                *s = state.tick_or_hold(&self.stage, ch, *s);
            }
        }
        Ok(())
    }

    fn check_layout(&self, mut lengths: impl Iterator<Item = usize>, count: usize) -> Result<()> {
        if count > self.channels.len() {
            return Err(ClipperError::buffer_mismatch(format!(
                "{count} buffers but {} channels configured",
                self.channels.len()
            )));
        }
        if let Some(first) = lengths.next() {
            if lengths.any(|len| len != first) {
                return Err(ClipperError::buffer_mismatch("channel buffers differ in length"));
            }
        }
        Ok(())
    }

    /// Get the sample rate.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Time step (1/sample_rate) in seconds.
    pub fn time_step(&self) -> f64 {
        1.0 / self.sample_rate
    }

    /// Number of configured channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Capacitor voltage stored for a channel.
    pub fn state(&self, channel: usize) -> Result<f64> {
        self.channel(channel).map(ChannelState::voltage)
    }

    /// Diagnostics for a single channel.
    pub fn channel_stats(&self, channel: usize) -> Result<SolverStats> {
        self.channel(channel).map(ChannelState::stats)
    }

    /// Diagnostics summed over all channels.
    pub fn stats(&self) -> SolverStats {
        self.channels
            .iter()
            .map(ChannelState::stats)
            .fold(SolverStats::default(), SolverStats::merge)
    }

    /// Get the circuit being simulated.
    pub fn circuit(&self) -> &CircuitParams {
        &self.circuit
    }

    /// Get the solver configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn channel(&self, channel: usize) -> Result<&ChannelState> {
        self.channels.get(channel).ok_or(ClipperError::IndexOutOfRange {
            channel,
            num_channels: self.channels.len(),
        })
    }
}
