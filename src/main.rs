//! Diode Clipper - analog soft-saturation stage
//!
//! Streams raw interleaved `f32` PCM through the clipper.
//!
//! # Usage
//!
//! ```bash
//! ffmpeg -i input.wav -f f32le -ac 2 -ar 44100 - | diode-clipper -c 2 --input-gain-db 12 | ffmpeg -f f32le -ac 2 -ar 44100 -i - output.wav
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=debug` for more detail.

use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use diode_clipper::{
    audio::{process_audio, GainStage},
    error::Result,
    CircuitParams, DiodeClipper, DiodeParams, SolverConfig, DEFAULT_SAMPLE_RATE,
};

/// Diode model preset
#[derive(Debug, Clone, Copy, ValueEnum)]
enum DiodeModel {
    /// 1N4148 silicon
    Silicon,
    /// 1N34A-class germanium
    Germanium,
}

impl DiodeModel {
    fn params(self) -> DiodeParams {
        match self {
            DiodeModel::Silicon => DiodeParams::silicon(),
            DiodeModel::Germanium => DiodeParams::germanium(),
        }
    }
}

/// Diode clipper stage
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sample rate in Hz
    #[arg(short, long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: f64,

    /// Number of interleaved channels
    #[arg(short, long, default_value_t = 1)]
    channels: usize,

    /// Diode model
    #[arg(long, value_enum, default_value_t = DiodeModel::Silicon)]
    diode: DiodeModel,

    /// Series resistance in ohms
    #[arg(long, default_value_t = 2200.0)]
    resistance: f64,

    /// Shunt capacitance in farads
    #[arg(long, default_value_t = 10e-9)]
    capacitance: f64,

    /// Newton-Raphson iterations per sample
    #[arg(long, default_value_t = diode_clipper::solver::DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Convergence tolerance in volts
    #[arg(long, default_value_t = diode_clipper::solver::DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Newton step limit in volts
    #[arg(long, default_value_t = diode_clipper::solver::DEFAULT_MAX_STEP)]
    max_step: f64,

    /// Gain before the clipper in dB
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    input_gain_db: f32,

    /// Gain after the clipper in dB
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    output_gain_db: f32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Build the circuit
    let circuit = CircuitParams::new()
        .with_resistance(args.resistance)
        .with_capacitance(args.capacitance)
        .with_diode(args.diode.params());

    let config = SolverConfig::new()
        .with_max_iterations(args.max_iterations)
        .with_tolerance(args.tolerance)
        .with_max_step(args.max_step);

    // Create clipper
    let mut clipper = DiodeClipper::new(circuit, config)?;
    clipper.configure(args.sample_rate, args.channels)?;

    info!(
        sample_rate = args.sample_rate,
        channels = args.channels,
        diode = ?args.diode,
        "processing stdin"
    );

    // Process audio
    let gain = GainStage::from_db(args.input_gain_db, args.output_gain_db);
    let frames = process_audio(&mut clipper, gain)?;

    let stats = clipper.stats();
    info!(
        frames,
        iterations = stats.iterations,
        mean_iterations = stats.mean_iterations(),
        "done"
    );
    if stats.unconverged > 0 {
        warn!(
            unconverged = stats.unconverged,
            samples = stats.samples,
            "samples hit the iteration cap before converging"
        );
    }

    Ok(())
}
