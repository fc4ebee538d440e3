//! Behavioral properties of the clipper stage.

use approx::assert_abs_diff_eq;
use diode_clipper::{CircuitParams, DiodeClipper, DiodeParams, SolverConfig};
use proptest::prelude::*;

const SAMPLE_RATES: [f64; 6] = [8000.0, 22050.0, 44100.0, 48000.0, 96000.0, 192000.0];

fn clipper(sample_rate: f64, num_channels: usize) -> DiodeClipper {
    let mut c = DiodeClipper::default();
    c.configure(sample_rate, num_channels).unwrap();
    c
}

fn run(c: &mut DiodeClipper, signal: &[f64]) -> Vec<f64> {
    signal
        .iter()
        .map(|&x| c.process_sample(x, 0).unwrap())
        .collect()
}

fn sine(amplitude: f64, freq: f64, sample_rate: f64, len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin())
        .collect()
}

#[test]
fn zero_input_stays_at_rest() {
    for &fs in &SAMPLE_RATES {
        let mut c = clipper(fs, 2);
        for _ in 0..10_000 {
            for ch in 0..2 {
                assert_eq!(c.process_sample(0.0, ch).unwrap(), 0.0);
            }
        }
        assert_eq!(c.stats().unconverged, 0);
    }
}

#[test]
fn square_wave_stays_bounded() {
    for &fs in &SAMPLE_RATES {
        for half_period in [1usize, 50] {
            let mut c = clipper(fs, 1);
            for i in 0..10_000 {
                let v_in = if (i / half_period) % 2 == 0 { 10.0 } else { -10.0 };
                let v = c.process_sample(v_in, 0).unwrap();
                assert!(v.is_finite(), "non-finite output at {fs} Hz, sample {i}");
                assert!(v.abs() < 1.0, "output {v} escaped the diode knee at {fs} Hz");
                assert_eq!(c.state(0).unwrap(), v);
            }
        }
    }
}

#[test]
fn first_samples_of_a_step() {
    let mut c = clipper(44100.0, 1);
    c.reset();

    let first = c.process_sample(1.0, 0).unwrap();
    assert!(first > 0.0 && first < 1.0);
    assert_eq!(c.state(0).unwrap(), first);

    let second = c.process_sample(1.0, 0).unwrap();
    let mut steady = second;
    for _ in 0..2000 {
        steady = c.process_sample(1.0, 0).unwrap();
    }

    // Approaches the fixed point from below
    assert!(second > first);
    assert!((steady - second).abs() < (steady - first).abs());
    assert!(steady > 0.5 && steady < 0.55);
    assert_abs_diff_eq!(c.process_sample(1.0, 0).unwrap(), steady, epsilon = 1e-12);
}

#[test]
fn sweep_is_monotonic() {
    for &fs in &SAMPLE_RATES {
        let mut last = f64::NEG_INFINITY;
        for k in -50..=50 {
            let v_in = k as f64 * 0.1;
            let mut c = clipper(fs, 1);
            let v = c.process_sample(v_in, 0).unwrap();
            assert!(v >= last - 1e-9, "{v_in} V gave {v} after {last} at {fs} Hz");
            last = v;
        }
    }
}

#[test]
fn sine_is_odd_symmetric() {
    let signal = sine(0.8, 440.0, 44100.0, 4000);
    let negated: Vec<f64> = signal.iter().map(|x| -x).collect();

    let a = run(&mut clipper(44100.0, 1), &signal);
    let b = run(&mut clipper(44100.0, 1), &negated);
    for (x, y) in a.iter().zip(&b) {
        assert_abs_diff_eq!(*x, -*y, epsilon = 1e-4);
    }
}

#[test]
fn eight_iterations_are_near_converged() {
    let loose = SolverConfig::default();
    let tight = SolverConfig::new().with_max_iterations(20);

    for fs in [44100.0, 48000.0, 96000.0] {
        for freq in [100.0, 440.0, 1000.0] {
            for amplitude in [0.5, 1.0, 2.0] {
                let signal = sine(amplitude, freq, fs, 4410);

                let mut a = DiodeClipper::new(CircuitParams::default(), loose).unwrap();
                a.configure(fs, 1).unwrap();
                let mut b = DiodeClipper::new(CircuitParams::default(), tight).unwrap();
                b.configure(fs, 1).unwrap();

                for (x, y) in run(&mut a, &signal).iter().zip(run(&mut b, &signal)) {
                    assert_abs_diff_eq!(*x, y, epsilon = 1e-5);
                }
            }
        }
    }
}

#[test]
fn germanium_clips_lower_than_silicon() {
    let mut si = clipper(44100.0, 1);
    let mut ge = DiodeClipper::new(
        CircuitParams::new().with_diode(DiodeParams::germanium()),
        SolverConfig::default(),
    )
    .unwrap();
    ge.configure(44100.0, 1).unwrap();

    let signal = vec![5.0; 2000];
    let v_si = *run(&mut si, &signal).last().unwrap();
    let v_ge = *run(&mut ge, &signal).last().unwrap();
    assert!(v_ge > 0.0);
    assert!(v_ge < v_si);
}

#[test]
fn reset_restores_initial_response() {
    let signal = sine(1.5, 220.0, 48000.0, 1000);
    let mut c = clipper(48000.0, 1);
    let first = run(&mut c, &signal);
    c.reset();
    let second = run(&mut c, &signal);
    assert_eq!(first, second);
}

proptest! {
    #[test]
    fn random_signals_stay_finite_and_odd(
        signal in prop::collection::vec(-10.0f64..10.0, 1..300),
        fs in 8000.0f64..192000.0,
    ) {
        let negated: Vec<f64> = signal.iter().map(|x| -x).collect();
        let a = run(&mut clipper(fs, 1), &signal);
        let b = run(&mut clipper(fs, 1), &negated);

        for (x, y) in a.iter().zip(&b) {
            prop_assert!(x.is_finite());
            prop_assert!(x.abs() < 1.0);
            prop_assert!((x + y).abs() < 1e-4);
        }
    }

    #[test]
    fn larger_input_never_gives_smaller_output(
        a in -10.0f64..10.0,
        b in -10.0f64..10.0,
        fs in 8000.0f64..192000.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let v_lo = clipper(fs, 1).process_sample(lo, 0).unwrap();
        let v_hi = clipper(fs, 1).process_sample(hi, 0).unwrap();
        prop_assert!(v_lo <= v_hi + 1e-9);
    }

    #[test]
    fn channels_do_not_interact(
        left in prop::collection::vec(-5.0f32..5.0, 1..200),
    ) {
        let right: Vec<f32> = left.iter().map(|x| x * 0.3).collect();

        let mut stereo = clipper(44100.0, 2);
        let (mut l, mut r) = (left.clone(), right.clone());
        stereo.process_block_in_place(&mut [&mut l[..], &mut r[..]]).unwrap();

        let mut mono = clipper(44100.0, 1);
        let mut l_only = left.clone();
        mono.process_block_in_place(&mut [&mut l_only[..]]).unwrap();

        prop_assert_eq!(l, l_only);
    }
}
