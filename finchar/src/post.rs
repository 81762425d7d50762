//! Post-processing of raw simulator vectors.

use std::f64::consts::PI;

use crate::deps::num_complex::Complex64;

/// Amperes to microamperes.
pub const MICRO: f64 = 1e6;

/// Small-signal capacitance, in farads, from the voltage and current phasors
/// at a node driven at `freq` hertz.
///
/// `C = 1 / (2π·f·Im(V / I))`, where `I` is the branch current reported for
/// the driving source.
pub fn capacitance(v: Complex64, i: Complex64, freq: f64) -> f64 {
    let factor = v / i;
    1.0 / (2.0 * PI * freq * factor.im)
}

pub fn farads_to_femtofarads(c: f64) -> f64 {
    c * 1e15
}

/// Drain current in microamperes from the branch current of the drain supply.
///
/// SPICE reports current flowing into the source's positive terminal, so the
/// current delivered to the drain is its negation.
#[inline]
pub fn drain_current_ua(source_current: f64) -> f64 {
    -source_current * MICRO
}

pub fn drain_currents_ua(source_current: &[f64]) -> Vec<f64> {
    source_current.iter().copied().map(drain_current_ua).collect()
}

/// Elementwise base-10 logarithm, index-aligned with the input.
///
/// Non-positive entries map to `NaN` (negative) or `-inf` (zero).
pub fn log10(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.log10()).collect()
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + i as f64 * step).collect()
        }
    }
}

/// Rounds to `decimals` places after the decimal point.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    let rounded = (value * scale).round() / scale;
    // Avoid emitting `-0` into netlists and reports.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
