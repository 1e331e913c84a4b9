//! Synthetic inputs shared by the unit tests.

use alloc::vec;
use alloc::vec::Vec;

/// Triangular pulse of height `amp` and half-width `half` centred on `at`.
fn add_pulse(signal: &mut [f64], at: usize, half: usize, amp: f64) {
    let from = at.saturating_sub(half);
    let to = (at + half).min(signal.len().saturating_sub(1));
    for (i, x) in signal.iter_mut().enumerate().take(to + 1).skip(from) {
        let k = i as i64 - at as i64;
        *x += amp * (1.0 - k.unsigned_abs() as f64 / half as f64);
    }
}

/// Unit-spaced train of equal pulses every `period` samples starting at `start`.
pub(crate) fn pulse_train(n: usize, period: usize, half: usize, start: usize, amp: f64) -> Vec<f64> {
    let mut signal = vec![0.0; n];
    for at in (start..n).step_by(period) {
        add_pulse(&mut signal, at, half, amp);
    }
    signal
}

/// Pulses at explicit positions with per-pulse amplitudes.
pub(crate) fn pulses_at(n: usize, positions: &[usize], half: usize, amps: &[f64]) -> Vec<f64> {
    let mut signal = vec![0.0; n];
    for (&at, &amp) in positions.iter().zip(amps) {
        add_pulse(&mut signal, at, half, amp);
    }
    signal
}

/// `start + k * period` for every such index below `end`.
pub(crate) fn every(start: usize, period: usize, end: usize) -> Vec<usize> {
    (start..end).step_by(period).collect()
}
