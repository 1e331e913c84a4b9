//! Synthetic signal generators for the demos.
//!
//! - Sine waves (mains hum)
//! - White noise
//! - ECG-like beat trains with known R-peak positions
//! - Peak matching against the known positions

#![allow(dead_code)] // Functions used across multiple demos

use std::f64::consts::PI;

/// Generates a sine wave.
pub fn sine_wave(samples: usize, sample_rate: f64, frequency: f64, amplitude: f64) -> Vec<f64> {
    (0..samples)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f64 / sample_rate).sin())
        .collect()
}

/// Generates white noise in `[-amplitude, amplitude]` using a simple LCG.
pub fn white_noise(samples: usize, amplitude: f64, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..samples)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let normalized = (state >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0;
            amplitude * normalized
        })
        .collect()
}

/// One wave of a beat: offset from the R peak (s), amplitude, width (s).
const WAVES: [(f64, f64, f64); 5] = [
    (-0.20, 0.15, 0.025), // P
    (-0.03, -0.12, 0.008), // Q
    (0.00, 1.00, 0.010),  // R
    (0.03, -0.25, 0.008), // S
    (0.30, 0.30, 0.040),  // T
];

/// ECG-like signal at a constant heart rate. Returns the signal and the
/// sample index of every R peak.
pub fn ecg_like(samples: usize, sample_rate: f64, heart_rate: f64) -> (Vec<f64>, Vec<usize>) {
    let period = 60.0 / heart_rate;
    let mut signal = vec![0.0; samples];
    let mut r_peaks = Vec::new();

    let mut beat = 0.5;
    while beat * sample_rate < samples as f64 {
        r_peaks.push((beat * sample_rate).round() as usize);
        for (i, x) in signal.iter_mut().enumerate() {
            let t = i as f64 / sample_rate - beat;
            for &(offset, amplitude, width) in &WAVES {
                let z = (t - offset) / width;
                *x += amplitude * (-0.5 * z * z).exp();
            }
        }
        beat += period;
    }

    (signal, r_peaks)
}

/// Adds `other` to `signal` sample by sample.
pub fn add(signal: &mut [f64], other: &[f64]) {
    for (x, y) in signal.iter_mut().zip(other) {
        *x += y;
    }
}

/// Detection counts against known beats.
#[derive(Debug, Clone, Copy, Default)]
pub struct Score {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl Score {
    pub fn sensitivity(&self) -> f64 {
        let total = self.true_positives + self.false_negatives;
        if total == 0 {
            return 0.0;
        }
        self.true_positives as f64 / total as f64
    }

    pub fn precision(&self) -> f64 {
        let total = self.true_positives + self.false_positives;
        if total == 0 {
            return 0.0;
        }
        self.true_positives as f64 / total as f64
    }
}

/// Matches each detection to the nearest unmatched beat within `tolerance`
/// samples. Detections are expected in increasing order.
pub fn score(detected: &[usize], truth: &[usize], tolerance: usize) -> Score {
    let mut matched = vec![false; truth.len()];
    let mut score = Score::default();

    for &d in detected {
        let hit = truth
            .iter()
            .enumerate()
            .filter(|&(k, &t)| !matched[k] && d.abs_diff(t) <= tolerance)
            .min_by_key(|&(_, &t)| d.abs_diff(t))
            .map(|(k, _)| k);
        match hit {
            Some(k) => {
                matched[k] = true;
                score.true_positives += 1;
            }
            None => score.false_positives += 1,
        }
    }
    score.false_negatives = matched.iter().filter(|&&m| !m).count();
    score
}
