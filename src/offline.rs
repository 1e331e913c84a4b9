//! Batch QRS detectors over a fully recorded signal.
//!
//! These run each processing step over the whole slice before detection
//! (future-aware centred convolution, full-range maximum searches) and serve
//! as the reference the real-time detectors are checked against. The input
//! is assumed finite.

use crate::detector::{EngZeeConfig, PanTompkinsConfig};
use crate::error::ConfigError;
use crate::filter::{center_and_width, IirFilter};
use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;

const SMOOTHING: [f64; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];

/// Pan–Tompkins over a whole recording. Returns R-peak indices in order.
///
/// # Example
/// ```
/// use qrstream::{offline, PanTompkinsConfig};
///
/// let signal = vec![0.0; 1000];
/// let peaks = offline::pan_tompkins(&signal, &PanTompkinsConfig::new(250.0)).unwrap();
/// assert!(peaks.is_empty());
/// ```
pub fn pan_tompkins(signal: &[f64], config: &PanTompkinsConfig) -> Result<Vec<usize>, ConfigError> {
    config.validate()?;
    let fs = config.sample_rate;
    let (low, high) = config.band;
    let (center, width) = center_and_width(fs, low, high)?;
    let mut filter = IirFilter::band_pass(config.filter_order, fs, center, width)?;

    let filtered: Vec<f64> = signal.iter().map(|&x| filter.process_sample(x)).collect();
    let squared: Vec<f64> = filtered
        .windows(2)
        .map(|w| {
            let d = w[1] - w[0];
            d * d
        })
        .collect();

    let mut integrated = trailing_average(&squared, config.integration_window());
    let head = ((0.2 * fs) as usize + 1).min(integrated.len());
    integrated[..head].fill(0.0);

    Ok(pan_peak_detect(
        &integrated,
        config.refractory_secs * fs,
        config.recovery_distance_secs * fs,
    ))
}

/// Engelse–Zeelenberg over a whole recording. Returns R-peak indices in order.
pub fn engzee(signal: &[f64], config: &EngZeeConfig) -> Result<Vec<usize>, ConfigError> {
    config.validate()?;
    let fs = config.sample_rate;
    let (low, high) = config.notch;
    let (center, width) = center_and_width(fs, low, high)?;
    let mut filter = IirFilter::band_stop(config.filter_order, fs, center, width)?;

    let filtered: Vec<f64> = signal.iter().map(|&x| filter.process_sample(x)).collect();
    let mut smoothed = convolve_same(&moved_difference(&filtered, 4), &SMOOTHING);

    let ms200 = (0.2 * fs) as usize;
    let ms1200 = (1.2 * fs) as usize;
    let ms160 = (0.16 * fs) as usize;
    let neg_threshold = (config.threshold_secs * fs) as usize;

    let head = (ms200 + 1).min(smoothed.len());
    smoothed[..head].fill(0.0);
    let x = &smoothed;

    let n = ms1200.saturating_sub(ms200);
    let slope: Vec<f64> = (0..n)
        .map(|k| 0.6 + (n - 1 - k) as f64 * (0.4 / n as f64))
        .collect();

    let mut envelope = 0.0;
    let mut next_envelope = 0.0;
    let mut history: VecDeque<f64> = VecDeque::with_capacity(6);
    let mut last_qrs: Option<usize> = None;
    let mut thi_at = 0;
    let mut thi = false;
    let mut thf = false;
    let mut counter = 0;
    let mut r_peaks = Vec::new();

    for i in 0..x.len() {
        if (i as f64) < 5.0 * fs {
            envelope = 0.6 * max_in_range(x, 0, i);
            history.push_back(envelope);
            if history.len() > 5 {
                history.pop_front();
            }
        } else if let Some(q) = last_qrs {
            if i < q + ms200 {
                next_envelope = 0.6 * max_in_range(x, q, i);
                if let Some(&last) = history.back() {
                    if next_envelope > 1.5 * last {
                        next_envelope = 1.1 * last;
                    }
                }
            } else if i == q + ms200 {
                history.push_back(next_envelope);
                if history.len() > 5 {
                    history.pop_front();
                }
                envelope = mean(&history);
            } else if i < q + ms1200 {
                if let Some(factor) = slope.get(i - (q + ms200)) {
                    envelope = mean(&history) * factor;
                }
            } else if i > q + ms1200 {
                envelope = 0.6 * mean(&history);
            }
        }

        let clear = last_qrs.map_or(true, |q| i > q + ms200);
        if clear && x[i] > envelope {
            last_qrs = Some(i);
            thi_at = i;
            thi = true;
        }

        if thi && i < thi_at + ms160 {
            if i > 0 && x[i] < -envelope && x[i - 1] > -envelope {
                thf = true;
            }
            if thf && x[i] < -envelope {
                counter += 1;
            } else if x[i] > -envelope && thf {
                counter = 0;
                thi = false;
                thf = false;
            }
        } else if thi && i > thi_at + ms160 {
            counter = 0;
            thi = false;
            thf = false;
        }

        if counter > neg_threshold {
            let from = thi_at.saturating_sub(neg_threshold);
            if let Some(offset) = argmax(&signal[from..i]) {
                r_peaks.push(from + offset);
            }
            counter = 0;
            thi = false;
            thf = false;
        }
    }

    Ok(r_peaks)
}

/// Adaptive dual-threshold detection over the integrated signal.
fn pan_peak_detect(detection: &[f64], refractory: f64, min_distance: f64) -> Vec<usize> {
    let mut signal_peaks = vec![0usize];
    // Position in `peaks` of each signal peak confirmed by threshold
    let mut signal_positions: Vec<usize> = Vec::new();
    let mut peaks: Vec<usize> = Vec::new();

    let mut spki = 0.0;
    let mut npki = 0.0;
    let mut threshold_i1 = 0.0;
    let mut threshold_i2 = 0.0;
    let mut rr_missed = 0usize;

    for i in 1..detection.len().saturating_sub(1) {
        let value = detection[i];
        if !(detection[i - 1] < value && detection[i + 1] < value) {
            continue;
        }
        let position = peaks.len();
        peaks.push(i);
        let last = signal_peaks.last().copied().unwrap_or(0);

        if value > threshold_i1 && (i - last) as f64 > refractory {
            signal_peaks.push(i);
            signal_positions.push(position);
            spki = 0.125 * value + 0.875 * spki;

            if rr_missed != 0 && i - last > rr_missed {
                if let [.., from, to] = signal_positions[..] {
                    let missed = peaks[from + 1..to]
                        .iter()
                        .copied()
                        .filter(|&m| {
                            m > last
                                && m < i
                                && (m - last) as f64 > min_distance
                                && (i - m) as f64 > min_distance
                                && detection[m] > threshold_i2
                        })
                        .fold(None, |best: Option<usize>, m| match best {
                            Some(b) if detection[b] >= detection[m] => best,
                            _ => Some(m),
                        });
                    if let Some(m) = missed {
                        let at = signal_peaks.len() - 1;
                        signal_peaks.insert(at, m);
                    }
                }
            }
        } else {
            npki = 0.125 * value + 0.875 * npki;
        }

        threshold_i1 = npki + 0.25 * (spki - npki);
        threshold_i2 = 0.5 * threshold_i1;

        if signal_peaks.len() >= 9 {
            // The eight entries before the newest
            let recent = &signal_peaks[signal_peaks.len() - 9..signal_peaks.len() - 1];
            let mean_rr = (recent[7] - recent[0]) / 7;
            rr_missed = (1.66 * mean_rr as f64) as usize;
        }
    }

    signal_peaks.split_off(1)
}

/// Mean of the preceding `window` samples, excluding the current one.
/// The first output is the first input.
fn trailing_average(samples: &[f64], window: usize) -> Vec<f64> {
    (0..samples.len())
        .map(|i| {
            if i == 0 {
                return samples[0];
            }
            let section = &samples[i.saturating_sub(window)..i];
            section.iter().sum::<f64>() / section.len() as f64
        })
        .collect()
}

/// `out[i] = x[i] - x[i - offset]`, zero for the first `offset` samples.
fn moved_difference(samples: &[f64], offset: usize) -> Vec<f64> {
    (0..samples.len())
        .map(|i| if i < offset { 0.0 } else { samples[i] - samples[i - offset] })
        .collect()
}

/// Convolution trimmed to the input length, centred on the kernel.
fn convolve_same(samples: &[f64], kernel: &[f64]) -> Vec<f64> {
    let shift = (kernel.len().saturating_sub(1)) / 2;
    (0..samples.len())
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(j, k)| {
                    (i + shift)
                        .checked_sub(j)
                        .and_then(|t| samples.get(t))
                        .map(|x| x * k)
                })
                .sum()
        })
        .collect()
}

/// Maximum of `samples[from..=to]`, with `to` clamped to the slice.
fn max_in_range(samples: &[f64], from: usize, to: usize) -> f64 {
    let to = to.min(samples.len().saturating_sub(1));
    samples
        .get(from..=to)
        .unwrap_or(&[])
        .iter()
        .fold(f64::NEG_INFINITY, |m, &x| m.max(x))
}

fn mean(values: &VecDeque<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Index of the first maximum.
fn argmax(samples: &[f64]) -> Option<usize> {
    samples
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &x)| match best {
            Some((_, v)) if v >= x => best,
            _ => Some((i, x)),
        })
        .map(|(i, _)| i)
}
