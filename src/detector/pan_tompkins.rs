//! Pan–Tompkins QRS detection, one sample at a time.
//!
//! J. Pan and W. J. Tompkins, "A Real-Time QRS Detection Algorithm",
//! IEEE Trans. Biomed. Eng. BME-32(3), 1985, pp. 230–236.

use super::{samples, RealTimeDetector};
use crate::error::{check_duration, check_sample_rate, ConfigError};
use crate::filter::{
    center_and_width, BandFilter, CausalFilter, MovingDifference, MovingWindowAverage, Square,
};
use crate::pipeline::{PeakDetector, Pipeline, PipelineState};
use crate::ring::RingBuffer;
use crate::stage::StageChain;

/// Confirmed peaks kept in the history. The RR estimate spans all but the
/// newest of them (7 intervals).
const HISTORY: usize = 9;

/// Gap, in mean RR intervals, after which a beat is assumed missed.
const MISSED_RR: f64 = 1.66;

/// Parameters of the Pan–Tompkins pipeline and peak detector.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PanTompkinsConfig {
    /// Sampling frequency in Hz.
    pub sample_rate: f64,
    /// Band-pass edges in Hz.
    pub band: (f64, f64),
    pub filter_order: usize,
    /// Moving-window integration length in seconds.
    pub integration_secs: f64,
    /// Minimum spacing between two signal peaks in seconds.
    pub refractory_secs: f64,
    /// Minimum spacing of a recovered peak from both neighbours in seconds.
    pub recovery_distance_secs: f64,
}

impl PanTompkinsConfig {
    /// Standard parameters for the given sampling frequency.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            band: (5.0, 15.0),
            filter_order: 1,
            integration_secs: 0.12,
            refractory_secs: 0.3,
            recovery_distance_secs: 0.25,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_sample_rate(self.sample_rate)?;
        if self.filter_order == 0 {
            return Err(ConfigError::ZeroOrder);
        }
        let (low, high) = self.band;
        let (center, _) = center_and_width(self.sample_rate, low, high)?;
        if center >= self.sample_rate / 2.0 {
            return Err(ConfigError::InvalidBand {
                low,
                high,
                sample_rate: self.sample_rate,
            });
        }
        if self.integration_window() == 0 {
            return Err(ConfigError::EmptyWindow {
                stage: "moving window average",
            });
        }
        check_duration("refractory period", self.refractory_secs)?;
        check_duration("recovery distance", self.recovery_distance_secs)
    }

    /// Integration window in samples.
    pub fn integration_window(&self) -> usize {
        samples(self.integration_secs, self.sample_rate)
    }
}

/// Adaptive dual-threshold peak detector over the integrated signal.
///
/// A sample is a candidate when both neighbours are strictly lower, so every
/// candidate is classified one sample late. Candidates above the primary
/// threshold and outside the refractory period are signal peaks; the rest
/// are noise peaks. Both update their running estimates (`SPKI`, `NPKI`),
/// from which the thresholds follow:
///
/// ```text
/// primary   = NPKI + 0.25 * (SPKI - NPKI)
/// secondary = 0.5 * primary
/// ```
///
/// When two signal peaks are further apart than 1.66 mean RR intervals, the
/// highest noise candidate between them that clears the secondary threshold
/// and keeps the recovery distance from both is reported as a missed beat.
/// The beat that triggered the search is then reported on the next call.
#[derive(Debug, Clone)]
pub struct PanTompkinsPeakDetector {
    refractory: f64,
    min_distance: f64,
    candidate_capacity: usize,
    state: State,
}

#[derive(Debug, Clone)]
struct State {
    n: usize,
    before: Option<f64>,
    last: Option<f64>,
    signal_peaks: RingBuffer<usize>,
    candidates: RingBuffer<(usize, f64)>,
    spki: f64,
    npki: f64,
    threshold_i1: f64,
    threshold_i2: f64,
    rr_missed: usize,
    deferred: Option<usize>,
    evicted: usize,
}

impl State {
    fn new(candidate_capacity: usize) -> Self {
        let mut signal_peaks = RingBuffer::new(HISTORY);
        signal_peaks.push(0);
        Self {
            n: 0,
            before: None,
            last: None,
            signal_peaks,
            candidates: RingBuffer::new(candidate_capacity),
            spki: 0.0,
            npki: 0.0,
            threshold_i1: 0.0,
            threshold_i2: 0.0,
            rr_missed: 0,
            deferred: None,
            evicted: 0,
        }
    }

    fn classify(&mut self, peak: usize, value: f64, refractory: f64, min_distance: f64) -> Option<usize> {
        let previous = self.signal_peaks.newest().unwrap_or(0);
        let mut reported = None;

        if value > self.threshold_i1 && (peak - previous) as f64 > refractory {
            self.signal_peaks.push(peak);
            self.spki = 0.125 * value + 0.875 * self.spki;
            reported = Some(peak);

            if self.rr_missed != 0 && peak - previous > self.rr_missed {
                if let Some(missed) = self.search_back(previous, peak, min_distance) {
                    log::debug!("recovered missed beat at {} before {}", missed, peak);
                    self.signal_peaks.pop_newest();
                    self.signal_peaks.push(missed);
                    self.signal_peaks.push(peak);
                    self.deferred = Some(peak);
                    reported = Some(missed);
                }
            }
            log::trace!("signal peak at {} ({})", peak, value);
            self.candidates.clear();
        } else {
            if let Some((dropped, _)) = self.candidates.push((peak, value)) {
                if self.rr_missed != 0 {
                    self.evicted += 1;
                    log::debug!("candidate at {} evicted before the next signal peak", dropped);
                }
            }
            self.npki = 0.125 * value + 0.875 * self.npki;
        }

        self.update_thresholds();
        reported
    }

    /// Highest candidate strictly between two signal peaks, first on ties.
    fn search_back(&self, previous: usize, peak: usize, min_distance: f64) -> Option<usize> {
        self.candidates
            .iter()
            .filter(|&(index, value)| {
                index > previous
                    && index < peak
                    && (index - previous) as f64 > min_distance
                    && (peak - index) as f64 > min_distance
                    && value > self.threshold_i2
            })
            .fold(None, |best: Option<(usize, f64)>, candidate| match best {
                Some((_, v)) if v >= candidate.1 => best,
                _ => Some(candidate),
            })
            .map(|(index, _)| index)
    }

    fn update_thresholds(&mut self) {
        self.threshold_i1 = self.npki + 0.25 * (self.spki - self.npki);
        self.threshold_i2 = 0.5 * self.threshold_i1;

        if self.signal_peaks.is_full() {
            // The newest confirmed peak is left out of the estimate
            let span = (self.signal_peaks.oldest(), self.signal_peaks.get(HISTORY - 2));
            if let (Some(oldest), Some(latest)) = span {
                let mean_rr = (latest - oldest) / (HISTORY - 2);
                self.rr_missed = (MISSED_RR * mean_rr as f64) as usize;
            }
        }
    }
}

impl PanTompkinsPeakDetector {
    pub fn new(config: &PanTompkinsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fs = config.sample_rate;
        // Local maxima are at least two samples apart
        let candidate_capacity = samples(2.0, fs) + 1;
        Ok(Self {
            refractory: config.refractory_secs * fs,
            min_distance: config.recovery_distance_secs * fs,
            candidate_capacity,
            state: State::new(candidate_capacity),
        })
    }

    /// Current (primary, secondary) thresholds.
    pub fn thresholds(&self) -> (f64, f64) {
        (self.state.threshold_i1, self.state.threshold_i2)
    }

    /// Running signal and noise peak levels.
    pub fn levels(&self) -> (f64, f64) {
        (self.state.spki, self.state.npki)
    }

    /// Gap in samples beyond which a missed beat is searched for (0 until
    /// enough beats have been seen).
    pub fn missed_interval(&self) -> usize {
        self.state.rr_missed
    }

    /// Noise candidates dropped from the full candidate ring while recovery
    /// was armed. They are out of reach of the missed-beat search.
    pub fn evicted_candidates(&self) -> usize {
        self.state.evicted
    }
}

impl PeakDetector for PanTompkinsPeakDetector {
    fn detect(&mut self, filtered: f64, _raw: f64) -> Option<usize> {
        let state = &mut self.state;
        let i = state.n;
        state.n += 1;
        let deferred = state.deferred.take();

        let (before, last) = (state.before, state.last);
        state.before = last;
        state.last = Some(filtered);

        let (Some(before), Some(value)) = (before, last) else {
            return deferred;
        };
        if !(before < value && filtered < value) {
            return deferred;
        }

        state
            .classify(i - 1, value, self.refractory, self.min_distance)
            .or(deferred)
    }

    fn reset(&mut self) {
        self.state = State::new(self.candidate_capacity);
    }
}

/// Pan–Tompkins detector over raw ECG samples.
///
/// # Example
/// ```
/// use qrstream::{PanTompkinsRealTime, RealTimeDetector};
///
/// let mut detector = PanTompkinsRealTime::new(250.0).unwrap();
/// let signal: Vec<f64> = (0..2500)
///     .map(|i| if i % 250 == 100 { 1.0 } else { 0.0 })
///     .collect();
/// let peaks = detector.process_block(&signal);
/// assert!(peaks.windows(2).all(|w| w[1] > w[0]));
/// ```
pub struct PanTompkinsRealTime {
    config: PanTompkinsConfig,
    pipeline: Pipeline<PanTompkinsPeakDetector>,
}

impl PanTompkinsRealTime {
    pub fn new(sample_rate: f64) -> Result<Self, ConfigError> {
        Self::with_config(PanTompkinsConfig::new(sample_rate))
    }

    /// Builds the detector with the built-in band-pass cascade.
    pub fn with_config(config: PanTompkinsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (low, high) = config.band;
        let band = BandFilter::band_pass(config.filter_order, config.sample_rate, low, high)?;
        Self::build(config, band)
    }

    /// Builds the detector around a caller-supplied band-pass filter.
    pub fn with_filter<F>(config: PanTompkinsConfig, filter: F) -> Result<Self, ConfigError>
    where
        F: CausalFilter + Send + 'static,
    {
        config.validate()?;
        Self::build(config, BandFilter::new(filter))
    }

    fn build<F>(config: PanTompkinsConfig, band: BandFilter<F>) -> Result<Self, ConfigError>
    where
        F: CausalFilter + Send + 'static,
    {
        let chain = StageChain::new()
            .with(band)
            .with(MovingDifference::new(1)?)
            .with(Square)
            .with(MovingWindowAverage::new(config.integration_window())?);
        let detector = PanTompkinsPeakDetector::new(&config)?;

        Ok(Self {
            config,
            pipeline: Pipeline::new(chain, detector, 0),
        })
    }

    pub fn config(&self) -> &PanTompkinsConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// Leading samples that never reached the peak detector.
    pub fn skipped(&self) -> usize {
        self.pipeline.skipped()
    }

    pub fn detector(&self) -> &PanTompkinsPeakDetector {
        self.pipeline.detector()
    }
}

impl RealTimeDetector for PanTompkinsRealTime {
    fn process_sample(&mut self, sample: f64) -> Option<usize> {
        self.pipeline.process(sample)
    }

    fn reset(&mut self) {
        self.pipeline.reset();
    }

    fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    fn warm_up(&self) -> usize {
        self.pipeline.warm_up()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::IirFilter;
    use crate::test_signals::{every, pulse_train, pulses_at};
    use alloc::vec;
    use alloc::vec::Vec;

    fn recovery_signal(weak: f64) -> Vec<f64> {
        let positions = every(100, 200, 2900);
        let mut amps = vec![1.0; positions.len()];
        amps[11] = weak;
        pulses_at(3200, &positions, 5, &amps)
    }

    fn run(sample_rate: f64, signal: &[f64]) -> Vec<usize> {
        PanTompkinsRealTime::new(sample_rate)
            .unwrap()
            .process_block(signal)
    }

    #[test]
    fn test_pulse_train_250hz() {
        let signal = pulse_train(3000, 300, 5, 150, 1.0);
        assert_eq!(run(250.0, &signal), every(176, 300, 3000));
    }

    #[test]
    fn test_pulse_train_360hz() {
        let signal = pulse_train(4000, 288, 7, 200, 1.0);
        let peaks = run(360.0, &signal);
        assert_eq!(peaks, every(238, 288, 4000));
        assert_eq!(peaks.last(), Some(&3982));
    }

    #[test]
    fn test_warm_up_precedes_detections() {
        let signal = pulse_train(3000, 300, 5, 150, 1.0);
        let mut detector = PanTompkinsRealTime::new(250.0).unwrap();
        assert_eq!(detector.warm_up(), 1);

        let calls: Vec<usize> = signal
            .iter()
            .enumerate()
            .filter_map(|(i, &x)| detector.process_sample(x).map(|_| i))
            .collect();
        assert_eq!(calls[..2], [177, 477]);
        assert!(calls.iter().all(|&i| i + 1 >= detector.warm_up()));
        assert_eq!(detector.skipped(), 1);
        assert_eq!(detector.state(), PipelineState::Ready);
    }

    #[test]
    fn test_missed_beat_recovery() {
        let signal = recovery_signal(0.4);
        let mut detector = PanTompkinsRealTime::new(250.0).unwrap();

        let emitted: Vec<(usize, usize)> = signal
            .iter()
            .enumerate()
            .filter_map(|(i, &x)| detector.process_sample(x).map(|p| (i, p)))
            .collect();

        // The weak beat is reported when the next beat confirms, which
        // itself follows one call later
        assert_eq!(emitted[9..13], [(1927, 1926), (2127, 2126), (2527, 2326), (2528, 2526)]);
        let peaks: Vec<usize> = emitted.iter().map(|&(_, p)| p).collect();
        assert_eq!(peaks, every(126, 200, 2900));
    }

    #[test]
    fn test_missed_interval_excludes_newest_beat() {
        // Regular beats, one long interval, then a weak beat between two
        // beats 340 samples apart
        let mut positions = every(100, 200, 2000);
        positions.extend([2200, 2370, 2540, 2740, 2940]);
        let mut amps = vec![1.0; positions.len()];
        amps[11] = 0.4;
        let signal = pulses_at(3200, &positions, 5, &amps);

        let mut detector = PanTompkinsRealTime::new(250.0).unwrap();
        let emitted: Vec<(usize, usize)> = signal
            .iter()
            .enumerate()
            .filter_map(|(i, &x)| detector.process_sample(x).map(|p| (i, p)))
            .collect();

        // The 300-sample interval ending at 2226 does not yet widen the bound
        assert_eq!(emitted[10..13], [(2227, 2226), (2567, 2396), (2568, 2566)]);
        assert_eq!(detector.detector().missed_interval(), 340);
    }

    #[test]
    fn test_weak_beat_below_secondary_threshold() {
        let peaks = run(250.0, &recovery_signal(0.1));
        let expected: Vec<usize> = every(126, 200, 2900)
            .into_iter()
            .filter(|&p| p != 2326)
            .collect();
        assert_eq!(peaks, expected);
    }

    #[test]
    fn test_candidate_eviction_while_armed() {
        let config = PanTompkinsConfig::new(250.0);
        let mut detector = PanTompkinsPeakDetector::new(&config).unwrap();

        let mut signal = vec![0.0; 6000];
        for at in every(500, 500, 4001) {
            signal[at] = 1.0;
        }
        // 650 noise peaks against a ring of 501
        for at in every(4100, 2, 5400) {
            signal[at] = 0.01;
        }
        signal[5500] = 1.0;

        let peaks: Vec<usize> = signal.iter().filter_map(|&x| detector.detect(x, x)).collect();
        let mut expected = every(500, 500, 4001);
        expected.push(5500);
        assert_eq!(peaks, expected);
        assert_eq!(detector.missed_interval(), 830);
        assert_eq!(detector.evicted_candidates(), 149);

        detector.reset();
        assert_eq!(detector.evicted_candidates(), 0);
    }

    #[test]
    fn test_refractory_and_recovery_spacing() {
        let fs = 250.0;
        for weak in [0.1, 0.4, 1.0] {
            let peaks = run(fs, &recovery_signal(weak));
            for pair in peaks.windows(2) {
                assert!(pair[1] > pair[0]);
                assert!((pair[1] - pair[0]) as f64 > 0.25 * fs);
            }
        }
        let peaks = run(fs, &pulse_train(3000, 300, 5, 150, 1.0));
        assert!(peaks.windows(2).all(|w| (w[1] - w[0]) as f64 > 0.3 * fs));
    }

    #[test]
    fn test_amplitude_invariance() {
        let signal = pulse_train(3000, 300, 5, 150, 1.0);
        let reference = run(250.0, &signal);
        for gain in [2.0, 8.0, 0.5] {
            let scaled: Vec<f64> = signal.iter().map(|x| x * gain).collect();
            assert_eq!(run(250.0, &scaled), reference);
        }
    }

    #[test]
    fn test_reset_reproduces_first_run() {
        let signal = recovery_signal(0.4);
        let mut detector = PanTompkinsRealTime::new(250.0).unwrap();
        let first = detector.process_block(&signal);

        detector.reset();
        detector.reset();
        assert_eq!(detector.state(), PipelineState::Priming);
        assert_eq!(detector.detector().missed_interval(), 0);
        assert_eq!(detector.process_block(&signal), first);

        detector.reset();
        assert_eq!(detector.process_block(&signal[..1000]), first[..5]);
    }

    #[test]
    fn test_non_finite_samples() {
        let signal = pulse_train(3000, 300, 5, 150, 1.0);
        let reference = run(250.0, &signal);

        let mut gaps = signal.clone();
        gaps[700] = f64::NAN;
        gaps[1000] = f64::INFINITY;
        assert_eq!(run(250.0, &gaps), reference);

        let mut leading = signal.clone();
        leading[0] = f64::NAN;
        leading[3] = f64::NAN;
        let mut detector = PanTompkinsRealTime::new(250.0).unwrap();
        assert_eq!(detector.process_block(&leading), reference);
        assert_eq!(detector.skipped(), 2);
    }

    #[test]
    fn test_short_and_flat_input() {
        let mut detector = PanTompkinsRealTime::new(250.0).unwrap();
        assert_eq!(detector.process_sample(1.0), None);
        assert!(run(250.0, &[0.0; 2000]).is_empty());
    }

    #[test]
    fn test_custom_filter_matches_builtin() {
        let signal = pulse_train(3000, 300, 5, 150, 1.0);
        let config = PanTompkinsConfig::new(250.0);
        let filter = IirFilter::band_pass(1, 250.0, 10.0, 10.0).unwrap();
        let mut detector = PanTompkinsRealTime::with_filter(config, filter).unwrap();
        assert_eq!(detector.process_block(&signal), run(250.0, &signal));
    }

    #[test]
    fn test_peak_detector_lags_one_sample() {
        let config = PanTompkinsConfig::new(250.0);
        let mut detector = PanTompkinsPeakDetector::new(&config).unwrap();

        let mut signal = [0.0; 200];
        signal[100] = 1.0;
        // Plateaus are not local maxima
        signal[150] = 1.0;
        signal[151] = 1.0;

        let hits: Vec<(usize, usize)> = signal
            .iter()
            .enumerate()
            .filter_map(|(i, &x)| detector.detect(x, x).map(|p| (i, p)))
            .collect();
        assert_eq!(hits, [(101, 100)]);

        let (spki, npki) = detector.levels();
        assert_eq!(spki, 0.125);
        assert_eq!(npki, 0.0);
        assert_eq!(detector.thresholds(), (0.03125, 0.015625));
    }

    #[test]
    fn test_config_validation() {
        assert!(PanTompkinsConfig::new(250.0).validate().is_ok());
        assert_eq!(
            PanTompkinsRealTime::new(0.0).err(),
            Some(ConfigError::InvalidSampleRate(0.0))
        );
        assert!(matches!(
            PanTompkinsRealTime::new(20.0).err(),
            Some(ConfigError::InvalidBand { .. })
        ));

        let mut config = PanTompkinsConfig::new(250.0);
        config.filter_order = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroOrder));

        let mut config = PanTompkinsConfig::new(250.0);
        config.integration_secs = 0.001;
        assert!(matches!(
            PanTompkinsRealTime::with_config(config).err(),
            Some(ConfigError::EmptyWindow { .. })
        ));

        let mut config = PanTompkinsConfig::new(250.0);
        config.refractory_secs = -0.3;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }
}
