//! TOML-based exploration tool for the QRS detectors.
//!
//! Detector parameters are deserialized straight into the library's config
//! types, so any field can be tuned from a file. Embedded recipes cover the
//! common cases.
//!
//! Run with:
//!   cargo run --example explore --features serde                       # Uses explore.toml
//!   cargo run --example explore --features serde -- --recipe noisy     # Uses embedded recipe
//!   cargo run --example explore --features serde -- --config my.toml   # Uses custom file

mod common;

use clap::Parser;
use plotters::prelude::*;
use qrstream::{
    EngZeeConfig, EngZeeRealTime, PanTompkinsConfig, PanTompkinsRealTime, RealTimeDetector,
};
use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::io::Write;

// ============================================================================
// Recipe Constants
// ============================================================================

const RECIPE_CLEAN: &str = r#"
[signal]
duration = 10.0
sample_rate = 360.0
heart_rate = 72.0
noise_amplitude = 0.0
noise_seed = 42

[[detectors]]
type = "pan_tompkins"
sample_rate = 360.0
band = [5.0, 15.0]
filter_order = 1
integration_secs = 0.12
refractory_secs = 0.3
recovery_distance_secs = 0.25

[[detectors]]
type = "engzee"
sample_rate = 360.0
threshold_secs = 0.0085
notch = [48.0, 52.0]
filter_order = 4
settle_secs = 0.2

[output]
plot_path = "output/explore_clean.png"
csv_path = "output/explore_clean.csv"
"#;

const RECIPE_NOISY: &str = r#"
[signal]
duration = 20.0
sample_rate = 250.0
heart_rate = 80.0
noise_amplitude = 0.08
noise_seed = 7

[signal.mains]
frequency = 50.0
amplitude = 0.3

[[detectors]]
type = "pan_tompkins"
sample_rate = 250.0
band = [5.0, 15.0]
filter_order = 1
integration_secs = 0.12
refractory_secs = 0.3
recovery_distance_secs = 0.25

[[detectors]]
type = "engzee"
sample_rate = 250.0
threshold_secs = 0.0085
notch = [48.0, 52.0]
filter_order = 4
settle_secs = 0.2

[output]
plot_path = "output/explore_noisy.png"
csv_path = "output/explore_noisy.csv"
"#;

const RECIPE_US_MAINS: &str = r#"
[signal]
duration = 20.0
sample_rate = 500.0
heart_rate = 65.0
noise_amplitude = 0.03
noise_seed = 3

[signal.mains]
frequency = 60.0
amplitude = 0.3

[[detectors]]
type = "engzee"
sample_rate = 500.0
threshold_secs = 0.0085
notch = [58.0, 62.0]
filter_order = 4
settle_secs = 0.2

[[detectors]]
type = "engzee"
sample_rate = 500.0
threshold_secs = 0.0085
notch = [48.0, 52.0]
filter_order = 4
settle_secs = 0.2

[output]
plot_path = "output/explore_us_mains.png"
csv_path = "output/explore_us_mains.csv"
"#;

const RECIPE_TACHYCARDIA: &str = r#"
[signal]
duration = 15.0
sample_rate = 360.0
heart_rate = 150.0
noise_amplitude = 0.02
noise_seed = 11

[[detectors]]
type = "pan_tompkins"
sample_rate = 360.0
band = [5.0, 15.0]
filter_order = 1
integration_secs = 0.12
refractory_secs = 0.2
recovery_distance_secs = 0.15

[[detectors]]
type = "engzee"
sample_rate = 360.0
threshold_secs = 0.0085
notch = [48.0, 52.0]
filter_order = 4
settle_secs = 0.2

[output]
plot_path = "output/explore_tachycardia.png"
csv_path = "output/explore_tachycardia.csv"
"#;

// ============================================================================
// Configuration Structures
// ============================================================================

#[derive(Deserialize)]
struct ExploreConfig {
    signal: SignalConfig,
    detectors: Vec<DetectorConfig>,
    output: OutputConfig,
}

#[derive(Deserialize)]
struct SignalConfig {
    duration: f64,
    sample_rate: f64,
    heart_rate: f64,
    noise_amplitude: f64,
    noise_seed: u64,
    #[serde(default)]
    mains: Option<MainsConfig>,
}

#[derive(Deserialize)]
struct MainsConfig {
    frequency: f64,
    amplitude: f64,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DetectorConfig {
    PanTompkins(PanTompkinsConfig),
    Engzee(EngZeeConfig),
}

#[derive(Deserialize)]
struct OutputConfig {
    plot_path: String,
    csv_path: String,
}

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recipe name (clean, noisy, us_mains, tachycardia)
    #[arg(short, long)]
    recipe: Option<String>,

    /// Custom config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Matching tolerance in milliseconds
    #[arg(short, long, default_value_t = 150.0)]
    tolerance_ms: f64,
}

/// Result of one detector run.
struct Run {
    name: String,
    peaks: Vec<usize>,
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    println!("=== qrstream Exploration Tool ===\n");

    // Load config (priority: --config > --recipe > explore.toml)
    let config_str = if let Some(recipe_name) = args.recipe {
        println!("Using recipe: {}", recipe_name);
        load_recipe(&recipe_name)?
    } else if let Some(config_path) = args.config {
        println!("Loading config: {}", config_path);
        fs::read_to_string(config_path)?
    } else {
        match fs::read_to_string("explore.toml") {
            Ok(content) => {
                println!("Using explore.toml");
                content
            }
            Err(_) => {
                println!("No explore.toml found, using clean recipe");
                RECIPE_CLEAN.to_string()
            }
        }
    };

    let config: ExploreConfig =
        toml::from_str(&config_str).map_err(|e| format!("Failed to parse TOML config: {}", e))?;

    println!();
    println!("Configuration:");
    println!("  Duration: {:.1}s", config.signal.duration);
    println!("  Sample rate: {:.1} Hz", config.signal.sample_rate);
    println!("  Heart rate: {:.0} bpm", config.signal.heart_rate);
    println!("  Detectors: {}", config.detectors.len());
    println!();

    let (signal, truth) = generate_signal(&config.signal);
    let tolerance = (args.tolerance_ms * config.signal.sample_rate / 1000.0) as usize;

    let mut runs = Vec::with_capacity(config.detectors.len());
    for detector_cfg in &config.detectors {
        check_sample_rate(detector_cfg, config.signal.sample_rate)?;
        let (name, mut detector) = build_detector(detector_cfg)?;
        let peaks = detector.process_block(&signal);

        let score = common::score(&peaks, &truth, tolerance);
        println!("{}", name);
        println!("  Warm-up: {} samples", detector.warm_up());
        println!("  Detections: {} of {} beats", peaks.len(), truth.len());
        println!(
            "  Sensitivity: {:.3}  Precision: {:.3}",
            score.sensitivity(),
            score.precision()
        );
        println!();

        runs.push(Run { name, peaks });
    }

    // Create output directory
    if let Some(parent) = std::path::Path::new(&config.output.plot_path).parent() {
        fs::create_dir_all(parent)?;
    }

    write_csv(&runs, &config)?;
    generate_plot(&signal, &truth, &runs, &config)?;

    println!("Done!");
    println!("  Plot: {}", config.output.plot_path);
    println!("  CSV: {}", config.output.csv_path);

    Ok(())
}

// ============================================================================
// Config Loading
// ============================================================================

fn load_recipe(name: &str) -> Result<String, Box<dyn Error>> {
    match name {
        "clean" => Ok(RECIPE_CLEAN.to_string()),
        "noisy" => Ok(RECIPE_NOISY.to_string()),
        "us_mains" => Ok(RECIPE_US_MAINS.to_string()),
        "tachycardia" => Ok(RECIPE_TACHYCARDIA.to_string()),
        _ => Err(format!(
            "Unknown recipe '{}'. Available recipes: clean, noisy, us_mains, tachycardia",
            name
        )
        .into()),
    }
}

fn check_sample_rate(detector: &DetectorConfig, sample_rate: f64) -> Result<(), Box<dyn Error>> {
    let detector_rate = match detector {
        DetectorConfig::PanTompkins(cfg) => cfg.sample_rate,
        DetectorConfig::Engzee(cfg) => cfg.sample_rate,
    };
    if detector_rate != sample_rate {
        return Err(format!(
            "detector sample rate {} Hz does not match signal sample rate {} Hz",
            detector_rate, sample_rate
        )
        .into());
    }
    Ok(())
}

fn build_detector(
    detector: &DetectorConfig,
) -> Result<(String, Box<dyn RealTimeDetector>), Box<dyn Error>> {
    match detector {
        DetectorConfig::PanTompkins(cfg) => Ok((
            format!(
                "Pan-Tompkins {:.0}-{:.0} Hz, refractory {:.2}s",
                cfg.band.0, cfg.band.1, cfg.refractory_secs
            ),
            Box::new(PanTompkinsRealTime::with_config(*cfg)?),
        )),
        DetectorConfig::Engzee(cfg) => Ok((
            format!(
                "Engelse-Zeelenberg notch {:.0}-{:.0} Hz, threshold {:.4}s",
                cfg.notch.0, cfg.notch.1, cfg.threshold_secs
            ),
            Box::new(EngZeeRealTime::with_config(*cfg)?),
        )),
    }
}

// ============================================================================
// Signal Generation
// ============================================================================

fn generate_signal(config: &SignalConfig) -> (Vec<f64>, Vec<usize>) {
    let samples = (config.duration * config.sample_rate) as usize;
    let (mut signal, truth) = common::ecg_like(samples, config.sample_rate, config.heart_rate);

    if config.noise_amplitude > 0.0 {
        let noise = common::white_noise(samples, config.noise_amplitude, config.noise_seed);
        common::add(&mut signal, &noise);
    }
    if let Some(mains) = &config.mains {
        let hum = common::sine_wave(samples, config.sample_rate, mains.frequency, mains.amplitude);
        common::add(&mut signal, &hum);
    }

    (signal, truth)
}

// ============================================================================
// CSV Export
// ============================================================================

fn write_csv(runs: &[Run], config: &ExploreConfig) -> Result<(), Box<dyn Error>> {
    let mut file = fs::File::create(&config.output.csv_path)?;

    writeln!(file, "detector,sample,time_ms")?;
    let dt = 1000.0 / config.signal.sample_rate;
    for (idx, run) in runs.iter().enumerate() {
        writeln!(file, "# {}: {}", idx, run.name)?;
        for &p in &run.peaks {
            writeln!(file, "{},{},{:.3}", idx, p, p as f64 * dt)?;
        }
    }

    Ok(())
}

// ============================================================================
// Plotting
// ============================================================================

fn generate_plot(
    signal: &[f64],
    truth: &[usize],
    runs: &[Run],
    config: &ExploreConfig,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(&config.output.plot_path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let panels = root.split_evenly((runs.len().max(1), 1));

    // Plot the first 5s of data
    let sample_rate = config.signal.sample_rate;
    let shown = ((5.0 * sample_rate) as usize).min(signal.len());

    for (panel, run) in panels.iter().zip(runs) {
        plot_run(panel, &signal[..shown], truth, run, sample_rate)?;
    }

    root.present()?;
    Ok(())
}

fn plot_run(
    panel: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    signal: &[f64],
    truth: &[usize],
    run: &Run,
    sample_rate: f64,
) -> Result<(), Box<dyn Error>> {
    let shown = signal.len();
    if shown == 0 {
        return Ok(());
    }
    let to_secs = |i: usize| i as f64 / sample_rate;

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &val in signal {
        y_min = y_min.min(val);
        y_max = y_max.max(val);
    }
    let margin = (y_max - y_min) * 0.1;
    y_min -= margin;
    y_max += margin;

    let mut chart = ChartBuilder::on(panel)
        .caption(&run.name, ("sans-serif", 18))
        .margin(15)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..to_secs(shown - 1), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Amplitude")
        .draw()?;

    chart.draw_series(LineSeries::new(
        signal.iter().enumerate().map(|(i, &v)| (to_secs(i), v)),
        BLUE.stroke_width(1),
    ))?;

    chart.draw_series(
        truth
            .iter()
            .filter(|&&p| p < shown)
            .map(|&p| Cross::new((to_secs(p), y_max - margin / 2.0), 4, BLACK.stroke_width(1))),
    )?;
    chart.draw_series(
        run.peaks
            .iter()
            .filter(|&&p| p < shown)
            .map(|&p| Circle::new((to_secs(p), signal[p]), 4, RED.filled())),
    )?;

    Ok(())
}
