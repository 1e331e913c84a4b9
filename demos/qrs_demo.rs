//! Runs both real-time detectors and their batch counterparts on a synthetic
//! ECG with noise and mains hum, then plots the detections.
//!
//! Run with:
//!   cargo run --example qrs_demo

mod common;

use plotters::prelude::*;
use qrstream::{
    offline, EngZeeConfig, EngZeeRealTime, PanTompkinsConfig, PanTompkinsRealTime,
    RealTimeDetector,
};
use std::error::Error;
use std::fs;
use std::io::Write;

const SAMPLE_RATE: f64 = 360.0;
const DURATION_SECS: f64 = 20.0;
const HEART_RATE: f64 = 75.0;
const PLOT_PATH: &str = "output/qrs_demo.png";
const CSV_PATH: &str = "output/qrs_demo.csv";

fn main() -> Result<(), Box<dyn Error>> {
    println!("=== qrstream QRS Detection Demo ===\n");

    let samples = (DURATION_SECS * SAMPLE_RATE) as usize;
    let (mut signal, truth) = common::ecg_like(samples, SAMPLE_RATE, HEART_RATE);
    common::add(&mut signal, &common::white_noise(samples, 0.03, 42));
    common::add(&mut signal, &common::sine_wave(samples, SAMPLE_RATE, 50.0, 0.1));

    println!("Signal: {:.0}s at {:.0} Hz, {} beats", DURATION_SECS, SAMPLE_RATE, truth.len());
    println!();

    let mut pan_tompkins = PanTompkinsRealTime::new(SAMPLE_RATE)?;
    let mut engzee = EngZeeRealTime::new(SAMPLE_RATE)?;
    let pt_peaks = pan_tompkins.process_block(&signal);
    let ez_peaks = engzee.process_block(&signal);

    let pt_batch = offline::pan_tompkins(&signal, &PanTompkinsConfig::new(SAMPLE_RATE))?;
    let ez_batch = offline::engzee(&signal, &EngZeeConfig::new(SAMPLE_RATE))?;

    // Pan-Tompkins reports peaks of the integrated signal, which lag the R wave
    let tolerance = (0.15 * SAMPLE_RATE) as usize;
    for (name, live, batch, warm_up) in [
        ("Pan-Tompkins", &pt_peaks, &pt_batch, pan_tompkins.warm_up()),
        ("Engelse-Zeelenberg", &ez_peaks, &ez_batch, engzee.warm_up()),
    ] {
        let score = common::score(live, &truth, tolerance);
        println!("{name}");
        println!("  Warm-up:      {warm_up} samples");
        println!("  Detections:   {}", live.len());
        println!("  Sensitivity:  {:.3}", score.sensitivity());
        println!("  Precision:    {:.3}", score.precision());
        println!("  Batch agrees: {}", live == batch);
        println!();
    }

    if let Some(parent) = std::path::Path::new(PLOT_PATH).parent() {
        fs::create_dir_all(parent)?;
    }
    write_csv(&signal, &pt_peaks, &ez_peaks)?;
    generate_plot(&signal, &truth, &pt_peaks, &ez_peaks)?;

    println!("Done!");
    println!("  Plot: {}", PLOT_PATH);
    println!("  CSV: {}", CSV_PATH);
    Ok(())
}

fn write_csv(signal: &[f64], pt_peaks: &[usize], ez_peaks: &[usize]) -> Result<(), Box<dyn Error>> {
    let mut file = fs::File::create(CSV_PATH)?;
    writeln!(file, "sample,time_ms,value,pan_tompkins,engzee")?;

    let dt = 1000.0 / SAMPLE_RATE;
    for (i, x) in signal.iter().enumerate() {
        let pt = pt_peaks.binary_search(&i).is_ok() as u8;
        let ez = ez_peaks.binary_search(&i).is_ok() as u8;
        writeln!(file, "{},{:.3},{:.6},{},{}", i, i as f64 * dt, x, pt, ez)?;
    }
    Ok(())
}

fn generate_plot(
    signal: &[f64],
    truth: &[usize],
    pt_peaks: &[usize],
    ez_peaks: &[usize],
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(PLOT_PATH, (1400, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    // First five seconds
    let shown = ((5.0 * SAMPLE_RATE) as usize).min(signal.len());
    let to_secs = |i: usize| i as f64 / SAMPLE_RATE;

    let (y_min, y_max) = signal[..shown]
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
    let margin = (y_max - y_min) * 0.1;

    let mut chart = ChartBuilder::on(&root)
        .caption("QRS detections", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..to_secs(shown), (y_min - margin)..(y_max + margin))?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Amplitude")
        .draw()?;

    chart.draw_series(LineSeries::new(
        signal[..shown].iter().enumerate().map(|(i, &x)| (to_secs(i), x)),
        BLUE.stroke_width(1),
    ))?;

    let markers = [
        (truth, &BLACK, "R peak", 0.0),
        (pt_peaks, &RED, "Pan-Tompkins", 0.08),
        (ez_peaks, &GREEN, "Engelse-Zeelenberg", 0.16),
    ];
    for (peaks, color, label, lift) in markers {
        chart
            .draw_series(
                peaks
                    .iter()
                    .filter(|&&p| p < shown)
                    .map(|&p| Circle::new((to_secs(p), y_max + lift * margin * 5.0), 4, color.filled())),
            )?
            .label(label)
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
