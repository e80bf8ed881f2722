use anyhow::Result;
use log::{debug, info, trace};
use std::path::PathBuf;

use crate::{data_loading, filters, Recording};

/// Apply the 60 Hz notch, FIR bandpass and baseline removal, then normalize to 0..1.
pub fn preprocess_signal(raw: &[f64], sample_rate: u32) -> Vec<f32> {
    let mut x = raw.to_vec();
    for (i, stage) in filters::ecg_chain(sample_rate as f64).iter().enumerate() {
        x = stage.apply(&x);
        trace!("stage {} done, {} samples", i, x.len());
    }
    normalize(&x)
}

/// Min-max scale to 0..1, ignoring NaN when finding the range.
///
/// A flat series (or one with no usable values) maps to all zeros.
pub fn normalize(data: &[f64]) -> Vec<f32> {
    let (min_val, max_val) = data
        .iter()
        .filter(|x| !x.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });

    if max_val > min_val {
        let range = max_val - min_val;
        data.iter()
            .map(|&x| ((x - min_val) / range) as f32)
            .collect()
    } else {
        vec![0.0; data.len()]
    }
}

/// Read and preprocess each file on its own, then join them back to back in time.
pub fn stitch_recordings(files: &[PathBuf], channel: usize, sample_rate: u32) -> Result<Recording> {
    let mut samples = Vec::new();

    for path in files {
        info!("Loading file: {}", path.display());
        let raw = data_loading::read_exg_column(path, channel)?;
        let processed = preprocess_signal(&raw, sample_rate);
        debug!(
            "{}: {:.1} s after preprocessing",
            path.display(),
            processed.len() as f64 / sample_rate as f64
        );
        samples.extend(processed);
    }

    Ok(Recording::from_samples(samples, sample_rate))
}

/// Keep the trailing `minutes` of a recording with time re-zeroed at the window start.
///
/// Recordings no longer than the window, and windows shorter than one sample,
/// come back unchanged.
pub fn last_minutes(recording: &Recording, minutes: f64) -> Recording {
    let n_win = (minutes * 60.0 * recording.sample_rate as f64) as usize;
    let len = recording.len();
    if n_win == 0 || len <= n_win {
        return recording.clone();
    }

    let start = len - n_win;
    let t0 = recording.time[start];
    Recording {
        time: recording.time[start..].iter().map(|t| t - t0).collect(),
        samples: recording.samples[start..].to_vec(),
        sample_rate: recording.sample_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_spans_unit_range() {
        let y = normalize(&[2.0, 4.0, 3.0, 6.0]);
        assert_eq!(y, vec![0.0, 0.5, 0.25, 1.0]);
    }

    #[test]
    fn flat_input_normalizes_to_zeros() {
        assert_eq!(normalize(&[7.5; 4]), vec![0.0; 4]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn normalize_skips_nan_for_range() {
        let y = normalize(&[0.0, f64::NAN, 10.0, 5.0]);
        assert_eq!(y[0], 0.0);
        assert!(y[1].is_nan());
        assert_eq!(y[2], 1.0);
        assert_eq!(y[3], 0.5);

        assert_eq!(normalize(&[f64::NAN, f64::NAN]), vec![0.0, 0.0]);
    }

    #[test]
    fn trailing_minutes_slice_rezeroes_time() {
        let rec = Recording::from_samples((0..250 * 180).map(|i| i as f32).collect(), 250);
        let win = last_minutes(&rec, 1.0);

        assert_eq!(win.len(), 250 * 60);
        assert_eq!(win.time[0], 0.0);
        assert_eq!(win.samples[0], (250 * 120) as f32);
        assert_eq!(*win.samples.last().unwrap(), (250 * 180 - 1) as f32);
        assert!((win.time[250] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fractional_minutes_truncate_to_whole_samples() {
        let rec = Recording::from_samples(vec![0.0; 1000], 250);
        // 0.01 min = 150 samples
        assert_eq!(last_minutes(&rec, 0.01).len(), 150);
    }

    #[test]
    fn short_recording_returns_full_series() {
        let rec = Recording::from_samples(vec![0.1, 0.2, 0.3], 250);
        assert_eq!(last_minutes(&rec, 5.0), rec);
        assert_eq!(last_minutes(&rec, 0.0), rec);
    }

    #[test]
    fn preprocess_output_is_normalized() {
        let fs = 250;
        let raw: Vec<f64> = (0..fs as usize * 10)
            .map(|i| {
                let t = i as f64 / fs as f64;
                // Slow drift, 10 Hz content and mains hum
                0.5 * t
                    + (2.0 * std::f64::consts::PI * 10.0 * t).sin()
                    + 0.3 * (2.0 * std::f64::consts::PI * 60.0 * t).sin()
            })
            .collect();

        let y = preprocess_signal(&raw, fs);
        assert_eq!(y.len(), raw.len());
        let lo = y.iter().cloned().fold(f32::INFINITY, f32::min);
        let hi = y.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 1.0);
    }
}
