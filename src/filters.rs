use log::trace;
use sci_rs::signal::filter::{design::Sos, sosfiltfilt_dyn};
use std::f64::consts::PI;

/// Mains interference frequency in Hz
pub const MAINS_FREQ: f64 = 60.0;

/// Quality factor of the mains notch (bandwidth = w0 / 35)
pub const NOTCH_Q: f64 = 35.0;

/// 55-tap linear-phase FIR bandpass, designed for 250 Hz (`a = [1]`)
pub const BANDPASS_TAPS: [f64; 55] = [
    -0.000187830184206340,
    -0.000205456041853291,
    -8.64057295452613e-05,
    0.000234938106149921,
    0.000787322828783533,
    0.00153305158366326,
    0.00234705727203288,
    0.00301420392436277,
    0.00325208908216934,
    0.00276166534082112,
    0.00130116641212287,
    -0.00122845080648299,
    -0.00470423015041083,
    -0.00872851920245046,
    -0.0126215652355866,
    -0.0154716371701053,
    -0.0162444264117259,
    -0.0139408664255059,
    -0.00778038794719607,
    0.00262217964633411,
    0.0171209674455062,
    0.0349757093199774,
    0.0548809558645369,
    0.0750922598049386,
    0.0936356537755463,
    0.108570111841377,
    0.118261039548750,
    0.121618807015993,
    0.118261039548750,
    0.108570111841377,
    0.0936356537755463,
    0.0750922598049386,
    0.0548809558645369,
    0.0349757093199774,
    0.0171209674455062,
    0.00262217964633411,
    -0.00778038794719607,
    -0.0139408664255059,
    -0.0162444264117259,
    -0.0154716371701053,
    -0.0126215652355866,
    -0.00872851920245046,
    -0.00470423015041083,
    -0.00122845080648299,
    0.00130116641212287,
    0.00276166534082112,
    0.00325208908216934,
    0.00301420392436277,
    0.00234705727203288,
    0.00153305158366326,
    0.000787322828783533,
    0.000234938106149921,
    -8.64057295452613e-05,
    -0.000205456041853291,
    -0.000187830184206340,
];

/// First-order baseline removal: a DC-blocking differentiator with a pole at 0.9
pub const BASELINE_B: [f64; 2] = [1.0, -1.0];
pub const BASELINE_A: [f64; 2] = [1.0, -0.9];

/// Shortest input handed to `sosfiltfilt_dyn` for a single section; its
/// odd extension needs more samples than the padding it adds.
const SOS_MIN_LEN: usize = 3 * 3 + 1;

/// Design a second-order IIR notch filter.
///
/// Parameters:
/// - freq: Frequency to remove, in the same units as `fs`. Must satisfy 0 < freq < fs / 2.
/// - q: Quality factor, the ratio of the center frequency to the -3 dB bandwidth.
/// - fs: The sampling frequency of the digital system.
///
/// Returns `(b, a)` with `a[0] == 1`.
pub fn design_notch(freq: f64, q: f64, fs: f64) -> ([f64; 3], [f64; 3]) {
    assert!(fs > 0.0, "fs must be positive");
    assert!(q > 0.0, "q must be positive");

    // Normalize so that 1.0 is Nyquist
    let w0 = 2.0 * freq / fs;
    assert!(w0 > 0.0 && w0 < 1.0, "freq should be such that 0 < freq < fs/2");

    let bw = (w0 / q) * PI;
    let w0 = w0 * PI;

    let beta = (bw / 2.0).tan();
    let gain = 1.0 / (1.0 + beta);

    let b = [gain, -2.0 * gain * w0.cos(), gain];
    let a = [1.0, -2.0 * gain * w0.cos(), 2.0 * gain - 1.0];
    (b, a)
}

/// One zero-phase stage of the filter chain
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// A single biquad, run through sci-rs as a second-order section
    Section { b: [f64; 3], a: [f64; 3] },
    /// A general transfer function `b / a`
    Transfer { b: Vec<f64>, a: Vec<f64> },
}

impl Stage {
    pub fn apply(&self, data: &[f64]) -> Vec<f64> {
        match self {
            Stage::Section { b, a } if data.len() >= SOS_MIN_LEN => {
                let sos = vec![Sos::new(*b, *a)];
                sosfiltfilt_dyn(data.iter(), &sos)
            }
            Stage::Section { b, a } => filtfilt(b, a, data),
            Stage::Transfer { b, a } => filtfilt(b, a, data),
        }
    }
}

/// The fixed ECG chain: 60 Hz notch, FIR bandpass, baseline removal.
pub fn ecg_chain(sample_rate: f64) -> Vec<Stage> {
    let (notch_b, notch_a) = design_notch(MAINS_FREQ, NOTCH_Q, sample_rate);
    trace!("notch b={:?} a={:?}", notch_b, notch_a);

    vec![
        Stage::Section {
            b: notch_b,
            a: notch_a,
        },
        Stage::Transfer {
            b: BANDPASS_TAPS.to_vec(),
            a: vec![1.0],
        },
        // Zero-padded to a biquad so the first-order stage runs as a section
        Stage::Section {
            b: [BASELINE_B[0], BASELINE_B[1], 0.0],
            a: [BASELINE_A[0], BASELINE_A[1], 0.0],
        },
    ]
}

/// Pad `b` and `a` to a common length and normalize by `a[0]`.
fn normalize_coeffs(b: &[f64], a: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = b.len().max(a.len());
    let a0 = a[0];
    let mut bn = vec![0.0; n];
    let mut an = vec![0.0; n];
    for (dst, &src) in bn.iter_mut().zip(b) {
        *dst = src / a0;
    }
    for (dst, &src) in an.iter_mut().zip(a) {
        *dst = src / a0;
    }
    (bn, an)
}

/// Direct form II transposed filter with initial state `zi` (`max(len(a), len(b)) - 1` values).
pub fn lfilter(b: &[f64], a: &[f64], data: &[f64], zi: &[f64]) -> Vec<f64> {
    assert!(!a.is_empty() && a[0] != 0.0, "a[0] must be non-zero");
    let (b, a) = normalize_coeffs(b, a);
    let order = b.len() - 1;
    assert_eq!(zi.len(), order, "zi must hold one value per delay");

    let mut z = zi.to_vec();
    let mut out = Vec::with_capacity(data.len());

    for &x in data {
        let y = b[0] * x + z.first().copied().unwrap_or(0.0);
        for k in 0..order {
            let next = if k + 1 < order { z[k + 1] } else { 0.0 };
            z[k] = b[k + 1] * x + next - a[k + 1] * y;
        }
        out.push(y);
    }

    out
}

/// Initial state of `lfilter` for the steady-state step response.
pub fn lfilter_zi(b: &[f64], a: &[f64]) -> Vec<f64> {
    assert!(!a.is_empty() && a[0] != 0.0, "a[0] must be non-zero");
    let (b, a) = normalize_coeffs(b, a);
    let n = b.len();
    if n < 2 {
        return Vec::new();
    }

    // Closed-form solution of zi = A * zi + B for the companion matrix A
    let rhs = |k: usize| b[k] - a[k] * b[0];
    let b_sum: f64 = (1..n).map(rhs).sum();
    let a_sum: f64 = 1.0 + a[1..].iter().sum::<f64>();

    let mut zi = vec![0.0; n - 1];
    zi[0] = b_sum / a_sum;

    let mut asum = 1.0;
    let mut csum = 0.0;
    for k in 1..n - 1 {
        asum += a[k];
        csum += rhs(k);
        zi[k] = asum * zi[0] - csum;
    }

    zi
}

/// Odd extension of `data` by `n` samples on each side.
fn odd_ext(data: &[f64], n: usize) -> Vec<f64> {
    if n == 0 {
        return data.to_vec();
    }
    let len = data.len();
    let first = data[0];
    let last = data[len - 1];

    let mut ext = Vec::with_capacity(len + 2 * n);
    ext.extend((1..=n).rev().map(|i| 2.0 * first - data[i]));
    ext.extend_from_slice(data);
    ext.extend((len - n - 1..len - 1).rev().map(|i| 2.0 * last - data[i]));
    ext
}

/// Zero-phase filtering: forward then backward through `b / a`.
///
/// Edges are handled with an odd extension of `3 * max(len(a), len(b))`
/// samples and steady-state initial conditions. Inputs shorter than the
/// padding are padded with `len - 1` samples instead.
pub fn filtfilt(b: &[f64], a: &[f64], data: &[f64]) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }

    let padlen = (3 * b.len().max(a.len())).min(data.len() - 1);
    let ext = odd_ext(data, padlen);
    let zi = lfilter_zi(b, a);

    let scaled = |v: f64| zi.iter().map(|z| z * v).collect::<Vec<f64>>();

    let forward = lfilter(b, a, &ext, &scaled(ext[0]));
    let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
    let backward = lfilter(b, a, &reversed, &scaled(reversed[0]));

    reversed = backward.into_iter().rev().collect();
    reversed[padlen..reversed.len() - padlen].to_vec()
}
