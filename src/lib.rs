pub mod config;
pub mod data_loading;
pub mod filters;
pub mod output;
pub mod preprocessing;

/// ExG sampling rate in Hz
pub const FS_EXG: u32 = 250;
/// Column holding the ExG signal (0-based)
pub const CH_EXG: usize = 1;

/// A continuous, preprocessed ECG series with its time axis in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub time: Vec<f64>,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Recording {
    /// Build a recording whose time axis starts at zero and advances by `1 / sample_rate`.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        let fs = sample_rate as f64;
        let time = (0..samples.len()).map(|i| i as f64 / fs).collect();
        Self {
            time,
            samples,
            sample_rate,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
