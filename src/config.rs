use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::filters::MAINS_FREQ;
use crate::output::format_minutes;

/// Research data loader (ECG hydration study)
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Root folder containing Subject*/
    #[arg(long, env = "HYDRATION_DATA_ROOT", default_value = "Data")]
    pub data_root: PathBuf,

    /// Subject ID (e.g., 10, 11, 12, 13)
    #[arg(long)]
    pub subject: u32,

    /// Plot last N minutes
    #[arg(long, default_value = "5.0")]
    pub last_min: f64,

    /// CSV column holding the ExG signal (0-based)
    #[arg(long, default_value_t = crate::CH_EXG)]
    pub channel: usize,

    /// Sampling rate of the ExG recordings in Hz
    #[arg(long, default_value_t = crate::FS_EXG)]
    pub sample_rate: u32,

    /// Plot output file (.svg renders SVG, anything else PNG)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if !self.last_min.is_finite() || self.last_min < 0.0 {
            bail!(
                "--last-min must be a non-negative number of minutes, got {}",
                self.last_min
            );
        }
        // The 60 Hz notch needs the mains frequency below Nyquist
        if self.sample_rate as f64 <= 2.0 * MAINS_FREQ {
            bail!(
                "--sample-rate must be above {} Hz, got {}",
                2.0 * MAINS_FREQ,
                self.sample_rate
            );
        }
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "subject{}_last{}min.png",
                self.subject,
                format_minutes(self.last_min)
            ))
        })
    }
}
