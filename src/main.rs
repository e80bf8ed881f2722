use anyhow::Result;
use clap::Parser;
use log::info;

use hydration_ecg::config::Args;
use hydration_ecg::{data_loading, output, preprocessing};

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    let args = Args::parse();
    args.validate()?;

    let files = data_loading::find_subject_files(&args.data_root, args.subject)?;
    info!(
        "Found {} ExG file(s) for Subject{}",
        files.len(),
        args.subject
    );

    let recording = preprocessing::stitch_recordings(&files, args.channel, args.sample_rate)?;
    let window = preprocessing::last_minutes(&recording, args.last_min);

    let title = output::plot_title(args.subject, args.last_min, args.sample_rate);
    let plot_path = args.output_path();
    output::plot_time(&window, &title, &plot_path)?;

    println!(
        "{}",
        output::summary_line(args.subject, recording.duration_secs(), args.last_min)
    );
    info!("Plot written to {}", plot_path.display());

    Ok(())
}
