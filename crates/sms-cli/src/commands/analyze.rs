//! Analysis of a sound file into a model file.

use crate::commands::common::{format_duration, load_profile};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use sms_analysis::AnalysisSession;
use sms_io::{read_sound, write_model};
use std::path::PathBuf;
use std::time::Duration;

/// Analyze a sound file.
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input sound file (WAV or AIFF)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output model file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Profile file (TOML); flags override its [analysis] table
    #[arg(long, value_name = "PROFILE")]
    config: Option<PathBuf>,

    /// Frames per second
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    frame_rate: Option<u32>,

    /// Tracks stored per frame
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    tracks: Option<u64>,

    /// Stochastic representation (none, approx, ifft)
    #[arg(long)]
    stochastic: Option<String>,

    /// Track format (harmonic, inharmonic, harmonic-phase, inharmonic-phase)
    #[arg(long)]
    format: Option<String>,

    /// Analysis window (hamming, blackman-harris-62/70/74/92, hann)
    #[arg(long)]
    window: Option<String>,
}

/// Run the analyze command.
pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut profile = load_profile(args.config.as_deref())?;
    let analysis = &mut profile.analysis;
    if let Some(rate) = args.frame_rate {
        analysis.frame_rate = rate;
    }
    if let Some(tracks) = args.tracks {
        analysis.tracks = tracks as usize;
    }
    if let Some(stochastic) = args.stochastic {
        analysis.stochastic = stochastic;
    }
    if let Some(format) = args.format {
        analysis.format = format;
    }
    if let Some(window) = args.window {
        analysis.window = window;
    }

    println!("Reading {}...", args.input.display());
    let (samples, sample_rate) = read_sound(&args.input)?;
    println!(
        "  {} samples, {} Hz, {}",
        samples.len(),
        sample_rate,
        format_duration(samples.len(), sample_rate)
    );

    let params = profile.analysis.to_params(sample_rate)?;
    tracing::info!(
        frame_rate = params.frame_rate,
        hop = params.hop_size(),
        tracks = params.tracks,
        format = %params.format,
        stochastic = %params.stochastic,
        "analyzing"
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed_precise}]")?);
    spinner.set_message("analyzing");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let model = AnalysisSession::new(params)?.analyze(&samples);
    spinner.finish_and_clear();
    let model = model?;

    write_model(&args.output, &model)?;
    println!(
        "Wrote {} ({} frames, {} tracks, residual {:.1}%)",
        args.output.display(),
        model.header.frame_count,
        model.header.tracks,
        model.header.residual_percentage
    );
    Ok(())
}
