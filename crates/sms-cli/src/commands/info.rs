//! Display model file headers.

use crate::commands::common::format_duration;
use clap::Args;
use sms_io::ModelReader;

/// Display model file information.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the model file
    pub file: std::path::PathBuf,

    /// Print the header as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let reader = ModelReader::open(&args.file)?;
    let header = reader.header();
    let duration_samples = header.frame_count * header.hop_size();

    if args.json {
        let value = serde_json::json!({
            "file": args.file.display().to_string(),
            "frame_count": header.frame_count,
            "sample_rate": header.sample_rate,
            "frame_rate": header.frame_rate,
            "hop_size": header.hop_size(),
            "format": header.format.name(),
            "tracks": header.tracks,
            "stochastic": header.stochastic.name(),
            "stochastic_coefficients": header.stochastic_coefficients,
            "envelope": header.envelope.name(),
            "envelope_coefficients": header.envelope_coefficients,
            "max_frequency": header.max_frequency,
            "residual_percentage": header.residual_percentage,
            "pre_emphasis": header.pre_emphasis,
            "frame_bytes": header.frame_byte_size(),
            "header_bytes": header.header_byte_size(),
            "text": header.text,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("File:        {}", args.file.display());
    println!("Format:      {}", header.format);
    println!(
        "Frames:      {} at {} fps ({})",
        header.frame_count,
        header.frame_rate,
        format_duration(duration_samples, header.sample_rate)
    );
    println!("Sample Rate: {} Hz", header.sample_rate);
    println!("Tracks:      {}", header.tracks);
    println!(
        "Stochastic:  {} ({} coefficients)",
        header.stochastic, header.stochastic_coefficients
    );
    if header.envelope_coefficients > 0 {
        println!(
            "Envelope:    {} ({} coefficients)",
            header.envelope, header.envelope_coefficients
        );
    }
    println!("Max Freq:    {} Hz", header.max_frequency);
    println!("Residual:    {:.1}%", header.residual_percentage);
    println!("Emphasis:    {}", if header.pre_emphasis { "pre-emphasized" } else { "flat" });
    println!("Frame Size:  {} bytes", header.frame_byte_size());
    if !header.text.is_empty() {
        println!("Analysis:    {}", header.text);
    }
    Ok(())
}
