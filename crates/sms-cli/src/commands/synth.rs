//! Resynthesis of a model file.

use crate::commands::common::{format_duration, load_profile, sample_progress};
use clap::Args;
use sms_io::{ModelReader, SoundFormat, SoundWriter};
use sms_synth::{
    DeterministicMethod, MAX_HOP_SIZE, MIN_HOP_SIZE, ResynthesisScheduler, SynthesisConfig,
    SynthesisMode, Synthesizer,
};
use std::path::PathBuf;

/// Resynthesize a model file.
///
/// `-h` selects the hop, so help is only available as `--help`.
#[derive(Args)]
pub struct SynthArgs {
    /// Input model file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output sound file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Output sample rate in Hz (default: the model's rate)
    #[arg(short = 'r', value_name = "RATE", value_parser = clap::value_parser!(u32).range(1..))]
    rate: Option<u32>,

    /// Synthesis mode: 0 all, 1 deterministic, 2 stochastic
    #[arg(short = 's', value_name = "MODE", value_parser = clap::value_parser!(u8).range(0..=2))]
    mode: Option<u8>,

    /// Deterministic method: 1 inverse transform, 2 oscillator bank
    #[arg(short = 'd', value_name = "METHOD", value_parser = clap::value_parser!(u8).range(1..=2))]
    method: Option<u8>,

    /// Output hop size, rounded up to a power of two
    #[arg(
        short = 'h',
        value_name = "HOP",
        value_parser = clap::value_parser!(u64).range(MIN_HOP_SIZE as u64..=MAX_HOP_SIZE as u64)
    )]
    hop: Option<u64>,

    /// Time-stretch factor
    #[arg(short = 't', value_name = "FACTOR", value_parser = parse_positive)]
    time_stretch: Option<f32>,

    /// Stochastic gain multiplier
    #[arg(short = 'g', value_name = "GAIN", value_parser = parse_non_negative)]
    gain: Option<f32>,

    /// Transposition in semitones
    #[arg(short = 'x', value_name = "SEMITONES", allow_negative_numbers = true)]
    transpose: Option<f32>,

    /// Output container: 0 wav, 1 aiff (default: from the extension)
    #[arg(short = 'f', value_name = "FORMAT", value_parser = clap::value_parser!(u8).range(0..=1))]
    format: Option<u8>,

    /// Frame interpolation: 0 nearest frame, 1 interpolate
    #[arg(short = 'i', value_name = "0|1", value_parser = clap::value_parser!(u8).range(0..=1))]
    interpolate: Option<u8>,

    /// Profile file (TOML); flags override its [synthesis] table
    #[arg(long, value_name = "PROFILE")]
    config: Option<PathBuf>,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,
}

fn parse_positive(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(format!("{v} must be positive"))
    }
}

fn parse_non_negative(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(format!("{v} must not be negative"))
    }
}

impl SynthArgs {
    /// Profile settings with the command-line flags applied on top.
    fn config(&self) -> anyhow::Result<SynthesisConfig> {
        let mut config = load_profile(self.config.as_deref())?
            .synthesis
            .to_config()?;
        if let Some(rate) = self.rate {
            config.sample_rate = Some(rate);
        }
        if let Some(code) = self.mode {
            config.mode = SynthesisMode::from_code(code)
                .ok_or_else(|| anyhow::anyhow!("unknown synthesis mode {code}"))?;
        }
        if let Some(code) = self.method {
            config.deterministic = DeterministicMethod::from_code(code)
                .ok_or_else(|| anyhow::anyhow!("unknown deterministic method {code}"))?;
        }
        if let Some(hop) = self.hop {
            config.hop_size = hop as usize;
        }
        if let Some(factor) = self.time_stretch {
            config.time_stretch = factor;
        }
        if let Some(gain) = self.gain {
            config.stochastic_gain = gain;
        }
        if let Some(semitones) = self.transpose {
            config.transpose = semitones;
        }
        if let Some(flag) = self.interpolate {
            config.interpolate = flag == 1;
        }
        config.validate()?;
        Ok(config)
    }

    fn sound_format(&self) -> anyhow::Result<SoundFormat> {
        match self.format {
            Some(code) => SoundFormat::from_code(code)
                .ok_or_else(|| anyhow::anyhow!("unknown output format {code}")),
            None => Ok(SoundFormat::from_path(&self.output).unwrap_or_default()),
        }
    }
}

/// Run the synth command.
pub fn run(args: SynthArgs, verbose: bool) -> anyhow::Result<()> {
    let config = args.config()?;
    let format = args.sound_format()?;

    let mut reader = ModelReader::open(&args.input)?;
    let header = reader.header().clone();
    if verbose {
        println!("Model:       {}", args.input.display());
        println!("Format:      {}", header.format);
        println!("Frames:      {} at {} fps", header.frame_count, header.frame_rate);
        println!("Tracks:      {}", header.tracks);
        println!(
            "Stochastic:  {} ({} coefficients)",
            header.stochastic, header.stochastic_coefficients
        );
        println!("Sample Rate: {} Hz", header.sample_rate);
        if !header.text.is_empty() {
            println!("Analysis:    {}", header.text);
        }
    }

    let scheduler = ResynthesisScheduler::new(&header, &config);
    let mut synth = Synthesizer::new(&header, &config)?;
    let total = scheduler.output_sample_count();
    tracing::info!(
        output = %args.output.display(),
        format = %format,
        sample_rate = synth.sample_rate(),
        hop = synth.hop_size(),
        mode = %config.mode,
        method = %config.deterministic,
        "synthesizing {}",
        format_duration(total, synth.sample_rate())
    );

    let mut writer = SoundWriter::create(&args.output, format, synth.sample_rate())?;
    let pb = sample_progress(total as u64)?;
    let written = scheduler.run(&mut reader, &mut synth, |block| {
        writer.write(block).map_err(sms_io::Error::into_core)?;
        pb.inc(block.len() as u64);
        Ok(())
    })?;
    pb.finish_and_clear();
    writer.finalize()?;

    println!(
        "Wrote {} ({} samples, {} Hz, {})",
        args.output.display(),
        written,
        synth.sample_rate(),
        format_duration(written, synth.sample_rate())
    );
    Ok(())
}
