//! Sound container selection and streaming output.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;
use std::str::FromStr;

use hound::WavWriter;

use crate::aiff::{AiffWriter, read_aiff_from};
use crate::wav::{WavSpec, read_wav, write_samples};
use crate::{Error, Result};

/// Bit depth of written sound files.
pub const OUTPUT_BITS: u16 = 16;

/// Sound file container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoundFormat {
    /// RIFF WAVE.
    #[default]
    Wav,
    /// Audio Interchange File Format.
    Aiff,
}

impl SoundFormat {
    /// Command-line code (`-f`): 0 for WAV, 1 for AIFF.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SoundFormat::Wav),
            1 => Some(SoundFormat::Aiff),
            _ => None,
        }
    }

    /// Command-line code.
    pub fn code(self) -> u8 {
        match self {
            SoundFormat::Wav => 0,
            SoundFormat::Aiff => 1,
        }
    }

    /// Container implied by a file extension, if any.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "wav" | "wave" => Some(SoundFormat::Wav),
            "aif" | "aiff" => Some(SoundFormat::Aiff),
            _ => None,
        }
    }

    /// Short name.
    pub fn name(self) -> &'static str {
        match self {
            SoundFormat::Wav => "wav",
            SoundFormat::Aiff => "aiff",
        }
    }
}

impl fmt::Display for SoundFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SoundFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(SoundFormat::Wav),
            "aiff" | "aif" => Ok(SoundFormat::Aiff),
            _ => Err(format!("unknown sound format '{s}'")),
        }
    }
}

/// Average interleaved channels into one.
pub(crate) fn mix_to_mono(samples: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels > 1 {
        samples
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    }
}

/// Read a mono sound file of either container, detected from its first
/// bytes. Returns the samples and their rate.
pub fn read_sound<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32)> {
    let path = path.as_ref();
    let mut magic = [0u8; 4];
    File::open(path)?.read_exact(&mut magic)?;
    match &magic {
        b"RIFF" => {
            let (samples, spec) = read_wav(path)?;
            Ok((samples, spec.sample_rate))
        }
        b"FORM" => read_aiff_from(BufReader::new(File::open(path)?)),
        _ => Err(Error::UnsupportedContainer(format!(
            "{} is neither WAV nor AIFF",
            path.display()
        ))),
    }
}

/// Mono 16-bit sound file written block by block.
pub enum SoundWriter {
    /// WAV output.
    Wav(WavWriter<BufWriter<File>>),
    /// AIFF output.
    Aiff(AiffWriter<BufWriter<File>>),
}

impl SoundWriter {
    /// Create a sound file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, format: SoundFormat, sample_rate: u32) -> Result<Self> {
        Ok(match format {
            SoundFormat::Wav => {
                let spec = WavSpec {
                    channels: 1,
                    sample_rate,
                    bits_per_sample: OUTPUT_BITS,
                };
                SoundWriter::Wav(WavWriter::create(path, hound::WavSpec::from(spec))?)
            }
            SoundFormat::Aiff => SoundWriter::Aiff(AiffWriter::create(path, sample_rate)?),
        })
    }

    /// Append samples.
    pub fn write(&mut self, samples: &[f32]) -> Result<()> {
        match self {
            SoundWriter::Wav(writer) => write_samples(writer, samples, OUTPUT_BITS),
            SoundWriter::Aiff(writer) => writer.write(samples),
        }
    }

    /// Complete the file.
    pub fn finalize(self) -> Result<()> {
        match self {
            SoundWriter::Wav(writer) => writer.finalize()?,
            SoundWriter::Aiff(writer) => {
                writer.finalize()?;
            }
        }
        Ok(())
    }
}
