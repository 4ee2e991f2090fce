//! File I/O for spectral modeling synthesis.
//!
//! This crate provides:
//!
//! - **Model files**: [`ModelWriter`] and [`ModelReader`] for the binary
//!   analysis format, with O(1) random access to frames
//! - **WAV files**: [`read_wav`] and [`write_wav`] via `hound`
//! - **AIFF files**: [`read_aiff`] and [`write_aiff`]
//! - **Streaming output**: [`SoundWriter`] writes either container block by
//!   block
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sms_io::{ModelReader, SoundFormat, SoundWriter};
//!
//! let mut reader = ModelReader::open("voice.sms")?;
//! println!("{} frames at {} Hz", reader.header().frame_count, reader.header().frame_rate);
//!
//! let mut writer = SoundWriter::create("voice.aiff", SoundFormat::Aiff, 44100)?;
//! writer.write(&[0.0; 512])?;
//! writer.finalize()?;
//! ```

mod aiff;
mod container;
mod model;
mod wav;

pub use aiff::{AiffWriter, read_aiff, write_aiff};
pub use container::{OUTPUT_BITS, SoundFormat, SoundWriter, read_sound};
pub use model::{ModelReader, ModelWriter, read_model, write_model};
pub use wav::{WavSpec, read_wav, write_wav};

/// Error types for model and sound file operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Model data error.
    #[error(transparent)]
    Core(#[from] sms_core::Error),

    /// The file does not start with the model magic number.
    #[error("not a model file: magic {found}, expected {}", sms_core::MODEL_MAGIC)]
    BadMagic {
        /// Magic number found in the file.
        found: i32,
    },

    /// A header field is out of range or inconsistent with the others.
    #[error("bad model header: {0}")]
    BadHeader(String),

    /// A frame index past the end of the model.
    #[error("frame {index} out of range (model has {count})")]
    FrameOutOfRange {
        /// Requested frame.
        index: usize,
        /// Frames in the model.
        count: usize,
    },

    /// The sound container cannot be read or written.
    #[error("unsupported sound container: {0}")]
    UnsupportedContainer(String),
}

/// Convenience result type for file operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Convert into a core error for [`FrameSource`](sms_core::FrameSource)
    /// implementations.
    pub fn into_core(self) -> sms_core::Error {
        match self {
            Error::Core(e) => e,
            other => sms_core::Error::from_source(other),
        }
    }
}
