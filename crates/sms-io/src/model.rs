//! Binary model files.
//!
//! A model file is a fixed-order header of sixteen little-endian 32-bit
//! fields, the header text, and then the frames back to back. Every frame
//! has the same byte size, so frame `i` starts at
//! [`ModelHeader::frame_offset`].
//!
//! | field | type |
//! |-------|------|
//! | magic (767) | i32 |
//! | header byte size | i32 |
//! | frame count | i32 |
//! | frame byte size | i32 |
//! | sampling rate | i32 |
//! | format | i32 |
//! | tracks | i32 |
//! | frame rate | i32 |
//! | stochastic type | i32 |
//! | stochastic coefficients | i32 |
//! | envelope type | i32 |
//! | envelope coefficients | i32 |
//! | highest frequency | i32 |
//! | residual percentage | f32 |
//! | pre-emphasis (0 or 1) | i32 |
//! | text length | i32 |

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use sms_core::{
    EnvelopeType, FIXED_HEADER_BYTES, FrameSource, MODEL_MAGIC, ModelFormat, ModelFrame,
    ModelHeader, SpectralModel, StochasticType, zeroed,
};

use crate::{Error, Result};

/// Header text reserved before reading; longer texts grow as they arrive.
const TEXT_PREALLOC: usize = 4096;

fn to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::BadHeader(format!("{what} {value} does not fit the file format")))
}

fn encode_header(header: &ModelHeader) -> Result<Vec<u8>> {
    let fields = [
        MODEL_MAGIC,
        to_i32(header.header_byte_size(), "header size")?,
        to_i32(header.frame_count, "frame count")?,
        to_i32(header.frame_byte_size(), "frame size")?,
        to_i32(header.sample_rate as usize, "sampling rate")?,
        header.format.code(),
        to_i32(header.tracks, "track count")?,
        to_i32(header.frame_rate as usize, "frame rate")?,
        header.stochastic.code(),
        to_i32(header.stochastic_coefficients, "stochastic coefficient count")?,
        header.envelope.code(),
        to_i32(header.envelope_coefficients, "envelope coefficient count")?,
        to_i32(header.max_frequency as usize, "highest frequency")?,
    ];
    let mut bytes = Vec::with_capacity(header.header_byte_size());
    for field in fields {
        bytes.extend_from_slice(&field.to_le_bytes());
    }
    bytes.extend_from_slice(&header.residual_percentage.to_le_bytes());
    bytes.extend_from_slice(&i32::from(header.pre_emphasis).to_le_bytes());
    bytes.extend_from_slice(&to_i32(header.text.len(), "text length")?.to_le_bytes());
    bytes.extend_from_slice(header.text.as_bytes());
    Ok(bytes)
}

fn decode_header<R: Read>(reader: &mut R) -> Result<ModelHeader> {
    let mut fixed = [0u8; FIXED_HEADER_BYTES];
    reader.read_exact(&mut fixed)?;
    let field = |i: usize| {
        let mut b = [0u8; 4];
        b.copy_from_slice(&fixed[4 * i..4 * i + 4]);
        b
    };
    let int = |i: usize| i32::from_le_bytes(field(i));
    let count = |i: usize, what: &str| {
        usize::try_from(int(i)).map_err(|_| Error::BadHeader(format!("negative {what} {}", int(i))))
    };

    let magic = int(0);
    if magic != MODEL_MAGIC {
        return Err(Error::BadMagic { found: magic });
    }

    let format = ModelFormat::from_code(int(5))
        .ok_or_else(|| Error::BadHeader(format!("unknown format code {}", int(5))))?;
    let stochastic = StochasticType::from_code(int(8))
        .ok_or_else(|| Error::BadHeader(format!("unknown stochastic type {}", int(8))))?;
    let envelope = EnvelopeType::from_code(int(10))
        .ok_or_else(|| Error::BadHeader(format!("unknown envelope type {}", int(10))))?;

    let sample_rate = count(4, "sampling rate")?;
    let frame_rate = count(7, "frame rate")?;
    if sample_rate == 0 || frame_rate == 0 {
        return Err(Error::BadHeader("sampling rate and frame rate must be positive".into()));
    }

    let pre_emphasis = match int(14) {
        0 => false,
        1 => true,
        other => return Err(Error::BadHeader(format!("pre-emphasis flag {other} is not 0 or 1"))),
    };

    let text_len = count(15, "text length")?;
    let header_size = count(1, "header size")?;
    if header_size != FIXED_HEADER_BYTES + text_len {
        return Err(Error::BadHeader(format!(
            "header size {header_size} does not match {} bytes of fields and text",
            FIXED_HEADER_BYTES + text_len
        )));
    }
    // grows with the bytes actually read, so a corrupt length cannot
    // allocate more than the file holds
    let mut text = Vec::new();
    text.try_reserve_exact(text_len.min(TEXT_PREALLOC))
        .map_err(|_| sms_core::Error::Allocation {
            what: "header text",
            len: text_len,
        })?;
    let read = reader.by_ref().take(text_len as u64).read_to_end(&mut text)?;
    if read != text_len {
        return Err(Error::BadHeader(format!(
            "header text truncated: {read} of {text_len} bytes"
        )));
    }

    let header = ModelHeader {
        frame_count: count(2, "frame count")?,
        sample_rate: sample_rate as u32,
        format,
        tracks: count(6, "track count")?,
        frame_rate: frame_rate as u32,
        stochastic,
        stochastic_coefficients: count(9, "stochastic coefficient count")?,
        envelope,
        envelope_coefficients: count(11, "envelope coefficient count")?,
        max_frequency: count(12, "highest frequency")? as u32,
        residual_percentage: f32::from_le_bytes(field(13)),
        pre_emphasis,
        text: String::from_utf8_lossy(&text).into_owned(),
    };

    let frame_size = count(3, "frame size")?;
    if frame_size == 0 || frame_size != header.frame_byte_size() {
        return Err(Error::BadHeader(format!(
            "frame size {frame_size} does not match the layout ({} bytes)",
            header.frame_byte_size()
        )));
    }
    Ok(header)
}

/// Streams frames into a model file.
///
/// The header is written up front with a frame count of zero and rewritten
/// with the real count by [`finalize`](Self::finalize).
pub struct ModelWriter<W: Write + Seek> {
    inner: W,
    header: ModelHeader,
    frames: usize,
    bytes: Vec<u8>,
}

impl ModelWriter<BufWriter<File>> {
    /// Create a model file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, header: ModelHeader) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?), header)
    }
}

impl<W: Write + Seek> ModelWriter<W> {
    /// Start a model in `inner`.
    pub fn new(mut inner: W, mut header: ModelHeader) -> Result<Self> {
        header.frame_count = 0;
        inner.write_all(&encode_header(&header)?)?;
        let bytes = zeroed(header.frame_byte_size(), "frame bytes")?;
        Ok(Self {
            inner,
            header,
            frames: 0,
            bytes,
        })
    }

    /// Header as it will be written.
    pub fn header(&self) -> &ModelHeader {
        &self.header
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> usize {
        self.frames
    }

    /// Append one frame, which must use the header's layout.
    pub fn write_frame(&mut self, frame: &ModelFrame) -> Result<()> {
        let expected = self.header.layout();
        if *frame.layout() != expected {
            return Err(Error::Core(sms_core::Error::SizeMismatch {
                what: "model frame",
                expected: expected.len(),
                actual: frame.layout().len(),
            }));
        }
        for (chunk, value) in self.bytes.chunks_exact_mut(4).zip(frame.as_slice()) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        self.inner.write_all(&self.bytes)?;
        self.frames += 1;
        Ok(())
    }

    /// Rewrite the header with the final frame count and flush.
    pub fn finalize(mut self) -> Result<W> {
        self.header.frame_count = self.frames;
        self.inner.seek(SeekFrom::Start(0))?;
        self.inner.write_all(&encode_header(&self.header)?)?;
        self.inner.seek(SeekFrom::End(0))?;
        self.inner.flush()?;
        tracing::debug!(frames = self.frames, "model file finalized");
        Ok(self.inner)
    }
}

/// Random-access reader of a model file.
pub struct ModelReader<R: Read + Seek> {
    inner: R,
    header: ModelHeader,
    bytes: Vec<u8>,
}

impl ModelReader<BufReader<File>> {
    /// Open the model file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> ModelReader<R> {
    /// Read and validate the header of the model in `inner`.
    pub fn new(mut inner: R) -> Result<Self> {
        inner.seek(SeekFrom::Start(0))?;
        let header = decode_header(&mut inner)?;
        let bytes = zeroed(header.frame_byte_size(), "frame bytes")?;
        Ok(Self {
            inner,
            header,
            bytes,
        })
    }

    /// Model header.
    pub fn header(&self) -> &ModelHeader {
        &self.header
    }

    /// Read frame `index` into `frame`.
    ///
    /// `frame` must use the header's layout.
    pub fn read_frame_into(&mut self, index: usize, frame: &mut ModelFrame) -> Result<()> {
        if index >= self.header.frame_count {
            return Err(Error::FrameOutOfRange {
                index,
                count: self.header.frame_count,
            });
        }
        if *frame.layout() != self.header.layout() {
            return Err(Error::Core(sms_core::Error::SizeMismatch {
                what: "model frame",
                expected: self.header.layout().len(),
                actual: frame.layout().len(),
            }));
        }
        self.inner
            .seek(SeekFrom::Start(self.header.frame_offset(index)))?;
        self.inner.read_exact(&mut self.bytes)?;
        for (value, chunk) in frame.as_mut_slice().iter_mut().zip(self.bytes.chunks_exact(4)) {
            let mut b = [0u8; 4];
            b.copy_from_slice(chunk);
            *value = f32::from_le_bytes(b);
        }
        Ok(())
    }

    /// Read every frame into memory.
    pub fn into_model(mut self) -> Result<SpectralModel> {
        let layout = self.header.layout();
        let mut frames = Vec::with_capacity(self.header.frame_count);
        for i in 0..self.header.frame_count {
            let mut frame = ModelFrame::new(layout)?;
            self.read_frame_into(i, &mut frame)?;
            frames.push(frame);
        }
        Ok(SpectralModel::new(self.header, frames))
    }
}

impl<R: Read + Seek> FrameSource for ModelReader<R> {
    fn header(&self) -> &ModelHeader {
        &self.header
    }

    fn read_frame(&mut self, index: usize, frame: &mut ModelFrame) -> sms_core::Result<()> {
        self.read_frame_into(index, frame).map_err(Error::into_core)
    }
}

/// Write a whole in-memory model to `path`.
pub fn write_model<P: AsRef<Path>>(path: P, model: &SpectralModel) -> Result<()> {
    let mut writer = ModelWriter::create(path, model.header.clone())?;
    for frame in &model.frames {
        writer.write_frame(frame)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read a whole model file into memory.
pub fn read_model<P: AsRef<Path>>(path: P) -> Result<SpectralModel> {
    ModelReader::open(path)?.into_model()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header() -> ModelHeader {
        ModelHeader {
            sample_rate: 22050,
            format: ModelFormat::HarmonicWithPhase,
            tracks: 3,
            frame_rate: 200,
            stochastic: StochasticType::Approx,
            stochastic_coefficients: 4,
            residual_percentage: 12.5,
            pre_emphasis: true,
            text: "voice".into(),
            ..Default::default()
        }
    }

    fn frame(h: &ModelHeader, base: f32) -> ModelFrame {
        let mut f = ModelFrame::new(h.layout()).unwrap();
        for (i, v) in f.as_mut_slice().iter_mut().enumerate() {
            *v = base + i as f32;
        }
        f
    }

    fn written(frames: usize) -> Vec<u8> {
        let h = header();
        let mut writer = ModelWriter::new(Cursor::new(Vec::new()), h.clone()).unwrap();
        for i in 0..frames {
            writer.write_frame(&frame(&h, 100.0 * i as f32)).unwrap();
        }
        writer.finalize().unwrap().into_inner()
    }

    #[test]
    fn test_file_size_and_header_fields() {
        let h = header();
        let bytes = written(3);
        assert_eq!(bytes.len(), 64 + 5 + 3 * h.frame_byte_size());
        assert_eq!(i32::from_le_bytes([bytes[56], bytes[57], bytes[58], bytes[59]]), 1);
        assert_eq!(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 767);
        // frame count patched in by finalize
        assert_eq!(i32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]), 3);
        // 3 tracks with phase, 4 coefficients and a gain
        assert_eq!(h.frame_byte_size(), (9 + 5) * 4);
    }

    #[test]
    fn test_random_access() {
        let h = header();
        let mut reader = ModelReader::new(Cursor::new(written(5))).unwrap();
        assert_eq!(reader.header().frame_count, 5);
        assert_eq!(reader.header().text, "voice");
        assert_eq!(reader.header().residual_percentage, 12.5);
        assert!(reader.header().pre_emphasis);

        let mut f = ModelFrame::new(h.layout()).unwrap();
        reader.read_frame_into(3, &mut f).unwrap();
        assert_eq!(f, frame(&h, 300.0));
        reader.read_frame_into(0, &mut f).unwrap();
        assert_eq!(f, frame(&h, 0.0));
    }

    #[test]
    fn test_frame_out_of_range() {
        let h = header();
        let mut reader = ModelReader::new(Cursor::new(written(2))).unwrap();
        let mut f = ModelFrame::new(h.layout()).unwrap();
        assert!(matches!(
            reader.read_frame_into(2, &mut f),
            Err(Error::FrameOutOfRange { index: 2, count: 2 })
        ));
        // through the frame source interface the error is wrapped
        assert!(reader.read_frame(7, &mut f).is_err());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = written(1);
        bytes[0] = 0;
        assert!(matches!(
            ModelReader::new(Cursor::new(bytes)),
            Err(Error::BadMagic { .. })
        ));
    }

    #[test]
    fn test_inconsistent_frame_size() {
        let mut bytes = written(1);
        bytes[12..16].copy_from_slice(&4i32.to_le_bytes());
        assert!(matches!(
            ModelReader::new(Cursor::new(bytes)),
            Err(Error::BadHeader(_))
        ));
    }

    #[test]
    fn test_unknown_format_code() {
        let mut bytes = written(1);
        bytes[20..24].copy_from_slice(&9i32.to_le_bytes());
        assert!(matches!(
            ModelReader::new(Cursor::new(bytes)),
            Err(Error::BadHeader(_))
        ));
    }

    #[test]
    fn test_bad_pre_emphasis_flag() {
        let mut bytes = written(1);
        bytes[56..60].copy_from_slice(&2i32.to_le_bytes());
        assert!(matches!(
            ModelReader::new(Cursor::new(bytes)),
            Err(Error::BadHeader(_))
        ));
    }

    #[test]
    fn test_corrupt_text_length() {
        let mut bytes = written(1);
        // header size and text length agree but the file is far shorter
        let len = i32::MAX - 64;
        bytes[4..8].copy_from_slice(&(len + 64).to_le_bytes());
        bytes[60..64].copy_from_slice(&len.to_le_bytes());
        assert!(matches!(
            ModelReader::new(Cursor::new(bytes)),
            Err(Error::BadHeader(_))
        ));
    }

    #[test]
    fn test_truncated_file() {
        let bytes = written(0);
        assert!(ModelReader::new(Cursor::new(bytes[..30].to_vec())).is_err());
    }

    #[test]
    fn test_layout_mismatch_on_write() {
        let h = header();
        let mut writer = ModelWriter::new(Cursor::new(Vec::new()), h).unwrap();
        let other = ModelFrame::new(ModelHeader::default().layout()).unwrap();
        assert!(writer.write_frame(&other).is_err());
        assert_eq!(writer.frames_written(), 0);
    }
}
