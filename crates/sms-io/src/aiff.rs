//! AIFF reading and writing.
//!
//! Only uncompressed `AIFF` forms are handled: big-endian signed PCM of 8,
//! 16, 24 or 32 bits. Files are written as mono 16-bit.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::container::mix_to_mono;
use crate::{Error, Result};

/// Bytes from the start of the file to the first sample.
const DATA_OFFSET: u64 = 12 + 26 + 16;

/// Encode a sample rate as an 80-bit IEEE extended float.
pub(crate) fn encode_extended(rate: u32) -> [u8; 10] {
    let mut out = [0u8; 10];
    if rate == 0 {
        return out;
    }
    let value = u64::from(rate);
    let shift = value.leading_zeros();
    let exponent = 16383 + 63 - shift as u16;
    let mantissa = value << shift;
    out[..2].copy_from_slice(&exponent.to_be_bytes());
    out[2..].copy_from_slice(&mantissa.to_be_bytes());
    out
}

/// Decode an 80-bit IEEE extended float.
pub(crate) fn decode_extended(bytes: [u8; 10]) -> f64 {
    let sign = if bytes[0] & 0x80 != 0 { -1.0 } else { 1.0 };
    let exponent = i32::from(u16::from_be_bytes([bytes[0] & 0x7f, bytes[1]]));
    let mut m = [0u8; 8];
    m.copy_from_slice(&bytes[2..]);
    let mantissa = u64::from_be_bytes(m);
    if exponent == 0 && mantissa == 0 {
        return 0.0;
    }
    sign * mantissa as f64 * 2f64.powi(exponent - 16383 - 63)
}

/// Streams mono 16-bit samples into an AIFF file.
///
/// Chunk sizes are written as zero and patched by
/// [`finalize`](Self::finalize).
pub struct AiffWriter<W: Write + Seek> {
    inner: W,
    frames: u32,
}

impl AiffWriter<BufWriter<File>> {
    /// Create an AIFF file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?), sample_rate)
    }
}

impl<W: Write + Seek> AiffWriter<W> {
    /// Start an AIFF stream in `inner`.
    pub fn new(mut inner: W, sample_rate: u32) -> Result<Self> {
        inner.write_all(b"FORM")?;
        inner.write_all(&0u32.to_be_bytes())?;
        inner.write_all(b"AIFF")?;
        inner.write_all(b"COMM")?;
        inner.write_all(&18u32.to_be_bytes())?;
        inner.write_all(&1i16.to_be_bytes())?;
        inner.write_all(&0u32.to_be_bytes())?;
        inner.write_all(&16i16.to_be_bytes())?;
        inner.write_all(&encode_extended(sample_rate))?;
        inner.write_all(b"SSND")?;
        inner.write_all(&0u32.to_be_bytes())?;
        inner.write_all(&0u32.to_be_bytes())?;
        inner.write_all(&0u32.to_be_bytes())?;
        Ok(Self { inner, frames: 0 })
    }

    /// Append samples, clipped to 16 bits.
    pub fn write(&mut self, samples: &[f32]) -> Result<()> {
        for &s in samples {
            let v = (s * 32768.0).clamp(-32768.0, 32767.0) as i16;
            self.inner.write_all(&v.to_be_bytes())?;
        }
        self.frames = u32::try_from(samples.len())
            .ok()
            .and_then(|n| self.frames.checked_add(n))
            .ok_or_else(|| Error::UnsupportedContainer("AIFF files hold at most 2^32 frames".into()))?;
        Ok(())
    }

    /// Patch the chunk sizes and flush.
    pub fn finalize(mut self) -> Result<W> {
        let data = u64::from(self.frames) * 2;
        let form = u32::try_from(DATA_OFFSET - 8 + data)
            .map_err(|_| Error::UnsupportedContainer("AIFF data exceeds 4 GiB".into()))?;
        let ssnd = (data + 8) as u32;
        self.inner.seek(SeekFrom::Start(4))?;
        self.inner.write_all(&form.to_be_bytes())?;
        self.inner.seek(SeekFrom::Start(22))?;
        self.inner.write_all(&self.frames.to_be_bytes())?;
        self.inner.seek(SeekFrom::Start(42))?;
        self.inner.write_all(&ssnd.to_be_bytes())?;
        self.inner.seek(SeekFrom::End(0))?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Write mono samples to a 16-bit AIFF file.
pub fn write_aiff<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32) -> Result<()> {
    let mut writer = AiffWriter::create(path, sample_rate)?;
    writer.write(samples)?;
    writer.finalize()?;
    Ok(())
}

/// Read an AIFF file, mixed down to mono, with its sample rate.
pub fn read_aiff<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32)> {
    read_aiff_from(BufReader::new(File::open(path)?))
}

pub(crate) fn read_aiff_from<R: Read>(mut reader: R) -> Result<(Vec<f32>, u32)> {
    let mut id = [0u8; 4];
    let mut size = [0u8; 4];
    reader.read_exact(&mut id)?;
    reader.read_exact(&mut size)?;
    if &id != b"FORM" {
        return Err(Error::UnsupportedContainer("missing FORM chunk".into()));
    }
    reader.read_exact(&mut id)?;
    if &id != b"AIFF" {
        return Err(Error::UnsupportedContainer(format!(
            "form type '{}' is not plain AIFF",
            String::from_utf8_lossy(&id)
        )));
    }

    let mut format: Option<(usize, usize, u32)> = None;
    let mut data: Option<Vec<u8>> = None;
    while format.is_none() || data.is_none() {
        if reader.read_exact(&mut id).is_err() {
            break;
        }
        reader.read_exact(&mut size)?;
        let len = u32::from_be_bytes(size) as usize;
        let mut body = vec![0u8; len + (len & 1)];
        reader.read_exact(&mut body)?;
        match &id {
            b"COMM" if len >= 18 => {
                let channels = i16::from_be_bytes([body[0], body[1]]);
                let bits = i16::from_be_bytes([body[6], body[7]]);
                let mut ext = [0u8; 10];
                ext.copy_from_slice(&body[8..18]);
                let rate = decode_extended(ext);
                if channels <= 0 || !(1..=32).contains(&bits) || rate < 1.0 {
                    return Err(Error::UnsupportedContainer(format!(
                        "{channels} channels of {bits} bits at {rate} Hz"
                    )));
                }
                format = Some((channels as usize, bits as usize, rate.round() as u32));
            }
            b"SSND" if len >= 8 => {
                let offset = u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as usize;
                let start = (8 + offset).min(len);
                body.truncate(len);
                data = Some(body.split_off(start));
            }
            _ => {}
        }
    }

    let (channels, bits, rate) =
        format.ok_or_else(|| Error::UnsupportedContainer("missing COMM chunk".into()))?;
    let data = data.ok_or_else(|| Error::UnsupportedContainer("missing SSND chunk".into()))?;
    let width = bits.div_ceil(8);
    let scale = 1.0 / 2f32.powi(8 * width as i32 - 1);
    let samples = data
        .chunks_exact(width)
        .map(|b| {
            let mut v = 0i32;
            for &byte in b {
                v = (v << 8) | i32::from(byte);
            }
            // sign-extend from the sample width
            let unused = 32 - 8 * width as u32;
            ((v << unused) >> unused) as f32 * scale
        })
        .collect();
    Ok((mix_to_mono(samples, channels), rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_extended_rates() {
        for rate in [8000u32, 22050, 44100, 48000, 96000, 1] {
            assert_eq!(decode_extended(encode_extended(rate)), f64::from(rate));
        }
        // 44100 Hz as written by other tools
        assert_eq!(
            encode_extended(44100),
            [0x40, 0x0E, 0xAC, 0x44, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_header_layout() {
        let mut writer = AiffWriter::new(Cursor::new(Vec::new()), 22050).unwrap();
        writer.write(&[0.0, 0.5, -0.5]).unwrap();
        let bytes = writer.finalize().unwrap().into_inner();
        assert_eq!(bytes.len() as u64, DATA_OFFSET + 6);
        assert_eq!(&bytes[0..4], b"FORM");
        assert_eq!(u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), bytes.len() as u32 - 8);
        assert_eq!(&bytes[38..42], b"SSND");
        assert_eq!(u32::from_be_bytes([bytes[22], bytes[23], bytes[24], bytes[25]]), 3);
    }

    #[test]
    fn test_roundtrip() {
        let samples: Vec<f32> = (0..500).map(|i| 0.8 * (i as f32 * 0.05).sin()).collect();
        let mut writer = AiffWriter::new(Cursor::new(Vec::new()), 16000).unwrap();
        writer.write(&samples).unwrap();
        let bytes = writer.finalize().unwrap().into_inner();

        let (loaded, rate) = read_aiff_from(Cursor::new(bytes)).unwrap();
        assert_eq!(rate, 16000);
        assert_eq!(loaded.len(), samples.len());
        for (a, b) in samples.iter().zip(&loaded) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_compressed_form_is_rejected() {
        let mut bytes = b"FORM\0\0\0\x04AIFC".to_vec();
        bytes.extend_from_slice(&[0; 4]);
        assert!(matches!(
            read_aiff_from(Cursor::new(bytes)),
            Err(Error::UnsupportedContainer(_))
        ));
    }
}
