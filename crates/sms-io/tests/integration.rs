//! Integration tests for sms-io model and sound files.

use sms_core::{FrameSource, ModelFormat, ModelFrame, ModelHeader, SpectralModel, StochasticType};
use sms_io::{
    Error, ModelReader, ModelWriter, SoundFormat, SoundWriter, WavSpec, read_aiff, read_model,
    read_sound, write_aiff, write_model, write_wav,
};
use tempfile::NamedTempFile;

// ---------------------------------------------------------------------------
// Model files
// ---------------------------------------------------------------------------

fn model(frames: usize, stochastic: StochasticType) -> SpectralModel {
    let header = ModelHeader {
        sample_rate: 44100,
        format: ModelFormat::Inharmonic,
        tracks: 4,
        frame_rate: 345,
        stochastic,
        stochastic_coefficients: 8,
        text: "format inharmonic".into(),
        ..Default::default()
    };
    let frames = (0..frames)
        .map(|i| {
            let mut frame = ModelFrame::new(header.layout()).unwrap();
            frame.freq_mut()[0] = 100.0 + i as f32;
            frame.amp_mut()[0] = 60.0;
            frame.set_gain(10.0 + i as f32);
            frame
        })
        .collect();
    SpectralModel::new(header, frames)
}

#[test]
fn model_file_roundtrip() {
    for stochastic in [StochasticType::None, StochasticType::Approx, StochasticType::Ifft] {
        let original = model(20, stochastic);
        let file = NamedTempFile::new().unwrap();
        write_model(file.path(), &original).unwrap();

        let loaded = read_model(file.path()).unwrap();
        assert_eq!(loaded.header, original.header, "{stochastic}");
        assert_eq!(loaded.frames, original.frames, "{stochastic}");
    }
}

#[test]
fn reader_serves_frames_in_any_order() {
    let original = model(50, StochasticType::Approx);
    let file = NamedTempFile::new().unwrap();
    write_model(file.path(), &original).unwrap();

    let mut reader = ModelReader::open(file.path()).unwrap();
    assert_eq!(reader.frame_count(), 50);
    let mut frame = ModelFrame::new(reader.header().layout()).unwrap();
    for i in [49, 0, 17, 17, 3] {
        reader.read_frame(i, &mut frame).unwrap();
        assert_eq!(frame.freq()[0], 100.0 + i as f32);
        assert_eq!(frame.gain(), 10.0 + i as f32);
    }
}

#[test]
fn unfinished_writer_leaves_zero_frames() {
    let original = model(3, StochasticType::Approx);
    let file = NamedTempFile::new().unwrap();
    {
        let mut writer = ModelWriter::create(file.path(), original.header.clone()).unwrap();
        writer.write_frame(&original.frames[0]).unwrap();
        // dropped without finalize
    }
    let loaded = read_model(file.path()).unwrap();
    assert_eq!(loaded.header.frame_count, 0);
}

#[test]
fn non_model_file_is_rejected() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), vec![1u8; 128]).unwrap();
    assert!(matches!(
        ModelReader::open(file.path()),
        Err(Error::BadMagic { found: 0x01010101 })
    ));
}

// ---------------------------------------------------------------------------
// Sound files
// ---------------------------------------------------------------------------

fn ramp(n: usize) -> Vec<f32> {
    (0..n).map(|i| i as f32 / n as f32 - 0.5).collect()
}

#[test]
fn streaming_writer_matches_whole_file_writer() {
    let samples = ramp(1000);
    for format in [SoundFormat::Wav, SoundFormat::Aiff] {
        let file = NamedTempFile::new().unwrap();
        let mut writer = SoundWriter::create(file.path(), format, 22050).unwrap();
        for block in samples.chunks(128) {
            writer.write(block).unwrap();
        }
        writer.finalize().unwrap();

        let (loaded, rate) = read_sound(file.path()).unwrap();
        assert_eq!(rate, 22050, "{format}");
        assert_eq!(loaded.len(), samples.len(), "{format}");
        for (a, b) in samples.iter().zip(&loaded) {
            assert!((a - b).abs() < 1e-4, "{format}: {a} vs {b}");
        }
    }
}

#[test]
fn read_sound_detects_container() {
    let samples = ramp(64);
    let wav = NamedTempFile::new().unwrap();
    write_wav(wav.path(), &samples, WavSpec { sample_rate: 8000, ..Default::default() }).unwrap();
    let aiff = NamedTempFile::new().unwrap();
    write_aiff(aiff.path(), &samples, 11025).unwrap();

    assert_eq!(read_sound(wav.path()).unwrap().1, 8000);
    assert_eq!(read_sound(aiff.path()).unwrap().1, 11025);
    assert_eq!(read_aiff(aiff.path()).unwrap().0.len(), 64);

    let junk = NamedTempFile::new().unwrap();
    std::fs::write(junk.path(), b"OggS and more").unwrap();
    assert!(matches!(read_sound(junk.path()), Err(Error::UnsupportedContainer(_))));
}
