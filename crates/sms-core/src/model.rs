//! Random-access frame sources.

use crate::error::{Error, Result};
use crate::frame::ModelFrame;
use crate::header::ModelHeader;

/// Anything frames can be read from by index.
///
/// Implemented by the in-memory [`SpectralModel`] and by file readers.
pub trait FrameSource {
    /// Header describing every frame.
    fn header(&self) -> &ModelHeader;

    /// Number of readable frames.
    fn frame_count(&self) -> usize {
        self.header().frame_count
    }

    /// Read frame `index` into `frame`, which must use the header's layout.
    fn read_frame(&mut self, index: usize, frame: &mut ModelFrame) -> Result<()>;
}

/// A complete model held in memory.
#[derive(Debug, Clone, Default)]
pub struct SpectralModel {
    /// Header; `frame_count` tracks `frames.len()`.
    pub header: ModelHeader,
    /// Frames in time order.
    pub frames: Vec<ModelFrame>,
}

impl SpectralModel {
    /// Create a model from a header and its frames.
    pub fn new(mut header: ModelHeader, frames: Vec<ModelFrame>) -> Self {
        header.frame_count = frames.len();
        Self { header, frames }
    }
}

impl FrameSource for SpectralModel {
    fn header(&self) -> &ModelHeader {
        &self.header
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn read_frame(&mut self, index: usize, frame: &mut ModelFrame) -> Result<()> {
        let src = self.frames.get(index).ok_or_else(|| {
            Error::invalid_config(format!(
                "frame {index} out of range (model has {})",
                self.frames.len()
            ))
        })?;
        frame.copy_from(src);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameLayout;
    use crate::header::StochasticType;

    #[test]
    fn test_read_frame() {
        let layout = FrameLayout::new(1, false, StochasticType::None, 0, 0);
        let frames = (0..3)
            .map(|i| {
                let mut f = ModelFrame::new(layout).unwrap();
                f.freq_mut()[0] = 100.0 * i as f32;
                f
            })
            .collect();
        let mut model = SpectralModel::new(ModelHeader::default(), frames);
        assert_eq!(model.header().frame_count, 3);

        let mut out = ModelFrame::new(layout).unwrap();
        model.read_frame(2, &mut out).unwrap();
        assert_eq!(out.freq()[0], 200.0);
        assert!(model.read_frame(3, &mut out).is_err());
    }
}
