//! Error types shared by every spectral modeling session.

use thiserror::Error;

/// Errors that abort an analysis or synthesis session.
#[derive(Debug, Error)]
pub enum Error {
    /// A scratch buffer, frame ring or model frame could not be allocated.
    #[error("cannot allocate {len} samples for {what}")]
    Allocation {
        /// Which buffer was being allocated.
        what: &'static str,
        /// Requested length in elements.
        len: usize,
    },

    /// The sliding sound buffer no longer covers a requested frame.
    #[error(
        "buffer runoff in frame {frame}: needs samples {start}..{end}, buffer holds {marker}..{buffer_end}"
    )]
    BufferRunoff {
        /// Frame number being initialized.
        frame: usize,
        /// First source sample the frame needs.
        start: i64,
        /// One past the last source sample the frame needs.
        end: i64,
        /// Source index of the first buffered sample.
        marker: i64,
        /// One past the source index of the last buffered sample.
        buffer_end: i64,
    },

    /// A parameter is outside its accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Two buffers that must agree in length do not.
    #[error("size mismatch for {what}: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Which buffer was checked.
        what: &'static str,
        /// Length the operation requires.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// Reading a frame from its backing store failed.
    #[error("frame source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Wrap an error raised by a frame source.
    pub fn from_source(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Source(Box::new(err))
    }
}

/// Convenience result type for spectral modeling operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Allocate a zero-filled buffer, reporting exhaustion instead of aborting.
pub fn zeroed<T: Default + Clone>(len: usize, what: &'static str) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::Allocation { what, len })?;
    buf.resize(len, T::default());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_has_requested_length() {
        let buf: Vec<f32> = zeroed(1024, "test").unwrap();
        assert_eq!(buf.len(), 1024);
        assert!(buf.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn zeroed_reports_exhaustion() {
        let err = zeroed::<f64>(usize::MAX / 4, "huge").unwrap_err();
        assert!(matches!(err, Error::Allocation { what: "huge", .. }));
    }

    #[test]
    fn runoff_display() {
        let err = Error::BufferRunoff {
            frame: 7,
            start: -10,
            end: 90,
            marker: 0,
            buffer_end: 4096,
        };
        let msg = err.to_string();
        assert!(msg.contains("frame 7"), "got: {msg}");
        assert!(msg.contains("-10..90"), "got: {msg}");
    }

    #[test]
    fn invalid_config_display() {
        let err = Error::invalid_config("hop size must be positive");
        assert_eq!(
            err.to_string(),
            "invalid configuration: hop size must be positive"
        );
    }
}
