#![forbid(unsafe_code)]

//! Error type for the shaping loop.

use thiserror::Error;

use crate::session::SessionError;

pub type ShapingResult<T> = Result<T, ShapingError>;

/// Terminal failures of a shaper run.
///
/// [`SessionError::NoProgress`] never surfaces here; it is consumed inside
/// the packet-fill loop as a control-flow signal.
#[derive(Debug, Error)]
pub enum ShapingError {
    /// The inbound source failed or reached end of stream.
    #[error("inbound read failed: {0}")]
    Read(#[source] std::io::Error),

    /// The outbound sink failed; partially written packets are not retried.
    #[error("outbound write failed: {0}")]
    Write(#[source] std::io::Error),

    /// The crypto session reported a fatal condition.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ShapingError {
    /// True when the run ended because the inbound stream reached EOF.
    pub fn is_eof(&self) -> bool {
        matches!(self, ShapingError::Read(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
