#![forbid(unsafe_code)]

//! The crypto-session surface the shaper drives.

use thiserror::Error;

/// Failure modes of a crypto session.
///
/// [`SessionError::NoProgress`] is a control-flow signal, not a failure: the
/// session has no ciphertext to emit right now but remains healthy. Every
/// other variant is terminal for the stream.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("no progress available")]
    NoProgress,

    #[error("session failure: {0}")]
    Fatal(String),
}

impl SessionError {
    pub fn is_no_progress(&self) -> bool {
        matches!(self, SessionError::NoProgress)
    }
}

/// Duplex byte interface of the cryptographic session.
///
/// The shaper feeds decoded wire bytes in through [`push_read`] and drains
/// ciphertext out through [`pull_write`]; it never inspects the content.
/// Both sides are used single-threaded from the supervisor.
///
/// [`push_read`]: CryptoSession::push_read
/// [`pull_write`]: CryptoSession::pull_write
pub trait CryptoSession: Send + 'static {
    /// Feed decoded inbound bytes into the session. Returns the number of
    /// bytes consumed; any error is terminal.
    fn push_read(&mut self, decoded: &[u8]) -> Result<usize, SessionError>;

    /// Fill `buf` with outbound ciphertext. Returns the number of bytes
    /// written, or [`SessionError::NoProgress`] when nothing is available.
    fn pull_write(&mut self, buf: &mut [u8]) -> Result<usize, SessionError>;
}
