#![forbid(unsafe_code)]

//! Reader actor: isolates the inbound read so the supervisor can wait on it
//! together with the timer and the control channel.
//!
//! The inbound buffer itself travels through the `recycle` and `advance`
//! mailboxes, so whichever task holds the value owns the bytes; there is no
//! shared state to guard. At most one read is in flight.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::debug;

/// A read request: the buffer to fill and the offset to read at.
pub(crate) struct ReadSlot {
    pub buf: Vec<u8>,
    pub offset: usize,
}

/// What comes back on `advance`.
pub(crate) enum Advance {
    /// One read completed; the buffer returns with the byte count.
    Filled { buf: Vec<u8>, count: usize },

    /// The source failed (EOF included). The reader is gone after this.
    Failed(io::Error),
}

pub(crate) struct ShaperReader<R> {
    source: R,
    recycle: mpsc::Receiver<ReadSlot>,
    advance: mpsc::Sender<Advance>,
}

impl<R: AsyncRead + Unpin + Send + 'static> ShaperReader<R> {
    pub(crate) fn new(source: R) -> (Self, mpsc::Sender<ReadSlot>, mpsc::Receiver<Advance>) {
        // Single-slot mailboxes: one request and one outcome in flight at most.
        let (recycle_tx, recycle_rx) = mpsc::channel(1);
        let (advance_tx, advance_rx) = mpsc::channel(1);
        let reader = Self { source, recycle: recycle_rx, advance: advance_tx };
        (reader, recycle_tx, advance_rx)
    }

    pub(crate) async fn run(mut self) {
        while let Some(ReadSlot { mut buf, offset }) = self.recycle.recv().await {
            let outcome = tokio::select! {
                read = self.source.read(&mut buf[offset..]) => read,
                // Supervisor went away mid-read; nothing left to report to.
                _ = self.advance.closed() => return,
            };

            match outcome {
                Ok(0) => {
                    debug!("inbound source reached EOF");
                    let _ = self
                        .advance
                        .send(Advance::Failed(io::ErrorKind::UnexpectedEof.into()))
                        .await;
                    return;
                }
                Ok(count) => {
                    if self.advance.send(Advance::Filled { buf, count }).await.is_err() {
                        return;
                    }
                }
                Err(err) => {
                    let _ = self.advance.send(Advance::Failed(err)).await;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn read_cycle_returns_buffer_and_count() {
        let (mut peer, inbound) = tokio::io::duplex(256);
        let (reader, recycle, mut advance) = ShaperReader::new(inbound);
        tokio::spawn(reader.run());

        recycle.send(ReadSlot { buf: vec![0u8; 64], offset: 0 }).await.unwrap();
        peer.write_all(b"hello").await.unwrap();

        match advance.recv().await.unwrap() {
            Advance::Filled { buf, count } => {
                assert_eq!(count, 5);
                assert_eq!(&buf[..count], b"hello");
            }
            Advance::Failed(err) => panic!("unexpected failure: {err}"),
        }
    }

    #[tokio::test]
    async fn eof_is_reported_then_channel_closes() {
        let (peer, inbound) = tokio::io::duplex(256);
        drop(peer);
        let (reader, recycle, mut advance) = ShaperReader::new(inbound);
        tokio::spawn(reader.run());

        recycle.send(ReadSlot { buf: vec![0u8; 64], offset: 0 }).await.unwrap();
        match advance.recv().await.unwrap() {
            Advance::Failed(err) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
            Advance::Filled { .. } => panic!("expected EOF"),
        }
        assert!(advance.recv().await.is_none());
    }

    #[tokio::test]
    async fn closing_recycle_stops_the_reader() {
        let (_peer, inbound) = tokio::io::duplex(256);
        let (reader, recycle, mut advance) = ShaperReader::new(inbound);
        let task = tokio::spawn(reader.run());

        drop(recycle);
        task.await.unwrap();
        assert!(advance.recv().await.is_none());
    }
}
