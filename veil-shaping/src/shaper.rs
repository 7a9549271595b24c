#![forbid(unsafe_code)]

//! The shaping supervisor.
//!
//! One task waits on its reader, its timer, and a control channel. Inbound
//! bytes are decoded and pushed into the crypto session; each timer tick
//! emits exactly one outbound packet whose length the encode model chose,
//! filled from carried-over encoder output first and then from ciphertext
//! pulled out of the session. The session's no-progress signal ends the
//! fill early: the packet ships short rather than waiting for plaintext.

use std::future::pending;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{ShapingError, ShapingResult};
use crate::model::{DecodeModel, EncodeModel};
use crate::reader::{Advance, ReadSlot, ShaperReader};
use crate::session::{CryptoSession, SessionError};
use crate::timer::ShaperTimer;

/// Default size of the inbound and pull buffers.
pub const SHAPER_BUF_SIZE: usize = 1024;

/// Knobs of the shaping loop.
#[derive(Debug, Clone)]
pub struct ShaperConfig {
    /// Size of the inbound and pull buffers in bytes.
    pub buffer_size: usize,

    /// Optional cap on session lifetime. Reaching it is a clean self-close,
    /// not an error.
    pub max_session_time: Option<Duration>,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self { buffer_size: SHAPER_BUF_SIZE, max_session_time: None }
    }
}

/// A configured but not yet running shaper.
pub struct Shaper<S, R, W, E, D> {
    session: S,
    source: R,
    sink: W,
    encode: E,
    decode: D,
    config: ShaperConfig,
}

impl<S, R, W, E, D> Shaper<S, R, W, E, D>
where
    S: CryptoSession,
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    E: EncodeModel,
    D: DecodeModel,
{
    pub fn new(session: S, source: R, decode: D, sink: W, encode: E) -> Self {
        Self::with_config(session, source, decode, sink, encode, ShaperConfig::default())
    }

    pub fn with_config(
        session: S,
        source: R,
        decode: D,
        sink: W,
        encode: E,
        config: ShaperConfig,
    ) -> Self {
        Self { session, source, sink, encode, decode, config }
    }

    /// Start the reader, timer, and supervisor tasks.
    pub fn spawn(self) -> ShaperHandle {
        let (control_tx, control_rx) = mpsc::channel(1);
        let (status_tx, status_rx) = mpsc::channel(1);
        let (error_tx, error_rx) = oneshot::channel();
        tokio::spawn(run(self, control_rx, status_tx, error_tx));
        ShaperHandle { control: Some(control_tx), status: status_rx, error: error_rx }
    }
}

/// Running shaper: request shutdown, observe stop, collect the outcome.
pub struct ShaperHandle {
    control: Option<mpsc::Sender<()>>,
    status: mpsc::Receiver<()>,
    error: oneshot::Receiver<Option<ShapingError>>,
}

impl ShaperHandle {
    /// Request shutdown. Idempotent; the shaper exits after its current step.
    pub fn close(&mut self) {
        self.control = None;
    }

    /// Resolves once the shaper has fully stopped and released its children.
    pub async fn stopped(&mut self) {
        while self.status.recv().await.is_some() {}
    }

    /// Wait for the shaper to stop; `Ok(())` on a clean shutdown, otherwise
    /// the first terminal error the run held.
    pub async fn join(mut self) -> ShapingResult<()> {
        self.stopped().await;
        match self.error.await {
            Ok(Some(err)) => Err(err),
            _ => Ok(()),
        }
    }
}

/// Supervisor-side state of the loop. The inbound buffer is absent here on
/// purpose: it lives inside whichever mailbox message currently holds it.
struct Loop<S, W, E, D> {
    session: S,
    sink: W,
    encode: E,
    decode: D,
    out_buf: Vec<u8>,
    pending: Vec<u8>,
    pull_buf: Vec<u8>,
    recycle: mpsc::Sender<ReadSlot>,
    duration: mpsc::Sender<Duration>,
}

impl<S, W, E, D> Loop<S, W, E, D>
where
    S: CryptoSession,
    W: AsyncWrite + Unpin + Send + 'static,
    E: EncodeModel,
    D: DecodeModel,
{
    /// One inbound batch: decode, hand to the session, rearm the reader.
    async fn handle_read(&mut self, buf: Vec<u8>, count: usize) -> ShapingResult<()> {
        let decoded = self.decode.decode_bytes(&buf[..count]);
        self.session.push_read(&decoded)?;

        // Decoding is done; the buffer can go back out for the next read.
        let _ = self.recycle.send(ReadSlot { buf, offset: 0 }).await;
        Ok(())
    }

    /// One tick: emit a packet of the sampled length.
    async fn handle_tick(&mut self) -> ShapingResult<()> {
        let out_len = self.encode.next_packet_length();
        // Rearm first so the timer sleeps while the packet is being built.
        let _ = self.duration.send(self.encode.next_packet_sleep()).await;

        let mut out_valid = 0;
        while out_valid < out_len {
            if !self.pending.is_empty() {
                // Carried-over encoder output goes out before anything new,
                // preserving ciphertext order on the wire.
                let take = (out_len - out_valid).min(self.pending.len());
                self.out_buf[out_valid..out_valid + take].copy_from_slice(&self.pending[..take]);
                self.pending.drain(..take);
                out_valid += take;
                continue;
            }

            let (pulled, no_progress) = match self.session.pull_write(&mut self.pull_buf) {
                Ok(count) => (count, false),
                Err(SessionError::NoProgress) => (0, true),
                Err(fatal) => return Err(fatal.into()),
            };

            let encoded = self.encode.encode_bytes(&self.pull_buf[..pulled]);
            let take = (out_len - out_valid).min(encoded.len());
            self.out_buf[out_valid..out_valid + take].copy_from_slice(&encoded[..take]);
            out_valid += take;
            if take < encoded.len() {
                // Overflow is only ever the tail of a single encode call.
                debug_assert!(self.pending.is_empty());
                self.pending.extend_from_slice(&encoded[take..]);
            }

            if no_progress {
                // Nothing more to pull this tick; ship what we have.
                break;
            }
        }

        self.sink
            .write_all(&self.out_buf[..out_valid])
            .await
            .map_err(ShapingError::Write)?;
        self.sink.flush().await.map_err(ShapingError::Write)?;
        Ok(())
    }
}

async fn run<S, R, W, E, D>(
    shaper: Shaper<S, R, W, E, D>,
    mut control: mpsc::Receiver<()>,
    status: mpsc::Sender<()>,
    outcome: oneshot::Sender<Option<ShapingError>>,
) where
    S: CryptoSession,
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    E: EncodeModel,
    D: DecodeModel,
{
    let Shaper { session, source, sink, encode, decode, config } = shaper;

    let (reader, recycle, mut advance) = ShaperReader::new(source);
    let (timer, duration, mut timing) = ShaperTimer::new();
    tokio::spawn(reader.run());
    tokio::spawn(timer.run());

    let mut state = Loop {
        session,
        sink,
        out_buf: vec![0u8; encode.max_packet_length()],
        encode,
        decode,
        pending: Vec::new(),
        pull_buf: vec![0u8; config.buffer_size],
        recycle,
        duration,
    };

    // The first read starts at the buffer head.
    let _ = state
        .recycle
        .send(ReadSlot { buf: vec![0u8; config.buffer_size], offset: 0 })
        .await;

    let deadline = async {
        match config.max_session_time {
            Some(limit) => sleep(limit).await,
            None => pending().await,
        }
    };
    tokio::pin!(deadline);

    debug!("shaper running");
    let mut held: Option<ShapingError> = None;
    loop {
        tokio::select! {
            advanced = advance.recv() => match advanced {
                // Reader is dead.
                None => break,
                Some(Advance::Failed(err)) => {
                    held = Some(ShapingError::Read(err));
                    break;
                }
                Some(Advance::Filled { buf, count }) => {
                    if let Err(err) = state.handle_read(buf, count).await {
                        held = Some(err);
                        break;
                    }
                }
            },
            tick = timing.recv() => match tick {
                // Timer is dead.
                None => break,
                Some(_) => {
                    if let Err(err) = state.handle_tick().await {
                        held = Some(err);
                        break;
                    }
                }
            },
            // Any control event is an exit request.
            _ = control.recv() => break,
            _ = &mut deadline => {
                info!("session lifetime cap reached");
                break;
            }
        }
    }

    match &held {
        Some(err) => error!("shaper terminated: {err}"),
        None => debug!("shaper stopped cleanly"),
    }

    // Stopping: dropping our channel ends winds both children down after
    // their current await.
    drop(state);
    drop(advance);
    drop(timing);

    let _ = outcome.send(held);
    drop(status);
}
