#![forbid(unsafe_code)]

//! Scripted crypto session and deterministic traffic model for conformance
//! scenarios. These doubles trade realism for exact control: the session
//! serves ciphertext from a queue, and the model's length and sleep are
//! constants.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use veil_shaping::{CryptoSession, DecodeModel, EncodeModel, SessionError};

/// Crypto session driven from a script.
///
/// `pull_write` serves bytes from a queue and reports no-progress once the
/// queue is dry; everything fed to `push_read` is recorded where the test
/// can see it. `fail_with` flips the session to fatal on its next use.
pub struct ScriptedSession {
    outgoing: VecDeque<u8>,
    pushed: Arc<Mutex<Vec<u8>>>,
    fatal: Option<String>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self { outgoing: VecDeque::new(), pushed: Arc::new(Mutex::new(Vec::new())), fatal: None }
    }

    pub fn with_outgoing(bytes: &[u8]) -> Self {
        let mut session = Self::new();
        session.queue(bytes);
        session
    }

    pub fn queue(&mut self, bytes: &[u8]) {
        self.outgoing.extend(bytes.iter().copied());
    }

    pub fn fail_with(&mut self, message: &str) {
        self.fatal = Some(message.to_string());
    }

    /// Handle onto the record of pushed bytes; keep a clone before moving
    /// the session into a shaper.
    pub fn pushed(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.pushed)
    }
}

impl Default for ScriptedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoSession for ScriptedSession {
    fn push_read(&mut self, decoded: &[u8]) -> Result<usize, SessionError> {
        if let Some(message) = &self.fatal {
            return Err(SessionError::Fatal(message.clone()));
        }
        self.pushed.lock().unwrap().extend_from_slice(decoded);
        Ok(decoded.len())
    }

    fn pull_write(&mut self, buf: &mut [u8]) -> Result<usize, SessionError> {
        if let Some(message) = &self.fatal {
            return Err(SessionError::Fatal(message.clone()));
        }
        if self.outgoing.is_empty() {
            return Err(SessionError::NoProgress);
        }
        let count = buf.len().min(self.outgoing.len());
        for slot in buf[..count].iter_mut() {
            *slot = self.outgoing.pop_front().unwrap();
        }
        Ok(count)
    }
}

/// Deterministic traffic model: constant packet length and sleep.
///
/// `expansion` > 1 repeats every input byte that many times, standing in
/// for framing overhead; the matching decoder keeps one byte per group and
/// stays correct across arbitrary chunk boundaries. `idle_fill` makes the
/// encoder emit a full packet of filler on empty input, standing in for a
/// model that pads idle ticks.
pub struct FixedModel {
    packet_len: usize,
    sleep: Duration,
    expansion: usize,
    idle_fill: Option<u8>,
    phase: usize,
}

impl FixedModel {
    pub fn new(packet_len: usize, sleep: Duration) -> Self {
        Self { packet_len, sleep, expansion: 1, idle_fill: None, phase: 0 }
    }

    pub fn with_expansion(mut self, expansion: usize) -> Self {
        assert!(expansion >= 1);
        self.expansion = expansion;
        self
    }

    pub fn with_idle_fill(mut self, fill: u8) -> Self {
        self.idle_fill = Some(fill);
        self
    }
}

impl EncodeModel for FixedModel {
    fn max_packet_length(&self) -> usize {
        self.packet_len
    }

    fn next_packet_length(&mut self) -> usize {
        self.packet_len
    }

    fn next_packet_sleep(&mut self) -> Duration {
        self.sleep
    }

    fn encode_bytes(&mut self, plain: &[u8]) -> Vec<u8> {
        if plain.is_empty() {
            return match self.idle_fill {
                Some(fill) => vec![fill; self.packet_len],
                None => Vec::new(),
            };
        }
        let mut encoded = Vec::with_capacity(plain.len() * self.expansion);
        for &byte in plain {
            for _ in 0..self.expansion {
                encoded.push(byte);
            }
        }
        encoded
    }
}

impl DecodeModel for FixedModel {
    fn decode_bytes(&mut self, wire: &[u8]) -> Vec<u8> {
        let mut decoded = Vec::with_capacity(wire.len() / self.expansion + 1);
        for &byte in wire {
            if self.phase == 0 {
                decoded.push(byte);
            }
            self.phase = (self.phase + 1) % self.expansion;
        }
        decoded
    }
}
