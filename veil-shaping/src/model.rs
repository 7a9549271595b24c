#![forbid(unsafe_code)]

//! Traffic-model traits: the paired encode/decode functions plus the
//! length and timing distributions that define the cover traffic.

use std::time::Duration;

/// Outbound half of a traffic model.
///
/// `encode_bytes` may emit more bytes than it consumes (padding, framing) or
/// fewer (batching); across a run, the total number of plaintext bytes on
/// the wire equals the number consumed. Bytes are never reordered.
/// `next_packet_length` and `next_packet_sleep` are sampled afresh per tick.
pub trait EncodeModel: Send + 'static {
    /// Upper bound on `next_packet_length`; fixes the outbound buffer size.
    fn max_packet_length(&self) -> usize;

    /// Sample the length of the next packet, in `[0, max_packet_length]`.
    fn next_packet_length(&mut self) -> usize;

    /// Sample the delay before the next packet. Always positive.
    fn next_packet_sleep(&mut self) -> Duration;

    /// Encode a chunk of the plaintext stream for the wire.
    fn encode_bytes(&mut self, plain: &[u8]) -> Vec<u8>;
}

/// Inbound half of a traffic model. Stateful across calls: concatenating
/// the outputs over any chunking of the wire bytes yields exactly the
/// plaintext stream the peer fed its encoder.
pub trait DecodeModel: Send + 'static {
    fn decode_bytes(&mut self, wire: &[u8]) -> Vec<u8>;
}

impl EncodeModel for Box<dyn EncodeModel> {
    fn max_packet_length(&self) -> usize {
        (**self).max_packet_length()
    }

    fn next_packet_length(&mut self) -> usize {
        (**self).next_packet_length()
    }

    fn next_packet_sleep(&mut self) -> Duration {
        (**self).next_packet_sleep()
    }

    fn encode_bytes(&mut self, plain: &[u8]) -> Vec<u8> {
        (**self).encode_bytes(plain)
    }
}

impl DecodeModel for Box<dyn DecodeModel> {
    fn decode_bytes(&mut self, wire: &[u8]) -> Vec<u8> {
        (**self).decode_bytes(wire)
    }
}
