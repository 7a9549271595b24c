#![forbid(unsafe_code)]

//! Shaping core for the Veil obfuscating transport.
//!
//! The shaper couples a crypto session to a pair of traffic models and keeps
//! the wire looking like the model regardless of plaintext availability:
//! outbound packet lengths and inter-packet delays are drawn from the encode
//! model on a timer, and inbound obfuscated bytes are decoded back into
//! ciphertext for the session to consume.

pub mod error;
pub mod model;
pub mod session;
pub mod shaper;
pub mod uniform;

mod reader;
mod timer;

pub use error::{ShapingError, ShapingResult};
pub use model::{DecodeModel, EncodeModel};
pub use session::{CryptoSession, SessionError};
pub use shaper::{Shaper, ShaperConfig, ShaperHandle, SHAPER_BUF_SIZE};
pub use uniform::{build_model, UniformModel, MODEL_UNIFORM};
