#![forbid(unsafe_code)]

//! Core types for the Veil obfuscating transport: server identity records,
//! long-term keys, crypting parameters, and process configuration.

pub mod config;
pub mod error;
pub mod identity;
pub mod keys;
pub mod params;

pub use config::VeilConfig;
pub use error::{ConfigError, CoreResult, IdentityError};
pub use identity::{
    parse_endpoint_addr, BridgeLine, ModelSpec, ServerPrivate, ServerPublic, MAGIC_LINE,
};
pub use keys::{PrivateKey, PublicKey, KEY_LEN};
pub use params::{CryptingParams, DEFAULT_MTU, PARAM_MODEL, PARAM_MTU, PARAM_PUBLIC_KEY};
