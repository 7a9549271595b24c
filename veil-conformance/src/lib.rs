#![forbid(unsafe_code)]

//! Test doubles and helpers for exercising the Veil shaping pipeline.

pub mod scripted;

pub use scripted::{FixedModel, ScriptedSession};
