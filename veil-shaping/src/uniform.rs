#![forbid(unsafe_code)]

//! Uniform cover model.
//!
//! Packet lengths are drawn uniformly from `[min, max]` and inter-packet
//! gaps are exponentially distributed around a target packet rate, so the
//! wire shows a flat length histogram with Poisson timing. Bytes pass
//! through unchanged, which makes the decoder the identity.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp1};

use veil_core::{CoreResult, IdentityError, ModelSpec};

use crate::model::{DecodeModel, EncodeModel};

/// Model name as it appears in identity records (`m=uniform`).
pub const MODEL_UNIFORM: &str = "uniform";

const DEFAULT_MIN_LEN: usize = 32;
const DEFAULT_MAX_LEN: usize = 1024;
const DEFAULT_RATE: f64 = 10.0;

/// Uniform length / exponential gap traffic model.
#[derive(Debug)]
pub struct UniformModel {
    min_len: usize,
    max_len: usize,
    rate: f64,
    rng: StdRng,
}

impl UniformModel {
    /// `rate` is the target packet rate in packets per second.
    pub fn new(min_len: usize, max_len: usize, rate: f64) -> Self {
        Self { min_len, max_len, rate, rng: StdRng::from_entropy() }
    }

    /// Build from an identity record's model spec. Recognized sub-params:
    /// `min`, `max` (packet length bounds) and `rate` (packets per second).
    pub fn from_spec(spec: &ModelSpec) -> CoreResult<Self> {
        if spec.name != MODEL_UNIFORM {
            return Err(IdentityError::Invalid("model name"));
        }

        let mut min_len = DEFAULT_MIN_LEN;
        let mut max_len = DEFAULT_MAX_LEN;
        let mut rate = DEFAULT_RATE;
        for (key, value) in &spec.params {
            match key.as_str() {
                "min" => {
                    min_len =
                        value.parse().map_err(|_| IdentityError::Invalid("model parameter"))?;
                }
                "max" => {
                    max_len =
                        value.parse().map_err(|_| IdentityError::Invalid("model parameter"))?;
                }
                "rate" => {
                    rate = value.parse().map_err(|_| IdentityError::Invalid("model parameter"))?;
                }
                _ => return Err(IdentityError::Unacknowledged(format!("m.{key}"))),
            }
        }

        if max_len == 0 || min_len > max_len || !(rate > 0.0) {
            return Err(IdentityError::Invalid("model parameter"));
        }
        Ok(Self::new(min_len, max_len, rate))
    }
}

impl EncodeModel for UniformModel {
    fn max_packet_length(&self) -> usize {
        self.max_len
    }

    fn next_packet_length(&mut self) -> usize {
        self.rng.gen_range(self.min_len..=self.max_len)
    }

    fn next_packet_sleep(&mut self) -> Duration {
        // Exponential gaps with mean 1/rate; clamped away from zero so the
        // timer is always rearmed with a positive interval.
        let sample: f64 = Exp1.sample(&mut self.rng);
        Duration::from_secs_f64((sample / self.rate).max(1e-6))
    }

    fn encode_bytes(&mut self, plain: &[u8]) -> Vec<u8> {
        plain.to_vec()
    }
}

impl DecodeModel for UniformModel {
    fn decode_bytes(&mut self, wire: &[u8]) -> Vec<u8> {
        wire.to_vec()
    }
}

/// Instantiate the encode/decode pair named by a model spec.
pub fn build_model(
    spec: &ModelSpec,
) -> CoreResult<(Box<dyn EncodeModel>, Box<dyn DecodeModel>)> {
    match spec.name.as_str() {
        MODEL_UNIFORM => Ok((
            Box::new(UniformModel::from_spec(spec)?),
            Box::new(UniformModel::from_spec(spec)?),
        )),
        _ => Err(IdentityError::Invalid("model name")),
    }
}
