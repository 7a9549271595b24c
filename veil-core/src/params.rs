#![forbid(unsafe_code)]

//! Crypting parameters and the parameter-bag acknowledgement discipline.
//!
//! Identity records and bridge lines carry a free-form `key=value` bag.
//! Every extractor that consumes a key marks it acknowledged; any key left
//! unacknowledged after extraction is an error, so typos in a record never
//! pass silently.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CoreResult, IdentityError};

/// Bridge-line / identity-record parameter keys.
pub const PARAM_PUBLIC_KEY: &str = "p";
pub const PARAM_MODEL: &str = "m";
pub const PARAM_MTU: &str = "mtu";

/// Default MTU when a record does not override it.
pub const DEFAULT_MTU: u32 = 1500;

/// Parameters of the crypting layer a shaper session is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptingParams {
    pub mtu: u32,
}

impl Default for CryptingParams {
    fn default() -> Self {
        Self { mtu: DEFAULT_MTU }
    }
}

impl CryptingParams {
    pub fn validate(&self) -> CoreResult<()> {
        if self.mtu == 0 {
            return Err(IdentityError::Invalid("mtu"));
        }
        Ok(())
    }

    /// Extract crypting parameters from a bag, acknowledging consumed keys.
    pub fn from_params(
        params: &BTreeMap<String, String>,
        acked: &mut BTreeSet<String>,
    ) -> CoreResult<Self> {
        let mut result = Self::default();
        if let Some(text) = params.get(PARAM_MTU) {
            let mtu: u32 = text.parse().map_err(|_| IdentityError::Invalid("mtu"))?;
            acked.insert(PARAM_MTU.to_string());
            result.mtu = mtu;
        }
        result.validate()?;
        Ok(result)
    }
}

/// Fail on the first parameter no extractor claimed.
pub fn check_unacked(
    params: &BTreeMap<String, String>,
    acked: &BTreeSet<String>,
) -> CoreResult<()> {
    for key in params.keys() {
        if !acked.contains(key) {
            return Err(IdentityError::Unacknowledged(key.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn default_when_absent() {
        let mut acked = BTreeSet::new();
        let params = CryptingParams::from_params(&bag(&[]), &mut acked).unwrap();
        assert_eq!(params.mtu, DEFAULT_MTU);
        assert!(acked.is_empty());
    }

    #[test]
    fn mtu_parsed_and_acknowledged() {
        let mut acked = BTreeSet::new();
        let params = CryptingParams::from_params(&bag(&[("mtu", "9000")]), &mut acked).unwrap();
        assert_eq!(params.mtu, 9000);
        assert!(acked.contains("mtu"));
    }

    #[test]
    fn bad_mtu_values() {
        let mut acked = BTreeSet::new();
        for value in ["-1", "zzz", "4294967296", "0"] {
            let err = CryptingParams::from_params(&bag(&[("mtu", value)]), &mut acked).unwrap_err();
            assert!(matches!(err, IdentityError::Invalid("mtu")), "value {value:?}");
        }
    }

    #[test]
    fn unacked_key_is_reported() {
        let params = bag(&[("mtu", "1500"), ("zz", "1")]);
        let mut acked = BTreeSet::new();
        CryptingParams::from_params(&params, &mut acked).unwrap();
        let err = check_unacked(&params, &acked).unwrap_err();
        assert!(matches!(err, IdentityError::Unacknowledged(ref key) if key == "zz"));
    }
}
