#![forbid(unsafe_code)]

//! Long-term X25519 identity keys with 64-character hex textual forms.
//!
//! The private half zeroizes on drop. The public half is always re-derived
//! from the private key; it is never trusted from storage.

use std::fmt;

use rand_core::OsRng;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

use crate::error::{CoreResult, IdentityError};

/// Length in bytes of both key halves.
pub const KEY_LEN: usize = 32;

fn decode_key_hex(s: &str, what: &'static str) -> CoreResult<[u8; KEY_LEN]> {
    if s.len() != KEY_LEN * 2 {
        return Err(IdentityError::Invalid(what));
    }
    let mut out = [0u8; KEY_LEN];
    hex::decode_to_slice(s, &mut out).map_err(|_| IdentityError::Invalid(what))?;
    Ok(out)
}

/// Long-term private key. Secret material is wiped when dropped.
pub struct PrivateKey {
    secret: StaticSecret,
}

impl PrivateKey {
    /// Generate a fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self { secret: StaticSecret::random_from_rng(OsRng) }
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { secret: StaticSecret::from(bytes) }
    }

    /// Parse the 64-hex-char textual form.
    pub fn from_hex(s: &str) -> CoreResult<Self> {
        let bytes = Zeroizing::new(decode_key_hex(s, "private key")?);
        Ok(Self::from_bytes(*bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.secret.to_bytes())
    }

    /// Derive the matching public key.
    pub fn public(&self) -> PublicKey {
        PublicKey(X25519Public::from(&self.secret).to_bytes())
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self { secret: self.secret.clone() }
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.secret.to_bytes() == other.secret.to_bytes()
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// Long-term public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey([u8; KEY_LEN]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse the 64-hex-char textual form.
    pub fn from_hex(s: &str) -> CoreResult<Self> {
        Ok(Self(decode_key_hex(s, "public key")?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let key = PrivateKey::generate();
        let again = PrivateKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key, again);
        assert_eq!(key.public(), again.public());
    }

    #[test]
    fn public_derivation_is_stable() {
        let key = PrivateKey::generate();
        assert_eq!(key.public(), key.public());
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(matches!(
            PrivateKey::from_hex("deadbeef"),
            Err(IdentityError::Invalid("private key"))
        ));
        let not_hex = "zz".repeat(32);
        assert!(matches!(
            PublicKey::from_hex(&not_hex),
            Err(IdentityError::Invalid("public key"))
        ));
    }
}
