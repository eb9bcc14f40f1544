//! The process-wide encryption key and its HKDF-SHA256 sub-keys.
//!
//! One `EncryptionKey` is built at startup, either parsed from the
//! externally supplied hex string or generated from a CSPRNG, and is
//! then threaded into the store.  It is never persisted.
//!
//! From that key we derive a dedicated **MAC key** so the cipher key
//! and the integrity key are independent.

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{Result, VaultError};

/// Length of the AES-256 key and of derived sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

/// Number of hex characters consumed from an external key string.
const KEY_HEX_LEN: usize = KEY_LEN * 2;

/// HKDF context for the password MAC key.
const MAC_KEY_INFO: &[u8] = b"connvault-password-mac";

/// A 32-byte symmetric key that zeroes its memory when dropped.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_LEN],
}

impl EncryptionKey {
    /// Create a key from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Parse an externally supplied key.
    ///
    /// The string must start with at least 64 hex characters; only the
    /// first 64 are used, giving the 32 key bytes.  Longer strings are
    /// accepted so keys produced by other tools keep working.
    pub fn from_hex(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.len() < KEY_HEX_LEN {
            return Err(VaultError::InvalidKey(format!(
                "expected at least {KEY_HEX_LEN} hex characters, got {}",
                text.len()
            )));
        }

        let prefix = text.get(..KEY_HEX_LEN).ok_or_else(|| {
            VaultError::InvalidKey("key contains non-ASCII characters".into())
        })?;

        let mut bytes = [0u8; KEY_LEN];
        hex::decode_to_slice(prefix, &mut bytes)
            .map_err(|e| VaultError::InvalidKey(format!("not valid hex: {e}")))?;

        Ok(Self { bytes })
    }

    /// Render the key as 64 lowercase hex characters.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derive the key used to authenticate stored password ciphertexts.
    pub fn derive_mac_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        derive_mac_key(&self.bytes)
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Derive the MAC key from raw key bytes.
pub fn derive_mac_key(key: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    hkdf_derive(key, MAC_KEY_INFO)
}

/// Run HKDF-SHA256 expand with the given `info`.
///
/// The input key already has full entropy, so no salt is used.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(info, &mut okm[..])
        .map_err(|e| VaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}
