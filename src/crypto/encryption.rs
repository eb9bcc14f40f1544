//! AES-256-CBC password encryption with an HMAC-SHA256 tag.
//!
//! Each call to `encrypt` generates a fresh random 16-byte IV.  The
//! padded ciphertext is then authenticated (encrypt-then-MAC) with a
//! key derived from the process key, so a wrong key or a flipped bit is
//! rejected before any unpadding happens.
//!
//! Persisted shape (all fields lowercase hex):
//!   { "encrypted": "<ciphertext>", "iv": "<16 bytes>", "mac": "<32 bytes>" }
//!
//! `mac` is optional on read.  Records written without one are still
//! decrypted, relying on PKCS#7 padding and UTF-8 checks to catch a
//! wrong key.
//!
//! The fields stay hex text in memory and are only decoded inside
//! `decrypt`, so one damaged value cannot make the whole store document
//! unreadable.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use super::keys::EncryptionKey;
use crate::errors::{Result, VaultError};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Size of the CBC initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// An encrypted password as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    /// PKCS#7-padded AES-256-CBC output, hex.
    pub encrypted: String,

    /// The random IV used for this value only, hex.
    pub iv: String,

    /// HMAC-SHA256 over `iv || encrypted`, hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

impl Ciphertext {
    /// Build from raw bytes, hex-encoding each part.
    pub fn from_bytes(encrypted: &[u8], iv: &[u8], mac: Option<&[u8]>) -> Self {
        Self {
            encrypted: hex::encode(encrypted),
            iv: hex::encode(iv),
            mac: mac.map(hex::encode),
        }
    }

    /// Decoded ciphertext bytes.
    pub fn encrypted_bytes(&self) -> Result<Vec<u8>> {
        decode_field(&self.encrypted)
    }

    /// Decoded IV bytes.
    pub fn iv_bytes(&self) -> Result<Vec<u8>> {
        decode_field(&self.iv)
    }

    /// Decoded MAC bytes, if a MAC was stored.
    pub fn mac_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.mac.as_deref().map(decode_field).transpose()
    }
}

fn decode_field(text: &str) -> Result<Vec<u8>> {
    hex::decode(text).map_err(|_| VaultError::DecryptionFailed)
}

/// Encrypt `plaintext` under `key` with a fresh IV.
pub fn encrypt(key: &EncryptionKey, plaintext: &str) -> Result<Ciphertext> {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key or IV length: {e}")))?;
    let encrypted = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mac = compute_mac(key, &iv, &encrypted)?;

    Ok(Ciphertext::from_bytes(&encrypted, &iv, Some(&mac)))
}

/// Decrypt a value produced by `encrypt` under the same key.
///
/// Every failure mode (malformed hex, bad IV length, MAC mismatch, bad
/// padding, non-UTF-8 output) collapses into `DecryptionFailed`.
pub fn decrypt(key: &EncryptionKey, ciphertext: &Ciphertext) -> Result<String> {
    let iv = ciphertext.iv_bytes()?;
    let encrypted = ciphertext.encrypted_bytes()?;

    if iv.len() != IV_LEN {
        return Err(VaultError::DecryptionFailed);
    }
    if encrypted.is_empty() || encrypted.len() % BLOCK_LEN != 0 {
        return Err(VaultError::DecryptionFailed);
    }

    if let Some(tag) = ciphertext.mac_bytes()? {
        verify_mac(key, &iv, &encrypted, &tag)?;
    }

    let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), &iv)
        .map_err(|_| VaultError::DecryptionFailed)?;
    let plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&encrypted)
        .map_err(|_| VaultError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|e| {
        let mut bad_bytes = e.into_bytes();
        bad_bytes.zeroize();
        VaultError::DecryptionFailed
    })
}

fn compute_mac(key: &EncryptionKey, iv: &[u8], encrypted: &[u8]) -> Result<Vec<u8>> {
    let mac_key = key.derive_mac_key()?;
    let mut mac = Hmac::<Sha256>::new_from_slice(&mac_key[..])
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid MAC key: {e}")))?;

    mac.update(iv);
    mac.update(encrypted);

    Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time tag check.
fn verify_mac(key: &EncryptionKey, iv: &[u8], encrypted: &[u8], expected: &[u8]) -> Result<()> {
    let mac_key = key.derive_mac_key()?;
    let mut mac = Hmac::<Sha256>::new_from_slice(&mac_key[..])
        .map_err(|_| VaultError::DecryptionFailed)?;

    mac.update(iv);
    mac.update(encrypted);

    mac.verify_slice(expected)
        .map_err(|_| VaultError::DecryptionFailed)
}
