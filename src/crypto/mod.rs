//! Cryptographic primitives for connvault.
//!
//! This module provides:
//! - The process-wide `EncryptionKey` and HKDF sub-keys (`keys`)
//! - AES-256-CBC password encryption with an HMAC tag (`encryption`)

pub mod encryption;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, EncryptionKey, ...};
pub use encryption::{decrypt, encrypt, Ciphertext};
pub use keys::EncryptionKey;
