// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG. Nonce reuse would be catastrophic for GCM security.

use guestlink_core::GuestlinkError;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

/// Encrypt plaintext with AES-256-GCM using a random 96-bit nonce.
///
/// Returns `(ciphertext_with_tag, nonce_bytes)`. The caller must store both
/// the ciphertext and the nonce to be able to decrypt later.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; 12]), GuestlinkError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| GuestlinkError::Vault("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    // Generate random 96-bit nonce.
    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; 12];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| GuestlinkError::Vault("failed to generate random nonce".to_string()))?;

    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    // Seal in place: plaintext buffer is extended with the authentication tag.
    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| GuestlinkError::Vault("AES-256-GCM encryption failed".to_string()))?;

    Ok((in_out, nonce_bytes))
}

/// Decrypt ciphertext with AES-256-GCM.
///
/// `ciphertext` must include the 16-byte authentication tag appended by [`seal`].
/// Returns the decrypted plaintext, or an error if the key is wrong or data is
/// tampered.
pub fn open(
    key: &[u8; 32],
    nonce_bytes: &[u8; 12],
    ciphertext: &[u8],
) -> Result<Vec<u8>, GuestlinkError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| GuestlinkError::Vault("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let nonce = Nonce::assume_unique_for_key(*nonce_bytes);

    let mut in_out = ciphertext.to_vec();
    let plaintext = less_safe
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            GuestlinkError::Vault(
                "AES-256-GCM decryption failed -- wrong key or corrupted data".to_string(),
            )
        })?;

    Ok(plaintext.to_vec())
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_random_key() -> Result<[u8; 32], GuestlinkError> {
    let rng = SystemRandom::new();
    let mut key = [0u8; 32];
    rng.fill(&mut key)
        .map_err(|_| GuestlinkError::Vault("failed to generate random key".to_string()))?;
    Ok(key)
}

/// Generate 32 random bytes of token material.
pub fn generate_token_bytes() -> Result<[u8; 32], GuestlinkError> {
    let rng = SystemRandom::new();
    let mut token = [0u8; 32];
    rng.fill(&mut token)
        .map_err(|_| GuestlinkError::Vault("failed to generate token material".to_string()))?;
    Ok(token)
}
