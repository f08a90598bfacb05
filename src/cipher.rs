//! Encrypted copies of source documents.
//!
//! A document is sealed with AES-256-GCM under a fresh key and nonce. The
//! published payload is `nonce (12) ‖ tag (16) ‖ ciphertext`; the key and
//! nonce go back to the caller, who is responsible for keeping them.

use crate::error::{Error, Result};
use crate::model::{Document, EncryptionArtifact, KEY_LEN, NONCE_LEN};
use crate::publish::{Payload, Publisher};
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::time::Instant;

/// Length of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Retries used for encrypted uploads when the caller has no preference.
pub const DEFAULT_RETRIES: u32 = 3;

/// Name used for in-memory documents without a file name.
pub fn default_encrypted_filename() -> String {
    format!(
        "encrypted-pdf-{}.pdf",
        chrono::Utc::now().timestamp_millis()
    )
}

/// Encrypt `plaintext` into a `nonce ‖ tag ‖ ciphertext` payload.
pub fn seal(plaintext: &[u8], key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.into());
    let mut ciphertext = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut ciphertext)
        .map_err(|e| Error::Encryption(format!("encryption failed: {}", e)))?;

    let mut payload = Vec::with_capacity(NONCE_LEN + TAG_LEN + ciphertext.len());
    payload.extend_from_slice(nonce);
    payload.extend_from_slice(&tag);
    payload.extend_from_slice(&ciphertext);
    Ok(payload)
}

/// Decrypt a payload produced by [`seal`], verifying its tag.
pub fn open_payload(key: &[u8; KEY_LEN], payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() < NONCE_LEN + TAG_LEN {
        return Err(Error::Encryption(format!(
            "payload of {} bytes is shorter than nonce and tag",
            payload.len()
        )));
    }

    let (nonce, rest) = payload.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let cipher = Aes256Gcm::new(key.into());
    let mut plaintext = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            b"",
            &mut plaintext,
            Tag::from_slice(tag),
        )
        .map_err(|_| Error::Encryption("authentication failed".into()))?;
    Ok(plaintext)
}

/// Encrypt a document under a fresh key and publish the ciphertext.
pub async fn encrypt_and_publish(
    publisher: &Publisher,
    document: &Document,
    retries: u32,
) -> Result<EncryptionArtifact> {
    encrypt_and_publish_with_rng(publisher, document, retries, &mut OsRng).await
}

/// [`encrypt_and_publish`] drawing key material from `rng`.
pub async fn encrypt_and_publish_with_rng<R: RngCore + CryptoRng>(
    publisher: &Publisher,
    document: &Document,
    retries: u32,
    rng: &mut R,
) -> Result<EncryptionArtifact> {
    if !document.is_resolvable() {
        let path = document
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        return Err(Error::EncryptionInput(format!(
            "{} is not a readable file",
            path
        )));
    }
    let data = document
        .read()
        .map_err(|e| Error::EncryptionInput(e.to_string()))?;
    let filename = document
        .filename()
        .unwrap_or_else(default_encrypted_filename);

    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut key);
    rng.fill_bytes(&mut iv);

    let started = Instant::now();
    let payload = seal(&data, &key, &iv)?;
    log::info!(
        "Encrypting {} ({} bytes) took {}ms",
        filename,
        data.len(),
        started.elapsed().as_millis()
    );

    let content_id = publisher
        .publish(&Payload::Bytes(payload), &filename, retries)
        .await?;
    log::info!("Encrypted PDF uploaded with content id {}", content_id);

    Ok(EncryptionArtifact {
        content_id,
        key,
        iv,
    })
}
