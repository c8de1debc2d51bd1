//! At-rest protection for the API credential.
//!
//! The plaintext is XORed with a SHA-256 counter-mode keystream derived from
//! the install secret and a random nonce, and authenticated with a truncated
//! SHA-256 tag. The stored form is `v1:` followed by base64 of
//! `nonce || tag || ciphertext`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::StoreError;

const PREFIX: &str = "v1:";
const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 16;
const SECRET_LEN: usize = 32;

pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_LEN];
    rand::thread_rng().fill(&mut bytes);
    STANDARD.encode(bytes)
}

fn keystream_block(secret: &[u8], nonce: &[u8], counter: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"keystream");
    hasher.update(secret);
    hasher.update(nonce);
    hasher.update(counter.to_le_bytes());
    hasher.finalize().into()
}

fn apply_keystream(secret: &[u8], nonce: &[u8], data: &mut [u8]) {
    for (i, chunk) in data.chunks_mut(32).enumerate() {
        let block = keystream_block(secret, nonce, i as u64);
        for (byte, key) in chunk.iter_mut().zip(block.iter()) {
            *byte ^= key;
        }
    }
}

fn tag(secret: &[u8], nonce: &[u8], ciphertext: &[u8]) -> [u8; TAG_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(b"tag");
    hasher.update(secret);
    hasher.update(nonce);
    hasher.update(ciphertext);
    let digest = hasher.finalize();
    let mut out = [0u8; TAG_LEN];
    out.copy_from_slice(&digest[..TAG_LEN]);
    out
}

fn decode_secret(secret: &str) -> Result<Vec<u8>, StoreError> {
    STANDARD
        .decode(secret.trim())
        .map_err(|e| StoreError::crypto(format!("invalid install secret: {}", e)))
}

pub fn encrypt(plaintext: &str, secret: &str) -> Result<String, StoreError> {
    let secret = decode_secret(secret)?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut nonce);

    let mut data = plaintext.as_bytes().to_vec();
    apply_keystream(&secret, &nonce, &mut data);
    let tag = tag(&secret, &nonce, &data);

    let mut blob = Vec::with_capacity(NONCE_LEN + TAG_LEN + data.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&tag);
    blob.extend_from_slice(&data);
    Ok(format!("{}{}", PREFIX, STANDARD.encode(blob)))
}

pub fn decrypt(stored: &str, secret: &str) -> Result<String, StoreError> {
    let secret = decode_secret(secret)?;
    let encoded = stored
        .strip_prefix(PREFIX)
        .ok_or_else(|| StoreError::crypto("unsupported credential format"))?;
    let blob = STANDARD
        .decode(encoded)
        .map_err(|e| StoreError::crypto(format!("invalid credential encoding: {}", e)))?;
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(StoreError::crypto("credential blob is truncated"));
    }

    let (nonce, rest) = blob.split_at(NONCE_LEN);
    let (expected, ciphertext) = rest.split_at(TAG_LEN);
    if tag(&secret, nonce, ciphertext) != expected {
        return Err(StoreError::crypto("credential failed integrity check"));
    }

    let mut data = ciphertext.to_vec();
    apply_keystream(&secret, nonce, &mut data);
    String::from_utf8(data).map_err(|_| StoreError::crypto("credential is not valid UTF-8"))
}
