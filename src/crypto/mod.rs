use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::config;
use crate::error::RvsError;

/// Derive a 32-byte AES-256 key from a password with PBKDF2-HMAC-SHA256.
pub fn derive_key(password: &str, salt: &[u8]) -> [u8; config::KEY_SIZE] {
    let mut key = [0u8; config::KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, config::PBKDF2_ROUNDS, &mut key);
    key
}

/// Encrypt a whole file into an envelope: `salt(16) | nonce_field(16) |
/// tag(16) | ciphertext`. Applied once before chunking, so recovering a
/// subset of chunks yields nothing, and corruption past the fountain code's
/// reach fails authentication instead of decoding silently wrong.
pub fn seal(plaintext: &[u8], password: &str) -> Result<Vec<u8>, RvsError> {
    let mut salt = [0u8; config::SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);

    // 12-byte nonce at the front of the 16-byte field; the trailing four
    // bytes are reserved and stay zero.
    let mut nonce_field = [0u8; config::NONCE_FIELD_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_field[..config::NONCE_SIZE]);

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let nonce = Nonce::from_slice(&nonce_field[..config::NONCE_SIZE]);

    let ct_and_tag = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| RvsError::InvalidInput("plaintext too large to encrypt".into()))?;
    // the aead crate appends the tag; the envelope stores it up front
    let (ciphertext, tag) = ct_and_tag.split_at(ct_and_tag.len() - config::TAG_SIZE);

    let mut envelope = Vec::with_capacity(config::ENVELOPE_OVERHEAD + ciphertext.len());
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&nonce_field);
    envelope.extend_from_slice(tag);
    envelope.extend_from_slice(ciphertext);
    Ok(envelope)
}

/// Parse and decrypt an envelope. Any structural or tag failure is an
/// `AuthFailure`; no plaintext bytes are produced on error.
pub fn open(envelope: &[u8], password: &str) -> Result<Vec<u8>, RvsError> {
    if envelope.len() < config::ENVELOPE_OVERHEAD {
        return Err(RvsError::AuthFailure("envelope truncated".into()));
    }

    let (salt, rest) = envelope.split_at(config::SALT_SIZE);
    let (nonce_field, rest) = rest.split_at(config::NONCE_FIELD_SIZE);
    let (tag, ciphertext) = rest.split_at(config::TAG_SIZE);

    let key = derive_key(password, salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let nonce = Nonce::from_slice(&nonce_field[..config::NONCE_SIZE]);

    let mut ct_and_tag = Vec::with_capacity(ciphertext.len() + config::TAG_SIZE);
    ct_and_tag.extend_from_slice(ciphertext);
    ct_and_tag.extend_from_slice(tag);

    cipher.decrypt(nonce, ct_and_tag.as_slice()).map_err(|_| {
        RvsError::AuthFailure("tag verification failed: wrong password or corrupted data".into())
    })
}
