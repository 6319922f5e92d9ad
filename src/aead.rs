//! AEAD: ChaCha20-Poly1305 (IETF, 96-bit nonce)

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};

use crate::error::{Error, Result};
use crate::keys::FileKey;
use crate::wire::{FILE_KEY_SIZE, KEY_SIZE, NONCE_SIZE, WRAPPED_KEY_SIZE};

/// Fill a fixed-size array from the OS CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut out = [0u8; N];
    getrandom::getrandom(&mut out).map_err(|_| Error::Rng)?;
    Ok(out)
}

pub(crate) fn cipher(key: &[u8; KEY_SIZE]) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(Key::from_slice(key))
}

pub fn aead_seal(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    cipher(key)
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| Error::Encryption)
}

pub fn aead_open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    cipher(key)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::Decryption)
}

// ---------------------------------------------------------------------------
// File key wrapping
// ---------------------------------------------------------------------------

// Every wrapping key is derived fresh per stanza, so the nonce is fixed.
const ZERO_NONCE: [u8; NONCE_SIZE] = [0u8; NONCE_SIZE];

pub fn wrap_file_key(key: &[u8; KEY_SIZE], file_key: &FileKey) -> Result<Vec<u8>> {
    aead_seal(key, &ZERO_NONCE, file_key.as_bytes())
}

/// `None` when the body does not authenticate under `key`.
pub fn unwrap_file_key(key: &[u8; KEY_SIZE], body: &[u8]) -> Option<FileKey> {
    if body.len() != WRAPPED_KEY_SIZE {
        return None;
    }
    let mut pt = aead_open(key, &ZERO_NONCE, body).ok()?;
    let bytes: [u8; FILE_KEY_SIZE] = pt.as_slice().try_into().ok()?;
    zeroize::Zeroize::zeroize(&mut pt);
    Some(FileKey::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unwrap() {
        let key = [9u8; 32];
        let fk = FileKey::from_bytes([3u8; 16]);
        let body = wrap_file_key(&key, &fk).unwrap();
        assert_eq!(body.len(), WRAPPED_KEY_SIZE);
        let back = unwrap_file_key(&key, &body).unwrap();
        assert_eq!(back.as_bytes(), fk.as_bytes());
    }

    #[test]
    fn test_unwrap_wrong_key_is_none() {
        let fk = FileKey::from_bytes([3u8; 16]);
        let body = wrap_file_key(&[9u8; 32], &fk).unwrap();
        assert!(unwrap_file_key(&[8u8; 32], &body).is_none());
    }

    #[test]
    fn test_unwrap_wrong_length_is_none() {
        assert!(unwrap_file_key(&[9u8; 32], &[0u8; 31]).is_none());
    }

    #[test]
    fn test_open_tampered() {
        let key = [1u8; 32];
        let nonce = [2u8; 12];
        let mut ct = aead_seal(&key, &nonce, b"hello").unwrap();
        ct[0] ^= 0x80;
        assert!(matches!(aead_open(&key, &nonce, &ct), Err(Error::Decryption)));
    }

    #[test]
    fn test_random_bytes_differ() {
        let a: [u8; 16] = random_bytes().unwrap();
        let b: [u8; 16] = random_bytes().unwrap();
        assert_ne!(a, b);
    }
}
