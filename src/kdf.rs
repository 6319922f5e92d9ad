//! Key schedule (HKDF-SHA256)
//!
//!   derive(secret, salt, label) = HKDF-Expand(HKDF-Extract(salt, secret), label, 32)
//!
//! A missing salt is 32 zero bytes. Only one 32-byte block is ever expanded.
//!
//!   header key  = derive(file_key, None,  "header")
//!   payload key = derive(file_key, nonce, "payload")

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};
use crate::keys::FileKey;
use crate::wire::{HEADER_LABEL, KEY_SIZE, MAC_SIZE, PAYLOAD_LABEL, PAYLOAD_NONCE_SIZE};

type HmacSha256 = Hmac<Sha256>;

pub fn derive(secret: &[u8], salt: Option<&[u8]>, label: &str) -> Result<[u8; KEY_SIZE]> {
    let hk = Hkdf::<Sha256>::new(salt, secret);
    let mut out = [0u8; KEY_SIZE];
    hk.expand(label.as_bytes(), &mut out)
        .map_err(|_| Error::KeyDerivation)?;
    Ok(out)
}

pub fn header_key(file_key: &FileKey) -> Result<[u8; KEY_SIZE]> {
    derive(file_key.as_bytes(), None, HEADER_LABEL)
}

pub fn payload_key(
    file_key: &FileKey,
    nonce: &[u8; PAYLOAD_NONCE_SIZE],
) -> Result<[u8; KEY_SIZE]> {
    derive(file_key.as_bytes(), Some(nonce.as_slice()), PAYLOAD_LABEL)
}

/// HMAC-SHA256 over `header_no_mac` under the header key.
pub fn header_mac(file_key: &FileKey, header_no_mac: &[u8]) -> Result<[u8; MAC_SIZE]> {
    let key = header_key(file_key)?;
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| Error::KeyDerivation)?;
    mac.update(header_no_mac);
    let tag = mac.finalize().into_bytes();
    let mut out = [0u8; MAC_SIZE];
    out.copy_from_slice(&tag);
    Ok(out)
}

/// Constant-time header MAC check. Any mismatch is `Error::Decryption`.
pub fn verify_header_mac(
    file_key: &FileKey,
    header_no_mac: &[u8],
    expected: &[u8; MAC_SIZE],
) -> Result<()> {
    let computed = header_mac(file_key, header_no_mac)?;
    if bool::from(computed.ct_eq(expected)) {
        Ok(())
    } else {
        Err(Error::Decryption)
    }
}
