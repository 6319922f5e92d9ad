//! HPKE base mode, one-shot (RFC 9180 key schedule)
//!
//! suite_id = "HPKE" || kem_id(0x647a) || kdf_id(0x0001) || aead_id(0x0003)
//!
//!   LabeledExtract(salt, label, ikm)   = Extract(salt, "HPKE-v1" || suite_id || label || ikm)
//!   LabeledExpand(prk, label, info, L) = Expand(prk, I2OSP(L, 2) || "HPKE-v1" || suite_id || label || info, L)
//!
//! The sealed message is encrypted once, so the nonce is the base nonce.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::aead::{aead_open, aead_seal};
use crate::error::{Error, Result};
use crate::wire::{KEY_SIZE, NONCE_SIZE};

const VERSION_LABEL: &[u8] = b"HPKE-v1";

/// "HPKE" || 0x647a (ML-KEM-768 + X25519) || 0x0001 (HKDF-SHA256) || 0x0003 (ChaCha20-Poly1305)
const SUITE_ID: [u8; 10] = [b'H', b'P', b'K', b'E', 0x64, 0x7a, 0x00, 0x01, 0x00, 0x03];

// base mode
const MODE: u8 = 0x00;

fn labeled_extract(salt: &[u8], label: &[u8], ikm: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut labeled_ikm = Zeroizing::new(Vec::with_capacity(
        VERSION_LABEL.len() + SUITE_ID.len() + label.len() + ikm.len(),
    ));
    labeled_ikm.extend_from_slice(VERSION_LABEL);
    labeled_ikm.extend_from_slice(&SUITE_ID);
    labeled_ikm.extend_from_slice(label);
    labeled_ikm.extend_from_slice(ikm);
    let (prk, _) = Hkdf::<Sha256>::extract(Some(salt), &labeled_ikm);
    Zeroizing::new(prk.to_vec())
}

fn labeled_expand(prk: &[u8], label: &[u8], info: &[u8], out: &mut [u8]) -> Result<()> {
    let len = u16::try_from(out.len()).map_err(|_| Error::KeyDerivation)?;
    let mut labeled_info =
        Vec::with_capacity(2 + VERSION_LABEL.len() + SUITE_ID.len() + label.len() + info.len());
    labeled_info.extend_from_slice(&len.to_be_bytes());
    labeled_info.extend_from_slice(VERSION_LABEL);
    labeled_info.extend_from_slice(&SUITE_ID);
    labeled_info.extend_from_slice(label);
    labeled_info.extend_from_slice(info);
    Hkdf::<Sha256>::from_prk(prk)
        .map_err(|_| Error::KeyDerivation)?
        .expand(&labeled_info, out)
        .map_err(|_| Error::KeyDerivation)
}

/// Derive (key, base_nonce) from a KEM shared secret and `info`.
pub fn key_schedule(
    shared_secret: &[u8],
    info: &[u8],
) -> Result<(Zeroizing<[u8; KEY_SIZE]>, [u8; NONCE_SIZE])> {
    let psk_id_hash = labeled_extract(b"", b"psk_id_hash", b"");
    let info_hash = labeled_extract(b"", b"info_hash", info);

    let mut context = Vec::with_capacity(1 + psk_id_hash.len() + info_hash.len());
    context.push(MODE);
    context.extend_from_slice(&psk_id_hash);
    context.extend_from_slice(&info_hash);

    let secret = labeled_extract(shared_secret, b"secret", b"");

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    labeled_expand(&secret, b"key", &context, key.as_mut_slice())?;
    let mut base_nonce = [0u8; NONCE_SIZE];
    labeled_expand(&secret, b"base_nonce", &context, &mut base_nonce)?;
    Ok((key, base_nonce))
}

pub fn seal(shared_secret: &[u8], info: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let (key, nonce) = key_schedule(shared_secret, info)?;
    aead_seal(&key, &nonce, plaintext)
}

/// `None` if the ciphertext does not authenticate.
pub fn open(shared_secret: &[u8], info: &[u8], ciphertext: &[u8]) -> Result<Option<Vec<u8>>> {
    let (key, nonce) = key_schedule(shared_secret, info)?;
    Ok(aead_open(&key, &nonce, ciphertext).ok())
}
