//! Wire format (age-encryption.org/v1)
//!
//! Format:
//!   "age-encryption.org/v1\n"
//!   ( "-> " arg (" " arg)* "\n" body-lines )+
//!   "--- " base64(mac) "\n"
//!   nonce[16] || STREAM ciphertext
//!
//! Body lines are unpadded base64 of at most 48 raw bytes; a line shorter
//! than 48 raw bytes (possibly empty) ends the stanza.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

use crate::error::FormatError;

/// First line of every file.
pub const VERSION_LINE: &str = "age-encryption.org/v1";

/// Stanza line prefix.
pub const STANZA_MARKER: &str = "->";

/// MAC line prefix, without the trailing space.
pub const MAC_MARKER: &str = "---";

/// Raw bytes per stanza body line.
pub const BODY_LINE_BYTES: usize = 48;

/// Header lines longer than this are rejected before they are buffered.
pub const MAX_HEADER_LINE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Key schedule labels
// ---------------------------------------------------------------------------

pub const HEADER_LABEL: &str = "header";
pub const PAYLOAD_LABEL: &str = "payload";
pub const X25519_LABEL: &str = "age-encryption.org/v1/X25519";
pub const SCRYPT_LABEL: &str = "age-encryption.org/v1/scrypt";
pub const MLKEM768X25519_LABEL: &str = "age-encryption.org/mlkem768x25519";

// ---------------------------------------------------------------------------
// Stanza tags
// ---------------------------------------------------------------------------

pub const X25519_TAG: &str = "X25519";
pub const SCRYPT_TAG: &str = "scrypt";
pub const MLKEM768X25519_TAG: &str = "mlkem768x25519";

// ---------------------------------------------------------------------------
// Component sizes
// ---------------------------------------------------------------------------

pub const FILE_KEY_SIZE: usize = 16;
pub const MAC_SIZE: usize = 32;
pub const PAYLOAD_NONCE_SIZE: usize = 16;
pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

/// A wrapped file key: ChaCha20-Poly1305 over 16 bytes.
pub const WRAPPED_KEY_SIZE: usize = FILE_KEY_SIZE + TAG_SIZE;

/// X25519 public key / scalar size
pub const X25519_KEY_BYTES: usize = 32;

/// ML-KEM-768 component sizes
pub const MLKEM_CIPHERTEXT_BYTES: usize = 1088;
pub const MLKEM_PUBLIC_KEY_BYTES: usize = 1184;
pub const MLKEM_SECRET_KEY_BYTES: usize = 2400;

/// Hybrid encapsulated key: mlkem_ct[1088] || x25519_ephemeral_pk[32]
pub const KEM_CIPHERTEXT_BYTES: usize = MLKEM_CIPHERTEXT_BYTES + X25519_KEY_BYTES; // 1120

/// Hybrid public key: mlkem_ek[1184] || x25519_pk[32]
pub const KEM_PUBLIC_KEY_BYTES: usize = MLKEM_PUBLIC_KEY_BYTES + X25519_KEY_BYTES; // 1216

/// Hybrid secret key: mlkem_dk[2400] || x25519_sk[32]
pub const KEM_SECRET_KEY_BYTES: usize = MLKEM_SECRET_KEY_BYTES + X25519_KEY_BYTES; // 2432

pub const SHARED_SECRET_BYTES: usize = 32;

// ---------------------------------------------------------------------------
// scrypt
// ---------------------------------------------------------------------------

pub const SCRYPT_SALT_SIZE: usize = 16;
pub const DEFAULT_SCRYPT_WORK_FACTOR: u8 = 18;
pub const MAX_SCRYPT_WORK_FACTOR: u8 = 20;

// ---------------------------------------------------------------------------
// Base64
// ---------------------------------------------------------------------------

pub fn b64_encode(data: &[u8]) -> String {
    STANDARD_NO_PAD.encode(data)
}

/// Strict unpadded base64: rejects padding, and rejects any string that
/// does not re-encode to itself (non-zero trailing bits).
pub fn b64_decode(s: &str) -> Result<Vec<u8>, FormatError> {
    let bytes = STANDARD_NO_PAD
        .decode(s)
        .map_err(|_| FormatError::InvalidBase64)?;
    if STANDARD_NO_PAD.encode(&bytes) != s {
        return Err(FormatError::InvalidBase64);
    }
    Ok(bytes)
}
