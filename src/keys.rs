//! Key material and key strings
//!
//! Recipients are lower-case bech32 (`age1…`, `age1pq1…`); identities are the
//! same encoding upper-cased (`AGE-SECRET-KEY-1…`, `AGE-SECRET-KEY-PQ-1…`).

use core::fmt;

use bech32::{FromBase32, ToBase32, Variant};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::aead::random_bytes;
use crate::error::{ConfigError, Error, Result};
use crate::kem::{HybridX25519MlKem768, KemProvider};
use crate::recipients::AnyIdentity;
use crate::wire::FILE_KEY_SIZE;

// ---------------------------------------------------------------------------
// File key
// ---------------------------------------------------------------------------

/// The per-file secret every stanza wraps.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FileKey([u8; FILE_KEY_SIZE]);

impl FileKey {
    pub fn generate() -> Result<Self> {
        random_bytes().map(Self)
    }

    pub fn from_bytes(bytes: [u8; FILE_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FILE_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileKey([REDACTED])")
    }
}

// ---------------------------------------------------------------------------
// Bech32 key strings
// ---------------------------------------------------------------------------

pub(crate) const X25519_RECIPIENT_HRP: &str = "age";
pub(crate) const X25519_IDENTITY_HRP: &str = "age-secret-key-";
pub(crate) const HYBRID_RECIPIENT_HRP: &str = "age1pq";
pub(crate) const HYBRID_IDENTITY_HRP: &str = "age-secret-key-pq-";

/// Decode a bech32 key string whose literal prefix (HRP plus separator, in
/// the expected case) must be exactly `hrp` + "1" in `upper` or lower case.
pub(crate) fn decode_key(s: &str, hrp: &str, upper: bool) -> Option<Vec<u8>> {
    let prefix = if upper {
        format!("{}1", hrp.to_ascii_uppercase())
    } else {
        format!("{hrp}1")
    };
    if !s.starts_with(&prefix) {
        return None;
    }
    let (decoded_hrp, data, variant) = bech32::decode(s).ok()?;
    if decoded_hrp != hrp || variant != Variant::Bech32 {
        return None;
    }
    Vec::<u8>::from_base32(&data).ok()
}

pub(crate) fn encode_key(hrp: &str, data: &[u8], upper: bool) -> Result<String> {
    let s = bech32::encode(hrp, data.to_base32(), Variant::Bech32).map_err(|_| {
        Error::Config(if upper {
            ConfigError::InvalidIdentity
        } else {
            ConfigError::InvalidRecipient
        })
    })?;
    Ok(if upper { s.to_ascii_uppercase() } else { s })
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// New X25519 identity, `AGE-SECRET-KEY-1…`.
pub fn generate_identity() -> Result<String> {
    let scalar = Zeroizing::new(random_bytes::<32>()?);
    encode_key(X25519_IDENTITY_HRP, scalar.as_slice(), true)
}

/// New hybrid ML-KEM-768 + X25519 identity, `AGE-SECRET-KEY-PQ-1…`.
pub fn generate_hybrid_identity() -> Result<String> {
    let (_, sk) = HybridX25519MlKem768::keygen();
    let bytes = Zeroizing::new(sk.to_bytes());
    encode_key(HYBRID_IDENTITY_HRP, bytes.as_slice(), true)
}

/// Recipient string for an X25519 or hybrid identity string.
pub fn identity_to_recipient(identity: &str) -> Result<String> {
    match identity.parse::<AnyIdentity>()? {
        AnyIdentity::X25519(id) => Ok(id.to_public().to_string()),
        AnyIdentity::Hybrid(id) => Ok(id.to_public().to_string()),
        _ => Err(ConfigError::InvalidIdentity.into()),
    }
}

/// Parse an identity file: one identity per line, blank lines and lines
/// starting with `#` ignored.
pub fn parse_identity_file(contents: &str) -> Result<Vec<AnyIdentity>> {
    let identities = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::parse::<AnyIdentity>)
        .collect::<Result<Vec<_>>>()?;
    if identities.is_empty() {
        return Err(ConfigError::NoIdentities.into());
    }
    Ok(identities)
}
