//! Post-quantum hybrid recipients (ML-KEM-768 + X25519)
//!
//!   -> mlkem768x25519 base64(enc[1120])
//!   base64(HPKE-Seal(shared_secret, "age-encryption.org/mlkem768x25519", file_key))

use core::fmt;
use core::str::FromStr;

use tracing::debug;
use zeroize::Zeroizing;

use super::{Identity, Recipient};
use crate::error::{ConfigError, Error, FormatError, Result};
use crate::header::Stanza;
use crate::hpke;
use crate::kem::{HybridX25519MlKem768, KemProvider, PublicKey, SecretKey};
use crate::keys::{decode_key, encode_key, FileKey, HYBRID_IDENTITY_HRP, HYBRID_RECIPIENT_HRP};
use crate::wire::{
    b64_decode, b64_encode, FILE_KEY_SIZE, KEM_CIPHERTEXT_BYTES, MLKEM768X25519_LABEL,
    MLKEM768X25519_TAG, WRAPPED_KEY_SIZE,
};

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct HybridRecipient {
    public_key: PublicKey,
}

impl HybridRecipient {
    pub fn from_public_key(public_key: PublicKey) -> Self {
        Self { public_key }
    }
}

impl FromStr for HybridRecipient {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = decode_key(s, HYBRID_RECIPIENT_HRP, false).ok_or(ConfigError::InvalidRecipient)?;
        Ok(Self {
            public_key: PublicKey::from_bytes(&bytes)?,
        })
    }
}

impl fmt::Display for HybridRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = encode_key(HYBRID_RECIPIENT_HRP, &self.public_key.to_bytes(), false)
            .map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl Recipient for HybridRecipient {
    fn wrap_file_key(&self, file_key: &FileKey) -> Result<Vec<Stanza>> {
        let (ss, enc) = HybridX25519MlKem768::encapsulate(&self.public_key)?;
        let ss = Zeroizing::new(ss);
        let body = hpke::seal(ss.as_slice(), MLKEM768X25519_LABEL.as_bytes(), file_key.as_bytes())?;
        Ok(vec![Stanza::new(
            vec![MLKEM768X25519_TAG.to_owned(), b64_encode(&enc)],
            body,
        )?])
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

pub struct HybridIdentity {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl HybridIdentity {
    /// A fresh random identity.
    pub fn generate() -> Self {
        let (public_key, secret_key) = HybridX25519MlKem768::keygen();
        Self {
            secret_key,
            public_key,
        }
    }

    pub fn to_public(&self) -> HybridRecipient {
        HybridRecipient {
            public_key: self.public_key.clone(),
        }
    }
}

impl FromStr for HybridIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            decode_key(s, HYBRID_IDENTITY_HRP, true).ok_or(ConfigError::InvalidIdentity)?,
        );
        let secret_key = SecretKey::from_bytes(&bytes)?;
        let public_key = secret_key.public_key()?;
        Ok(Self {
            secret_key,
            public_key,
        })
    }
}

impl fmt::Display for HybridIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = Zeroizing::new(self.secret_key.to_bytes());
        let s = Zeroizing::new(
            encode_key(HYBRID_IDENTITY_HRP, bytes.as_slice(), true).map_err(|_| fmt::Error)?,
        );
        f.write_str(&s)
    }
}

impl Identity for HybridIdentity {
    fn unwrap_stanza(&self, stanza: &Stanza) -> Result<Option<FileKey>> {
        if stanza.tag() != MLKEM768X25519_TAG {
            return Ok(None);
        }
        let [_, enc] = stanza.args() else {
            return Err(FormatError::InvalidStanza.into());
        };
        let enc = b64_decode(enc)?;
        if enc.len() != KEM_CIPHERTEXT_BYTES || stanza.body().len() != WRAPPED_KEY_SIZE {
            return Err(FormatError::InvalidStanza.into());
        }

        // From here on a failure only means the stanza is for someone else.
        let ss = match HybridX25519MlKem768::decapsulate(&self.secret_key, &enc) {
            Ok(ss) => Zeroizing::new(ss),
            Err(Error::Decryption) => return Ok(None),
            Err(e) => return Err(e),
        };
        let Some(pt) = hpke::open(ss.as_slice(), MLKEM768X25519_LABEL.as_bytes(), stanza.body())?
        else {
            debug!("mlkem768x25519 stanza did not open");
            return Ok(None);
        };
        let pt = Zeroizing::new(pt);
        let bytes: [u8; FILE_KEY_SIZE] = pt
            .as_slice()
            .try_into()
            .map_err(|_| FormatError::InvalidStanza)?;
        Ok(Some(FileKey::from_bytes(bytes)))
    }
}
