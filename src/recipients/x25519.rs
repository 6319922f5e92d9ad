//! X25519 recipients
//!
//!   -> X25519 base64(ephemeral_share)
//!   base64(ChaCha20-Poly1305(wrap_key, zero_nonce, file_key))
//!
//! wrap_key = HKDF(ecdh(ephemeral, recipient), share || recipient, "age-encryption.org/v1/X25519")

use core::fmt;
use core::str::FromStr;

use rand_core::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::{Identity, Recipient};
use crate::aead::{unwrap_file_key, wrap_file_key};
use crate::error::{ConfigError, Error, FormatError, Result};
use crate::header::Stanza;
use crate::kdf::derive;
use crate::keys::{
    decode_key, encode_key, FileKey, X25519_IDENTITY_HRP, X25519_RECIPIENT_HRP,
};
use crate::wire::{b64_decode, b64_encode, WRAPPED_KEY_SIZE, X25519_KEY_BYTES, X25519_LABEL, X25519_TAG};

fn wrap_salt(share: &PublicKey, recipient: &PublicKey) -> [u8; 2 * X25519_KEY_BYTES] {
    let mut salt = [0u8; 2 * X25519_KEY_BYTES];
    salt[..X25519_KEY_BYTES].copy_from_slice(share.as_bytes());
    salt[X25519_KEY_BYTES..].copy_from_slice(recipient.as_bytes());
    salt
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct X25519Recipient {
    point: PublicKey,
}

impl X25519Recipient {
    pub fn from_bytes(bytes: [u8; X25519_KEY_BYTES]) -> Self {
        Self {
            point: PublicKey::from(bytes),
        }
    }

    pub fn as_bytes(&self) -> &[u8; X25519_KEY_BYTES] {
        self.point.as_bytes()
    }
}

impl FromStr for X25519Recipient {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; X25519_KEY_BYTES] = decode_key(s, X25519_RECIPIENT_HRP, false)
            .and_then(|b| b.try_into().ok())
            .ok_or(ConfigError::InvalidRecipient)?;
        Ok(Self::from_bytes(bytes))
    }
}

impl fmt::Display for X25519Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = encode_key(X25519_RECIPIENT_HRP, self.point.as_bytes(), false)
            .map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl Recipient for X25519Recipient {
    fn wrap_file_key(&self, file_key: &FileKey) -> Result<Vec<Stanza>> {
        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let share = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(&self.point);
        if !shared.was_contributory() {
            return Err(ConfigError::InvalidRecipient.into());
        }

        let salt = wrap_salt(&share, &self.point);
        let key = Zeroizing::new(derive(shared.as_bytes(), Some(salt.as_slice()), X25519_LABEL)?);
        let body = wrap_file_key(&key, file_key)?;

        Ok(vec![Stanza::new(
            vec![X25519_TAG.to_owned(), b64_encode(share.as_bytes())],
            body,
        )?])
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

pub struct X25519Identity {
    secret: StaticSecret,
    recipient: PublicKey,
}

impl X25519Identity {
    pub fn from_bytes(bytes: [u8; X25519_KEY_BYTES]) -> Self {
        let secret = StaticSecret::from(bytes);
        let recipient = PublicKey::from(&secret);
        Self { secret, recipient }
    }

    pub fn to_public(&self) -> X25519Recipient {
        X25519Recipient {
            point: self.recipient,
        }
    }
}

impl FromStr for X25519Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            decode_key(s, X25519_IDENTITY_HRP, true).ok_or(ConfigError::InvalidIdentity)?,
        );
        let scalar: [u8; X25519_KEY_BYTES] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ConfigError::InvalidIdentity)?;
        Ok(Self::from_bytes(scalar))
    }
}

impl Identity for X25519Identity {
    fn unwrap_stanza(&self, stanza: &Stanza) -> Result<Option<FileKey>> {
        if stanza.tag() != X25519_TAG {
            return Ok(None);
        }
        let [_, share] = stanza.args() else {
            return Err(FormatError::InvalidStanza.into());
        };
        let share: [u8; X25519_KEY_BYTES] = b64_decode(share)?
            .try_into()
            .map_err(|_| FormatError::InvalidStanza)?;
        if stanza.body().len() != WRAPPED_KEY_SIZE {
            return Err(FormatError::InvalidStanza.into());
        }

        let share = PublicKey::from(share);
        let shared = self.secret.diffie_hellman(&share);
        if !shared.was_contributory() {
            return Err(FormatError::InvalidStanza.into());
        }

        let salt = wrap_salt(&share, &self.recipient);
        let key = Zeroizing::new(derive(shared.as_bytes(), Some(salt.as_slice()), X25519_LABEL)?);
        Ok(unwrap_file_key(&key, stanza.body()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: &str =
        "AGE-SECRET-KEY-1RKH0DGHQ0FU6VLXX2VW6Y3W2TKK7KR4J36N9SNDXK75JHCJ3N6JQNZJF5J";
    const RECIPIENT: &str = "age1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl6";

    #[test]
    fn test_recipient_string_round_trip() {
        let r: X25519Recipient = RECIPIENT.parse().unwrap();
        assert_eq!(r.to_string(), RECIPIENT);
    }

    #[test]
    fn test_identity_public() {
        let id: X25519Identity = IDENTITY.parse().unwrap();
        assert_eq!(id.to_public().to_string(), RECIPIENT);
    }

    #[test]
    fn test_bad_recipients() {
        for bad in [
            "age1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl",
            "AGE1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl6",
            "ag1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl6",
            "age1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl7",
        ] {
            assert!(bad.parse::<X25519Recipient>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_wrap_unwrap() {
        let id: X25519Identity = IDENTITY.parse().unwrap();
        let fk = FileKey::from_bytes([0x5a; 16]);
        let stanzas = id.to_public().wrap_file_key(&fk).unwrap();
        assert_eq!(stanzas.len(), 1);
        assert_eq!(stanzas[0].args().len(), 2);
        assert_eq!(stanzas[0].tag(), "X25519");
        let back = id.unwrap_file_key(&stanzas).unwrap().unwrap();
        assert_eq!(back.as_bytes(), fk.as_bytes());
    }

    #[test]
    fn test_other_identity_gets_none() {
        let id: X25519Identity = IDENTITY.parse().unwrap();
        let other = X25519Identity::from_bytes([7u8; 32]);
        let fk = FileKey::from_bytes([1; 16]);
        let stanzas = id.to_public().wrap_file_key(&fk).unwrap();
        assert!(other.unwrap_file_key(&stanzas).unwrap().is_none());
    }

    #[test]
    fn test_foreign_stanza_ignored() {
        let id: X25519Identity = IDENTITY.parse().unwrap();
        let s = Stanza::new(vec!["ssh-ed25519".into(), "abc".into()], vec![1, 2]).unwrap();
        assert!(id.unwrap_stanza(&s).unwrap().is_none());
    }

    #[test]
    fn test_malformed_stanza_is_error() {
        let id: X25519Identity = IDENTITY.parse().unwrap();
        let short = Stanza::new(vec!["X25519".into(), "abc".into()], vec![0; 32]).unwrap();
        assert!(id.unwrap_stanza(&short).is_err());
        let extra = Stanza::new(
            vec!["X25519".into(), b64_encode(&[9u8; 32]), "x".into()],
            vec![0; 32],
        )
        .unwrap();
        assert!(id.unwrap_stanza(&extra).is_err());
        let body = Stanza::new(vec!["X25519".into(), b64_encode(&[9u8; 32])], vec![0; 31]).unwrap();
        assert!(id.unwrap_stanza(&body).is_err());
    }

    #[test]
    fn test_low_order_share_rejected() {
        let id: X25519Identity = IDENTITY.parse().unwrap();
        let s = Stanza::new(vec!["X25519".into(), b64_encode(&[0u8; 32])], vec![0; 32]).unwrap();
        assert!(matches!(
            id.unwrap_stanza(&s),
            Err(Error::Format(FormatError::InvalidStanza))
        ));
    }
}
