//! Passphrase recipients
//!
//!   -> scrypt base64(salt[16]) log_n
//!   base64(ChaCha20-Poly1305(scrypt(passphrase, label || salt, 2^log_n, 8, 1), zero_nonce, file_key))
//!
//! A scrypt stanza must be the only stanza in its header.

use ::scrypt::{scrypt, Params};
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;
use zeroize::Zeroizing;

use super::{Identity, Recipient};
use crate::aead::{random_bytes, unwrap_file_key, wrap_file_key};
use crate::error::{ConfigError, FormatError, PolicyViolation, Result};
use crate::header::Stanza;
use crate::keys::FileKey;
use crate::wire::{
    b64_decode, b64_encode, DEFAULT_SCRYPT_WORK_FACTOR, KEY_SIZE, MAX_SCRYPT_WORK_FACTOR,
    SCRYPT_LABEL, SCRYPT_SALT_SIZE, SCRYPT_TAG, WRAPPED_KEY_SIZE,
};

fn derive_key(
    passphrase: &SecretString,
    salt: &[u8; SCRYPT_SALT_SIZE],
    log_n: u8,
) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let mut input = Vec::with_capacity(SCRYPT_LABEL.len() + SCRYPT_SALT_SIZE);
    input.extend_from_slice(SCRYPT_LABEL.as_bytes());
    input.extend_from_slice(salt);

    let params =
        Params::new(log_n, 8, 1, KEY_SIZE).map_err(|_| ConfigError::InvalidWorkFactor(log_n))?;
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    scrypt(
        passphrase.expose_secret().as_bytes(),
        &input,
        &params,
        key.as_mut_slice(),
    )
    .map_err(|_| ConfigError::InvalidWorkFactor(log_n))?;
    Ok(key)
}

/// Validate a decimal work factor: `^[1-9][0-9]*$`, at most 20.
fn parse_work_factor(s: &str) -> Result<u8> {
    let canonical = s.bytes().all(|b| b.is_ascii_digit()) && !s.starts_with('0') && !s.is_empty();
    if !canonical {
        return Err(FormatError::InvalidStanza.into());
    }
    let log_n = s.parse::<u64>().unwrap_or(u64::MAX);
    if log_n > u64::from(MAX_SCRYPT_WORK_FACTOR) {
        warn!(log_n, "refusing scrypt stanza with excessive work factor");
        return Err(PolicyViolation::WorkFactorTooHigh { log_n }.into());
    }
    // 1..=20 after the checks above
    Ok(log_n as u8)
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

pub struct ScryptRecipient {
    passphrase: SecretString,
    work_factor: u8,
}

impl ScryptRecipient {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: SecretString::from(passphrase.into()),
            work_factor: DEFAULT_SCRYPT_WORK_FACTOR,
        }
    }

    /// `log_n` must be in 1..=20.
    pub fn with_work_factor(mut self, log_n: u8) -> Result<Self> {
        if !(1..=MAX_SCRYPT_WORK_FACTOR).contains(&log_n) {
            return Err(ConfigError::InvalidWorkFactor(log_n).into());
        }
        self.work_factor = log_n;
        Ok(self)
    }

    pub fn work_factor(&self) -> u8 {
        self.work_factor
    }
}

impl Recipient for ScryptRecipient {
    fn wrap_file_key(&self, file_key: &FileKey) -> Result<Vec<Stanza>> {
        let salt: [u8; SCRYPT_SALT_SIZE] = random_bytes()?;
        let key = derive_key(&self.passphrase, &salt, self.work_factor)?;
        let body = wrap_file_key(&key, file_key)?;
        Ok(vec![Stanza::new(
            vec![
                SCRYPT_TAG.to_owned(),
                b64_encode(&salt),
                self.work_factor.to_string(),
            ],
            body,
        )?])
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

pub struct ScryptIdentity {
    passphrase: SecretString,
}

impl ScryptIdentity {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: SecretString::from(passphrase.into()),
        }
    }
}

impl Identity for ScryptIdentity {
    fn unwrap_stanza(&self, stanza: &Stanza) -> Result<Option<FileKey>> {
        if stanza.tag() != SCRYPT_TAG {
            return Ok(None);
        }
        let [_, salt, log_n] = stanza.args() else {
            return Err(FormatError::InvalidStanza.into());
        };
        let salt: [u8; SCRYPT_SALT_SIZE] = b64_decode(salt)?
            .try_into()
            .map_err(|_| FormatError::InvalidStanza)?;
        let log_n = parse_work_factor(log_n)?;
        if stanza.body().len() != WRAPPED_KEY_SIZE {
            return Err(FormatError::InvalidStanza.into());
        }

        let key = derive_key(&self.passphrase, &salt, log_n)?;
        Ok(unwrap_file_key(&key, stanza.body()))
    }

    fn unwrap_file_key(&self, stanzas: &[Stanza]) -> Result<Option<FileKey>> {
        if stanzas.len() != 1 && stanzas.iter().any(|s| s.tag() == SCRYPT_TAG) {
            warn!(stanzas = stanzas.len(), "scrypt stanza is not alone in header");
            return Err(PolicyViolation::ScryptNotAlone.into());
        }
        match stanzas {
            [stanza] => self.unwrap_stanza(stanza),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn wrap(passphrase: &str, log_n: u8, fk: &FileKey) -> Vec<Stanza> {
        ScryptRecipient::new(passphrase)
            .with_work_factor(log_n)
            .unwrap()
            .wrap_file_key(fk)
            .unwrap()
    }

    #[test]
    fn test_wrap_unwrap() {
        let fk = FileKey::from_bytes([0x33; 16]);
        let stanzas = wrap("hunter2", 2, &fk);
        assert_eq!(stanzas[0].args().len(), 3);
        assert_eq!(stanzas[0].args()[2], "2");
        let back = ScryptIdentity::new("hunter2")
            .unwrap_file_key(&stanzas)
            .unwrap()
            .unwrap();
        assert_eq!(back.as_bytes(), fk.as_bytes());
    }

    #[test]
    fn test_wrong_passphrase_is_none() {
        let fk = FileKey::from_bytes([0x33; 16]);
        let stanzas = wrap("hunter2", 2, &fk);
        assert!(ScryptIdentity::new("hunter3")
            .unwrap_file_key(&stanzas)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_not_alone_is_policy_error() {
        let fk = FileKey::from_bytes([0x33; 16]);
        let mut stanzas = wrap("hunter2", 2, &fk);
        stanzas.push(Stanza::new(vec!["X25519".into(), "abc".into()], vec![]).unwrap());
        assert!(matches!(
            ScryptIdentity::new("hunter2").unwrap_file_key(&stanzas),
            Err(Error::Policy(PolicyViolation::ScryptNotAlone))
        ));
    }

    #[test]
    fn test_no_scrypt_stanza_is_none() {
        let stanzas = vec![
            Stanza::new(vec!["X25519".into(), "abc".into()], vec![]).unwrap(),
            Stanza::new(vec!["X25519".into(), "def".into()], vec![]).unwrap(),
        ];
        assert!(ScryptIdentity::new("x")
            .unwrap_file_key(&stanzas)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_work_factor_parsing() {
        assert_eq!(parse_work_factor("1").unwrap(), 1);
        assert_eq!(parse_work_factor("20").unwrap(), 20);
        for bad in ["", "0", "01", "+5", "5 ", "x", "-1"] {
            assert!(
                matches!(parse_work_factor(bad), Err(Error::Format(_))),
                "{bad:?}"
            );
        }
        assert!(matches!(
            parse_work_factor("21"),
            Err(Error::Policy(PolicyViolation::WorkFactorTooHigh { log_n: 21 }))
        ));
        assert!(matches!(
            parse_work_factor("99999999999999999999999"),
            Err(Error::Policy(_))
        ));
    }

    #[test]
    fn test_with_work_factor_bounds() {
        assert!(ScryptRecipient::new("p").with_work_factor(0).is_err());
        assert!(ScryptRecipient::new("p").with_work_factor(21).is_err());
        assert_eq!(
            ScryptRecipient::new("p").with_work_factor(20).unwrap().work_factor(),
            20
        );
    }
}
