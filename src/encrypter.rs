//! Encrypter
//!
//! Output: header || nonce[16] || STREAM(payload_key, plaintext)

use std::io::Write;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use zeroize::Zeroizing;

use crate::aead::random_bytes;
use crate::error::{ConfigError, Result};
use crate::header::{encode_header, encode_header_no_mac};
use crate::io::StreamWriter;
use crate::kdf::{header_mac, payload_key};
use crate::keys::FileKey;
use crate::recipients::{AnyRecipient, Recipient, ScryptRecipient};
use crate::stream::encrypt_stream;
use crate::wire::{
    DEFAULT_SCRYPT_WORK_FACTOR, KEY_SIZE, MAX_SCRYPT_WORK_FACTOR, PAYLOAD_NONCE_SIZE, SCRYPT_TAG,
};

/// Encrypts to either one passphrase or any number of recipients.
pub struct Encrypter {
    passphrase: Option<SecretString>,
    work_factor: u8,
    recipients: Vec<AnyRecipient>,
}

impl Default for Encrypter {
    fn default() -> Self {
        Self::new()
    }
}

impl Encrypter {
    pub fn new() -> Self {
        Self {
            passphrase: None,
            work_factor: DEFAULT_SCRYPT_WORK_FACTOR,
            recipients: Vec::new(),
        }
    }

    /// Encrypt with a passphrase. Exclusive with every other recipient.
    pub fn set_passphrase(&mut self, passphrase: impl Into<String>) -> Result<()> {
        if self.passphrase.is_some() {
            return Err(ConfigError::MultiplePassphrases.into());
        }
        self.check_can_add(true)?;
        self.passphrase = Some(SecretString::from(passphrase.into()));
        Ok(())
    }

    /// scrypt work factor (log2 N) for the passphrase, 1..=20.
    pub fn set_scrypt_work_factor(&mut self, log_n: u8) -> Result<()> {
        if !(1..=MAX_SCRYPT_WORK_FACTOR).contains(&log_n) {
            return Err(ConfigError::InvalidWorkFactor(log_n).into());
        }
        self.work_factor = log_n;
        Ok(())
    }

    /// Add an `age1…` or `age1pq1…` recipient.
    pub fn add_recipient(&mut self, recipient: &str) -> Result<()> {
        let recipient = recipient.parse::<AnyRecipient>()?;
        self.add(recipient)
    }

    pub fn add(&mut self, recipient: AnyRecipient) -> Result<()> {
        self.check_can_add(matches!(recipient, AnyRecipient::Scrypt(_)))?;
        self.recipients.push(recipient);
        Ok(())
    }

    pub fn add_custom_recipient(&mut self, recipient: Box<dyn Recipient + Send + Sync>) -> Result<()> {
        self.add(AnyRecipient::Custom(recipient))
    }

    fn check_can_add(&self, scrypt: bool) -> Result<()> {
        let has_scrypt = self.passphrase.is_some()
            || self
                .recipients
                .iter()
                .any(|r| matches!(r, AnyRecipient::Scrypt(_)));
        if has_scrypt && scrypt {
            return Err(ConfigError::MultiplePassphrases.into());
        }
        if has_scrypt || (scrypt && !self.recipients.is_empty()) {
            return Err(ConfigError::MixedRecipientsAndPassphrase.into());
        }
        Ok(())
    }

    /// Generate a file key, wrap it for every recipient, and encode the
    /// MAC'd header.
    fn prepare(&self) -> Result<(FileKey, Vec<u8>)> {
        let file_key = FileKey::generate()?;

        let mut stanzas = Vec::new();
        if let Some(passphrase) = &self.passphrase {
            let scrypt = ScryptRecipient::new(passphrase.expose_secret())
                .with_work_factor(self.work_factor)?;
            stanzas.extend(scrypt.wrap_file_key(&file_key)?);
        } else if self.recipients.is_empty() {
            return Err(ConfigError::NoRecipients.into());
        }
        for recipient in &self.recipients {
            stanzas.extend(recipient.wrap_file_key(&file_key)?);
        }
        // Custom recipients can emit scrypt stanzas too.
        if stanzas.len() != 1 && stanzas.iter().any(|s| s.tag() == SCRYPT_TAG) {
            return Err(ConfigError::MixedRecipientsAndPassphrase.into());
        }

        let mac = header_mac(&file_key, &encode_header_no_mac(&stanzas))?;
        debug!(stanzas = stanzas.len(), "wrote header");
        Ok((file_key, encode_header(&stanzas, &mac)))
    }

    fn payload_key(file_key: &FileKey) -> Result<([u8; PAYLOAD_NONCE_SIZE], Zeroizing<[u8; KEY_SIZE]>)> {
        let nonce: [u8; PAYLOAD_NONCE_SIZE] = random_bytes()?;
        let key = Zeroizing::new(payload_key(file_key, &nonce)?);
        Ok((nonce, key))
    }

    /// Encrypt a whole plaintext in memory.
    pub fn encrypt(&self, plaintext: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let plaintext = plaintext.as_ref();
        let (file_key, mut out) = self.prepare()?;
        let (nonce, key) = Self::payload_key(&file_key)?;
        out.extend_from_slice(&nonce);
        out.extend(encrypt_stream(&key, plaintext)?);
        Ok(out)
    }

    /// Write the header and nonce to `output` now; plaintext written to the
    /// returned writer is encrypted as it arrives. Call
    /// [`StreamWriter::finish`] to complete the file.
    pub fn encrypt_to<W: Write>(&self, mut output: W) -> Result<StreamWriter<W>> {
        let (file_key, header) = self.prepare()?;
        let (nonce, key) = Self::payload_key(&file_key)?;
        output.write_all(&header)?;
        output.write_all(&nonce)?;
        Ok(StreamWriter::new(output, &key))
    }
}
