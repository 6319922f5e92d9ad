//! Decrypter
//!
//! Identities are tried in the order they were added, each against every
//! stanza; the first one to recover the file key wins. Only then is the
//! header MAC checked and the payload opened.

use std::io::BufRead;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::{ConfigError, Error, FormatError, PolicyViolation, Result};
use crate::header::{Header, ParseOptions};
use crate::io::StreamReader;
use crate::kdf::{payload_key, verify_header_mac};
use crate::keys::FileKey;
use crate::recipients::{AnyIdentity, Identity, ScryptIdentity};
use crate::stream::decrypt_stream;
use crate::wire::{PAYLOAD_NONCE_SIZE, SCRYPT_TAG};

#[derive(Default)]
pub struct Decrypter {
    identities: Vec<AnyIdentity>,
    options: ParseOptions,
}

impl Decrypter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try this passphrase against scrypt stanzas.
    pub fn add_passphrase(&mut self, passphrase: impl Into<String>) {
        self.identities
            .push(AnyIdentity::Scrypt(ScryptIdentity::new(passphrase)));
    }

    /// Add an `AGE-SECRET-KEY-1…` or `AGE-SECRET-KEY-PQ-1…` identity.
    pub fn add_identity(&mut self, identity: &str) -> Result<()> {
        self.identities.push(identity.parse()?);
        Ok(())
    }

    pub fn add(&mut self, identity: AnyIdentity) {
        self.identities.push(identity);
    }

    pub fn add_custom_identity(&mut self, identity: Box<dyn Identity + Send + Sync>) {
        self.identities.push(AnyIdentity::Custom(identity));
    }

    pub fn set_parse_options(&mut self, options: ParseOptions) {
        self.options = options;
    }

    fn unwrap_file_key(&self, header: &Header) -> Result<FileKey> {
        if self.identities.is_empty() {
            return Err(ConfigError::NoIdentities.into());
        }
        let stanzas = header.stanzas();
        if stanzas.len() != 1 && stanzas.iter().any(|s| s.tag() == SCRYPT_TAG) {
            warn!(stanzas = stanzas.len(), "scrypt stanza is not alone in header");
            return Err(PolicyViolation::ScryptNotAlone.into());
        }
        for identity in &self.identities {
            if let Some(file_key) = identity.unwrap_file_key(header.stanzas())? {
                debug!(kind = identity.kind(), "identity matched");
                return Ok(file_key);
            }
        }
        Err(Error::NoMatch)
    }

    /// Recover and authenticate the file key for `header`.
    fn open_header(&self, header: &Header) -> Result<FileKey> {
        let file_key = self.unwrap_file_key(header)?;
        verify_header_mac(&file_key, header.header_no_mac(), header.mac())?;
        Ok(file_key)
    }

    /// Decrypt a whole file in memory.
    pub fn decrypt(&self, ciphertext: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let (header, rest) = Header::parse_with(ciphertext.as_ref(), self.options)?;
        let file_key = self.open_header(&header)?;

        if rest.len() < PAYLOAD_NONCE_SIZE {
            return Err(FormatError::MissingNonce.into());
        }
        let (nonce, payload) = rest.split_at(PAYLOAD_NONCE_SIZE);
        let nonce: [u8; PAYLOAD_NONCE_SIZE] =
            nonce.try_into().map_err(|_| FormatError::MissingNonce)?;
        let key = Zeroizing::new(payload_key(&file_key, &nonce)?);
        decrypt_stream(&key, payload)
    }

    pub fn decrypt_to_string(&self, ciphertext: impl AsRef<[u8]>) -> Result<String> {
        String::from_utf8(self.decrypt(ciphertext)?).map_err(|_| FormatError::InvalidUtf8.into())
    }

    /// Read and authenticate the header from `input`, then return a reader
    /// that yields the plaintext chunk by chunk.
    pub fn decrypt_from<R: BufRead>(&self, mut input: R) -> Result<StreamReader<R>> {
        let header = Header::read(&mut input, self.options)?;
        let file_key = self.open_header(&header)?;

        let mut nonce = [0u8; PAYLOAD_NONCE_SIZE];
        input.read_exact(&mut nonce).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::from(FormatError::MissingNonce),
            _ => Error::Io(e),
        })?;
        let key = Zeroizing::new(payload_key(&file_key, &nonce)?);
        Ok(StreamReader::new(input, &key))
    }
}
