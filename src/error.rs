//! Unified error types for citadel-age.
//!
//! Failures fall into five classes. Every authentication failure maps to
//! `Error::Decryption` with the same message, whatever the cause.

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Caller misuse, detected before any cryptography runs.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed header, stanza, base64 or armor.
    #[error("malformed file: {0}")]
    Format(#[from] FormatError),

    /// Header MAC or payload authentication failed.
    #[error("decryption failed")]
    Decryption,

    /// No configured identity could unwrap any stanza.
    #[error("no identity matched any of the file's recipients")]
    NoMatch,

    /// The header is well-formed but refused on safety grounds.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// AEAD sealing failed (input beyond the cipher's limits).
    #[error("encryption failed")]
    Encryption,

    #[error("key derivation failed")]
    KeyDerivation,

    #[error("operating system random number generator failed")]
    Rng,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("can encrypt to at most one passphrase")]
    MultiplePassphrases,

    #[error("can't encrypt to both recipients and passphrases")]
    MixedRecipientsAndPassphrase,

    #[error("no recipients or passphrase configured")]
    NoRecipients,

    #[error("no identities or passphrases configured")]
    NoIdentities,

    #[error("invalid recipient")]
    InvalidRecipient,

    #[error("invalid identity")]
    InvalidIdentity,

    #[error("invalid scrypt work factor {0} (expected 1..=20)")]
    InvalidWorkFactor(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid version line {0:?}")]
    InvalidVersion(String),

    #[error("invalid stanza")]
    InvalidStanza,

    #[error("invalid base64")]
    InvalidBase64,

    #[error("invalid non-ASCII byte in header")]
    InvalidByte,

    #[error("unexpected end of header")]
    UnexpectedEof,

    #[error("header line too long")]
    LineTooLong,

    #[error("invalid header MAC line")]
    InvalidMac,

    #[error("payload nonce missing")]
    MissingNonce,

    #[error("payload length is not a valid STREAM length")]
    InvalidPayloadLength,

    #[error("decrypted payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid armor: {0}")]
    Armor(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// A passphrase stanza must be the only stanza in its header.
    #[error("scrypt recipient is not the only one in the header")]
    ScryptNotAlone,

    #[error("scrypt work factor {log_n} is too high")]
    WorkFactorTooHigh { log_n: u64 },
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(inner) => inner,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failures_share_one_message() {
        assert_eq!(Error::Decryption.to_string(), "decryption failed");
    }

    #[test]
    fn io_round_trip_keeps_the_crate_error() {
        let io: std::io::Error = Error::Decryption.into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidData);
        assert_eq!(io.to_string(), "decryption failed");
    }

    #[test]
    fn version_error_names_the_line() {
        let e = Error::from(FormatError::InvalidVersion("age-encryption.org/v2".into()));
        assert!(e.to_string().contains("age-encryption.org/v2"));
    }
}
