//! # citadel-age
//!
//! File encryption in the age-encryption.org/v1 format.
//!
//! ## Quick Start
//!
//! ```rust
//! use citadel_age::{generate_identity, identity_to_recipient, Decrypter, Encrypter};
//!
//! let identity = generate_identity().unwrap();
//! let recipient = identity_to_recipient(&identity).unwrap();
//!
//! let mut e = Encrypter::new();
//! e.add_recipient(&recipient).unwrap();
//! let file = e.encrypt("secret").unwrap();
//!
//! let mut d = Decrypter::new();
//! d.add_identity(&identity).unwrap();
//! assert_eq!(d.decrypt_to_string(&file).unwrap(), "secret");
//! ```
//!
//! ## Recipients
//!
//! - **X25519**: `age1…` public keys, `AGE-SECRET-KEY-1…` identities
//! - **scrypt**: a single passphrase, never mixed with other recipients
//! - **ML-KEM-768 + X25519**: `age1pq1…` / `AGE-SECRET-KEY-PQ-1…` (experimental)
//! - **Custom**: anything implementing [`Recipient`] / [`Identity`]
//!
//! ## Security Properties
//!
//! - **Uniform errors**: every authentication failure is `Error::Decryption`
//! - **Header MAC**: checked in constant time before any payload is opened
//! - **STREAM**: per-chunk authentication, truncation and extension detected
//!
//! ## What's NOT Provided
//!
//! - SSH keys, plugins, or WebAuthn identities (use the `Custom` variants)
//! - Seekable decryption

#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/citadel-age/0.1.0")]

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

mod aead;
mod decrypter;
mod encrypter;
mod error;
mod hpke;
mod inspect;
mod kdf;

pub mod armor;
pub mod header;
pub mod io;
pub mod kem;
pub mod keys;
pub mod recipients;
pub mod stream;
pub mod wire;

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

pub use decrypter::Decrypter;
pub use encrypter::Encrypter;
pub use error::{ConfigError, Error, FormatError, PolicyViolation, Result};
pub use header::{encode_header, encode_header_no_mac, Header, ParseOptions, Stanza};
pub use inspect::{inspect, FileInfo};
pub use io::{StreamReader, StreamWriter};
pub use keys::{
    generate_hybrid_identity, generate_identity, identity_to_recipient, parse_identity_file,
    FileKey,
};
pub use recipients::{AnyIdentity, AnyRecipient, Identity, Recipient};
pub use stream::{ciphertext_size, plaintext_size, CHUNK_SIZE};
pub use wire::{
    DEFAULT_SCRYPT_WORK_FACTOR, FILE_KEY_SIZE, MAC_SIZE, MAX_HEADER_LINE, MAX_SCRYPT_WORK_FACTOR,
    PAYLOAD_NONCE_SIZE, TAG_SIZE,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Key schedule primitives, exposed for interoperability testing.
pub mod primitives {
    pub use crate::kdf::{derive, header_key, header_mac, payload_key, verify_header_mac};
}
