//! Recipients and identities
//!
//! A [`Recipient`] wraps the file key into stanzas; an [`Identity`] tries to
//! unwrap it again. Built-in protocols are variants of [`AnyRecipient`] /
//! [`AnyIdentity`]; anything else plugs in through the `Custom` variants.
//!
//! Unwrapping distinguishes three outcomes:
//! - `Ok(Some(key))`: this identity recovered the file key.
//! - `Ok(None)`: not addressed to this identity; try the next one.
//! - `Err(_)`: the header is malformed or violates policy; stop.

use core::fmt;
use core::str::FromStr;

use crate::error::{ConfigError, Error, Result};
use crate::header::Stanza;
use crate::keys::FileKey;

pub mod hybrid;
pub mod scrypt;
pub mod x25519;

pub use self::hybrid::{HybridIdentity, HybridRecipient};
pub use self::scrypt::{ScryptIdentity, ScryptRecipient};
pub use self::x25519::{X25519Identity, X25519Recipient};

pub trait Recipient {
    fn wrap_file_key(&self, file_key: &FileKey) -> Result<Vec<Stanza>>;
}

pub trait Identity {
    /// Try a single stanza.
    fn unwrap_stanza(&self, stanza: &Stanza) -> Result<Option<FileKey>>;

    /// Try every stanza in header order; the first success wins.
    fn unwrap_file_key(&self, stanzas: &[Stanza]) -> Result<Option<FileKey>> {
        for stanza in stanzas {
            if let Some(file_key) = self.unwrap_stanza(stanza)? {
                return Ok(Some(file_key));
            }
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Recipient sum
// ---------------------------------------------------------------------------

pub enum AnyRecipient {
    X25519(X25519Recipient),
    Scrypt(ScryptRecipient),
    Hybrid(HybridRecipient),
    Custom(Box<dyn Recipient + Send + Sync>),
}

impl AnyRecipient {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::X25519(_) => "x25519",
            Self::Scrypt(_) => "scrypt",
            Self::Hybrid(_) => "mlkem768x25519",
            Self::Custom(_) => "custom",
        }
    }
}

impl Recipient for AnyRecipient {
    fn wrap_file_key(&self, file_key: &FileKey) -> Result<Vec<Stanza>> {
        match self {
            Self::X25519(r) => r.wrap_file_key(file_key),
            Self::Scrypt(r) => r.wrap_file_key(file_key),
            Self::Hybrid(r) => r.wrap_file_key(file_key),
            Self::Custom(r) => r.wrap_file_key(file_key),
        }
    }
}

/// Parses `age1…` (X25519) and `age1pq1…` (hybrid) recipient strings.
impl FromStr for AnyRecipient {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.starts_with("age1pq1") {
            s.parse().map(Self::Hybrid)
        } else if s.starts_with("age1") {
            s.parse().map(Self::X25519)
        } else {
            Err(ConfigError::InvalidRecipient.into())
        }
    }
}

impl fmt::Debug for AnyRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyRecipient({})", self.kind())
    }
}

// ---------------------------------------------------------------------------
// Identity sum
// ---------------------------------------------------------------------------

pub enum AnyIdentity {
    X25519(X25519Identity),
    Scrypt(ScryptIdentity),
    Hybrid(HybridIdentity),
    Custom(Box<dyn Identity + Send + Sync>),
}

impl AnyIdentity {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::X25519(_) => "x25519",
            Self::Scrypt(_) => "scrypt",
            Self::Hybrid(_) => "mlkem768x25519",
            Self::Custom(_) => "custom",
        }
    }
}

impl Identity for AnyIdentity {
    fn unwrap_stanza(&self, stanza: &Stanza) -> Result<Option<FileKey>> {
        match self {
            Self::X25519(i) => i.unwrap_stanza(stanza),
            Self::Scrypt(i) => i.unwrap_stanza(stanza),
            Self::Hybrid(i) => i.unwrap_stanza(stanza),
            Self::Custom(i) => i.unwrap_stanza(stanza),
        }
    }

    // Forwarded so per-protocol header checks (scrypt exclusivity) apply.
    fn unwrap_file_key(&self, stanzas: &[Stanza]) -> Result<Option<FileKey>> {
        match self {
            Self::X25519(i) => i.unwrap_file_key(stanzas),
            Self::Scrypt(i) => i.unwrap_file_key(stanzas),
            Self::Hybrid(i) => i.unwrap_file_key(stanzas),
            Self::Custom(i) => i.unwrap_file_key(stanzas),
        }
    }
}

/// Parses `AGE-SECRET-KEY-1…` (X25519) and `AGE-SECRET-KEY-PQ-1…` (hybrid)
/// identity strings.
impl FromStr for AnyIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.starts_with("AGE-SECRET-KEY-PQ-1") {
            s.parse().map(Self::Hybrid)
        } else if s.starts_with("AGE-SECRET-KEY-1") {
            s.parse().map(Self::X25519)
        } else {
            Err(ConfigError::InvalidIdentity.into())
        }
    }
}

impl fmt::Debug for AnyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyIdentity({})", self.kind())
    }
}
