//! Inspect an encrypted file without decrypting it.
//!
//! Reports only what the header and payload length already reveal; nothing
//! here touches key material.

use core::fmt;

use crate::error::{FormatError, Result};
use crate::header::Header;
use crate::stream::plaintext_size;
use crate::wire::PAYLOAD_NONCE_SIZE;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// Stanza type tags, in header order
    pub stanza_types: Vec<String>,
    /// Header length, MAC line included
    pub header_bytes: usize,
    /// Nonce plus STREAM ciphertext
    pub payload_bytes: usize,
    /// Exact plaintext length
    pub plaintext_bytes: u64,
    /// True for post-quantum (mlkem768x25519) files
    pub post_quantum: bool,
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "age-encryption.org/v1 | {} | header {} bytes | payload {} bytes ({} plaintext)",
            self.stanza_types.join(", "),
            self.header_bytes,
            self.payload_bytes,
            self.plaintext_bytes
        )
    }
}

pub fn inspect(file: &[u8]) -> Result<FileInfo> {
    let (header, rest) = Header::parse(file)?;
    if rest.len() < PAYLOAD_NONCE_SIZE {
        return Err(FormatError::MissingNonce.into());
    }
    let plaintext_bytes = plaintext_size((rest.len() - PAYLOAD_NONCE_SIZE) as u64)
        .map_err(|_| FormatError::InvalidPayloadLength)?;

    let stanza_types: Vec<String> = header
        .stanzas()
        .iter()
        .map(|s| s.tag().to_owned())
        .collect();
    let post_quantum = stanza_types.iter().any(|t| t == crate::wire::MLKEM768X25519_TAG);

    Ok(FileInfo {
        stanza_types,
        header_bytes: file.len() - rest.len(),
        payload_bytes: rest.len(),
        plaintext_bytes,
        post_quantum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encrypter::Encrypter;

    #[test]
    fn test_inspect_x25519() {
        let mut e = Encrypter::new();
        e.add_recipient("age1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl6")
            .unwrap();
        e.add_recipient("age12wv74vxhhp9kg29j2wzm50c9p4urn7py0t4tzdgz6m0pcqjzmu9qqpzjqn")
            .unwrap();
        let ct = e.encrypt(vec![0u8; 70_000]).unwrap();
        let info = inspect(&ct).unwrap();
        assert_eq!(info.stanza_types, ["X25519", "X25519"]);
        assert_eq!(info.plaintext_bytes, 70_000);
        assert_eq!(info.header_bytes + info.payload_bytes, ct.len());
        assert!(!info.post_quantum);
        assert!(info.to_string().contains("X25519, X25519"));
    }

    #[test]
    fn test_inspect_rejects_bad_length() {
        let mut e = Encrypter::new();
        e.add_recipient("age1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl6")
            .unwrap();
        let mut ct = e.encrypt(b"abc").unwrap();
        ct.truncate(ct.len() - 5);
        assert!(matches!(
            inspect(&ct),
            Err(crate::error::Error::Format(FormatError::InvalidPayloadLength))
        ));
    }
}
