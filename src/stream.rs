//! STREAM: chunked ChaCha20-Poly1305 payload encryption
//!
//! Plaintext is split into 64 KiB chunks, each sealed under a 12-byte nonce:
//!
//!   nonce = counter[11] (big-endian) || last_flag[1]
//!
//! The flag is 1 on the final chunk only. The final chunk may be full; it may
//! be empty only when it is also the first chunk.
//!
//! Two realizations produce identical bytes: the whole-buffer functions
//! (`encrypt_stream`/`decrypt_stream`) and the incremental accumulators
//! (`StreamEncryptor`/`StreamDecryptor`), which hold at most one chunk.

use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Nonce};
use tracing::trace;

use crate::aead::cipher;
use crate::error::{Error, Result};
use crate::wire::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// Plaintext bytes per chunk.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Ciphertext bytes per full chunk.
pub const ENCRYPTED_CHUNK_SIZE: usize = CHUNK_SIZE + TAG_SIZE;

// 11-byte counter
const COUNTER_MAX: u128 = (1 << 88) - 1;

// ---------------------------------------------------------------------------
// Size helpers
// ---------------------------------------------------------------------------

/// Exact ciphertext length for `plaintext_len` bytes of plaintext.
pub fn ciphertext_size(plaintext_len: u64) -> u64 {
    let chunks = plaintext_len.div_ceil(CHUNK_SIZE as u64).max(1);
    plaintext_len + chunks * TAG_SIZE as u64
}

/// Exact plaintext length for a ciphertext of `ciphertext_len` bytes, or
/// `Error::Decryption` when no valid stream has that length.
pub fn plaintext_size(ciphertext_len: u64) -> Result<u64> {
    let tag = TAG_SIZE as u64;
    if ciphertext_len < tag {
        return Err(Error::Decryption);
    }
    if ciphertext_len == tag {
        return Ok(0);
    }
    let full = ciphertext_len / ENCRYPTED_CHUNK_SIZE as u64;
    let rem = ciphertext_len % ENCRYPTED_CHUNK_SIZE as u64;
    match rem {
        0 => Ok(full * CHUNK_SIZE as u64),
        r if r <= tag => Err(Error::Decryption),
        r => Ok(full * CHUNK_SIZE as u64 + r - tag),
    }
}

// ---------------------------------------------------------------------------
// Nonce
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StreamNonce {
    counter: u128,
}

impl StreamNonce {
    fn bytes(&self, last: bool) -> [u8; NONCE_SIZE] {
        let mut out = [0u8; NONCE_SIZE];
        out[..11].copy_from_slice(&self.counter.to_be_bytes()[5..]);
        out[11] = u8::from(last);
        out
    }

    fn is_first(&self) -> bool {
        self.counter == 0
    }

    fn advance(&mut self) -> Result<()> {
        if self.counter == COUNTER_MAX {
            return Err(Error::Encryption);
        }
        self.counter += 1;
        Ok(())
    }
}

fn seal_chunk(
    cipher: &ChaCha20Poly1305,
    nonce: &mut StreamNonce,
    chunk: &[u8],
    last: bool,
) -> Result<Vec<u8>> {
    let ct = cipher
        .encrypt(Nonce::from_slice(&nonce.bytes(last)), chunk)
        .map_err(|_| Error::Encryption)?;
    nonce.advance()?;
    Ok(ct)
}

fn open_chunk(
    cipher: &ChaCha20Poly1305,
    nonce: &mut StreamNonce,
    chunk: &[u8],
    last: bool,
) -> Result<Vec<u8>> {
    if last && chunk.len() == TAG_SIZE && !nonce.is_first() {
        // An empty final chunk may only stand for an empty plaintext.
        return Err(Error::Decryption);
    }
    let pt = cipher
        .decrypt(Nonce::from_slice(&nonce.bytes(last)), chunk)
        .map_err(|_| Error::Decryption)?;
    nonce.advance().map_err(|_| Error::Decryption)?;
    Ok(pt)
}

// ---------------------------------------------------------------------------
// Whole-buffer transform
// ---------------------------------------------------------------------------

pub fn encrypt_stream(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher(key);
    let mut nonce = StreamNonce::default();
    let mut out = Vec::with_capacity(ciphertext_size(plaintext.len() as u64) as usize);

    if plaintext.is_empty() {
        out.extend(seal_chunk(&cipher, &mut nonce, &[], true)?);
        return Ok(out);
    }

    let mut chunks = plaintext.chunks(CHUNK_SIZE).peekable();
    while let Some(chunk) = chunks.next() {
        let last = chunks.peek().is_none();
        out.extend(seal_chunk(&cipher, &mut nonce, chunk, last)?);
    }
    Ok(out)
}

pub fn decrypt_stream(key: &[u8; KEY_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let size = plaintext_size(ciphertext.len() as u64)?;
    let cipher = cipher(key);
    let mut nonce = StreamNonce::default();
    let mut out = Vec::with_capacity(size as usize);

    let mut chunks = ciphertext.chunks(ENCRYPTED_CHUNK_SIZE).peekable();
    while let Some(chunk) = chunks.next() {
        let last = chunks.peek().is_none();
        out.extend(open_chunk(&cipher, &mut nonce, chunk, last)?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Incremental transform
// ---------------------------------------------------------------------------

/// Push-style encryptor. A full chunk is only sealed once more input shows
/// it is not the last one, so `finish` can always flag the final chunk.
pub struct StreamEncryptor {
    cipher: ChaCha20Poly1305,
    nonce: StreamNonce,
    buf: Vec<u8>,
}

impl StreamEncryptor {
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: cipher(key),
            nonce: StreamNonce::default(),
            buf: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    /// Accept plaintext; returns zero or more sealed (non-final) chunks.
    pub fn feed(&mut self, mut data: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut out = Vec::new();
        while !data.is_empty() {
            if self.buf.len() == CHUNK_SIZE {
                out.push(seal_chunk(&self.cipher, &mut self.nonce, &self.buf, false)?);
                self.buf.clear();
            }
            let take = (CHUNK_SIZE - self.buf.len()).min(data.len());
            self.buf.extend_from_slice(&data[..take]);
            data = &data[take..];
        }
        Ok(out)
    }

    /// Seal the buffered remainder as the final chunk.
    pub fn finish(self) -> Result<Vec<u8>> {
        trace!(chunks = (self.nonce.counter + 1) as u64, "stream encrypted");
        let mut nonce = self.nonce;
        seal_chunk(&self.cipher, &mut nonce, &self.buf, true)
    }
}

/// Push-style decryptor, the mirror of [`StreamEncryptor`].
///
/// Plaintext returned by `feed` is authenticated per chunk, but the stream as
/// a whole is only valid once `finish` succeeds.
pub struct StreamDecryptor {
    cipher: ChaCha20Poly1305,
    nonce: StreamNonce,
    buf: Vec<u8>,
}

impl StreamDecryptor {
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: cipher(key),
            nonce: StreamNonce::default(),
            buf: Vec::with_capacity(ENCRYPTED_CHUNK_SIZE),
        }
    }

    /// Accept ciphertext; returns zero or more opened (non-final) chunks.
    pub fn feed(&mut self, mut data: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut out = Vec::new();
        while !data.is_empty() {
            if self.buf.len() == ENCRYPTED_CHUNK_SIZE {
                out.push(open_chunk(&self.cipher, &mut self.nonce, &self.buf, false)?);
                self.buf.clear();
            }
            let take = (ENCRYPTED_CHUNK_SIZE - self.buf.len()).min(data.len());
            self.buf.extend_from_slice(&data[..take]);
            data = &data[take..];
        }
        Ok(out)
    }

    /// Open the buffered remainder as the final chunk.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.buf.len() < TAG_SIZE {
            return Err(Error::Decryption);
        }
        trace!(chunks = (self.nonce.counter + 1) as u64, "stream decrypted");
        let mut nonce = self.nonce;
        open_chunk(&self.cipher, &mut nonce, &self.buf, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x42; 32];

    fn incremental_encrypt(pt: &[u8], step: usize) -> Vec<u8> {
        let mut enc = StreamEncryptor::new(&KEY);
        let mut out = Vec::new();
        for piece in pt.chunks(step.max(1)) {
            for c in enc.feed(piece).unwrap() {
                out.extend(c);
            }
        }
        out.extend(enc.finish().unwrap());
        out
    }

    fn incremental_decrypt(ct: &[u8], step: usize) -> Result<Vec<u8>> {
        let mut dec = StreamDecryptor::new(&KEY);
        let mut out = Vec::new();
        for piece in ct.chunks(step.max(1)) {
            for c in dec.feed(piece)? {
                out.extend(c);
            }
        }
        out.extend(dec.finish()?);
        Ok(out)
    }

    const SIZES: [u64; 12] = [
        0, 1, 15, 16, 17, 500, 65535, 65536, 65537, 131071, 131072, 131073,
    ];

    #[test]
    fn test_size_law() {
        for n in SIZES {
            assert_eq!(plaintext_size(ciphertext_size(n)).unwrap(), n, "n = {n}");
        }
        assert_eq!(ciphertext_size(0), 16);
        assert_eq!(ciphertext_size(65536), 65552);
        assert_eq!(ciphertext_size(65537), 65536 + 1 + 32);
    }

    #[test]
    fn test_invalid_ciphertext_sizes() {
        for n in [0u64, 1, 15, 65552 + 1, 65552 + 15, 131104 + 1, 131104 + 15] {
            assert!(plaintext_size(n).is_err(), "n = {n}");
        }
        assert!(plaintext_size(65552 + 16).is_err());
    }

    #[test]
    fn test_round_trip_sizes() {
        for n in SIZES {
            let pt: Vec<u8> = (0..n).map(|i| i as u8).collect();
            let ct = encrypt_stream(&KEY, &pt).unwrap();
            assert_eq!(ct.len() as u64, ciphertext_size(n));
            assert_eq!(decrypt_stream(&KEY, &ct).unwrap(), pt);
        }
    }

    #[test]
    fn test_incremental_matches_buffered() {
        let pt: Vec<u8> = (0..131073u32).map(|i| (i % 251) as u8).collect();
        let ct = encrypt_stream(&KEY, &pt).unwrap();
        for step in [1000, 4096, 65535, 65536, 65537, 200_000] {
            assert_eq!(incremental_encrypt(&pt, step), ct, "step = {step}");
            assert_eq!(incremental_decrypt(&ct, step).unwrap(), pt, "step = {step}");
        }
    }

    #[test]
    fn test_full_final_chunk() {
        let pt = vec![7u8; CHUNK_SIZE];
        let ct = encrypt_stream(&KEY, &pt).unwrap();
        assert_eq!(ct.len(), ENCRYPTED_CHUNK_SIZE);
        assert_eq!(incremental_encrypt(&pt, CHUNK_SIZE), ct);
        assert_eq!(incremental_decrypt(&ct, CHUNK_SIZE).unwrap(), pt);
    }

    #[test]
    fn test_empty_trailing_chunk_rejected() {
        // A full non-final chunk followed by an empty final chunk.
        let cipher = cipher(&KEY);
        let mut nonce = StreamNonce::default();
        let mut ct = seal_chunk(&cipher, &mut nonce, &[1u8; CHUNK_SIZE], false).unwrap();
        ct.extend(seal_chunk(&cipher, &mut nonce, &[], true).unwrap());
        assert!(matches!(decrypt_stream(&KEY, &ct), Err(Error::Decryption)));
        assert!(matches!(incremental_decrypt(&ct, 4096), Err(Error::Decryption)));
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let pt = vec![1u8; CHUNK_SIZE * 2 + 10];
        let ct = encrypt_stream(&KEY, &pt).unwrap();
        // Drop the final chunk: the previous chunk is not flagged last.
        let truncated = &ct[..ENCRYPTED_CHUNK_SIZE * 2];
        assert!(decrypt_stream(&KEY, truncated).is_err());
        assert!(incremental_decrypt(truncated, 1000).is_err());
    }

    #[test]
    fn test_tampered_chunk_rejected() {
        let pt = vec![1u8; 1000];
        let mut ct = encrypt_stream(&KEY, &pt).unwrap();
        ct[10] ^= 1;
        assert!(matches!(decrypt_stream(&KEY, &ct), Err(Error::Decryption)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let ct = encrypt_stream(&KEY, b"hello").unwrap();
        assert!(decrypt_stream(&[0u8; 32], &ct).is_err());
    }

    #[test]
    fn test_empty_input_to_decryptor() {
        assert!(incremental_decrypt(&[], 1).is_err());
        assert!(decrypt_stream(&KEY, &[]).is_err());
    }

    #[test]
    fn test_nonce_layout() {
        let mut n = StreamNonce::default();
        assert_eq!(n.bytes(false), [0u8; 12]);
        assert_eq!(n.bytes(true)[11], 1);
        n.counter = 0x0102;
        let b = n.bytes(false);
        assert_eq!(&b[9..], &[0x01, 0x02, 0x00]);
    }

    #[test]
    fn test_counter_overflow() {
        let mut n = StreamNonce { counter: COUNTER_MAX };
        assert!(n.advance().is_err());
    }
}
