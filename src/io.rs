//! `std::io` adapters over the STREAM accumulators.
//!
//! Both adapters hold at most one chunk of unconsumed data. Dropping either
//! one abandons any partial chunk: nothing unauthenticated is emitted and a
//! `StreamWriter` that is never finished leaves a truncated (invalid) file.

use std::io::{self, Read, Write};

use crate::stream::{StreamDecryptor, StreamEncryptor, CHUNK_SIZE, ENCRYPTED_CHUNK_SIZE};
use crate::wire::KEY_SIZE;

/// Encrypts everything written to it into `inner`.
///
/// Call [`StreamWriter::finish`] to seal the final chunk.
pub struct StreamWriter<W: Write> {
    inner: W,
    encryptor: StreamEncryptor,
}

impl<W: Write> StreamWriter<W> {
    pub(crate) fn new(inner: W, key: &[u8; KEY_SIZE]) -> Self {
        Self {
            inner,
            encryptor: StreamEncryptor::new(key),
        }
    }

    /// Seal the final chunk, flush, and return the inner writer.
    pub fn finish(self) -> io::Result<W> {
        let Self {
            mut inner,
            encryptor,
        } = self;
        let last = encryptor.finish()?;
        inner.write_all(&last)?;
        inner.flush()?;
        Ok(inner)
    }
}

impl<W: Write> Write for StreamWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // One chunk per call keeps the pending output bounded.
        let n = buf.len().min(CHUNK_SIZE);
        for chunk in self.encryptor.feed(&buf[..n])? {
            self.inner.write_all(&chunk)?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Decrypts the payload read from `inner`.
///
/// Each chunk is authenticated before its plaintext is returned, but only a
/// read that reaches EOF (returns `Ok(0)`) proves the stream was complete.
pub struct StreamReader<R: Read> {
    inner: R,
    decryptor: Option<StreamDecryptor>,
    input: Box<[u8]>,
    output: Vec<u8>,
    pos: usize,
    failed: bool,
}

impl<R: Read> StreamReader<R> {
    pub(crate) fn new(inner: R, key: &[u8; KEY_SIZE]) -> Self {
        Self {
            inner,
            decryptor: Some(StreamDecryptor::new(key)),
            input: vec![0u8; ENCRYPTED_CHUNK_SIZE].into_boxed_slice(),
            output: Vec::new(),
            pos: 0,
            failed: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> io::Result<()> {
        if self.decryptor.is_none() {
            return Ok(());
        }
        let n = loop {
            match self.inner.read(&mut self.input) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        let produced = match (n, self.decryptor.take()) {
            (_, None) => Vec::new(),
            (0, Some(d)) => vec![d.finish()?],
            (n, Some(mut d)) => {
                let chunks = d.feed(&self.input[..n])?;
                self.decryptor = Some(d);
                chunks
            }
        };
        self.output = produced.concat();
        self.pos = 0;
        Ok(())
    }
}

impl<R: Read> Read for StreamReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.failed {
            return Err(crate::Error::Decryption.into());
        }
        while self.pos == self.output.len() {
            if self.decryptor.is_none() || buf.is_empty() {
                return Ok(0);
            }
            if let Err(e) = self.fill() {
                self.failed = true;
                self.output.clear();
                self.pos = 0;
                return Err(e);
            }
        }
        let n = buf.len().min(self.output.len() - self.pos);
        buf[..n].copy_from_slice(&self.output[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
