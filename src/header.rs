//! Header codec
//!
//! The header is line oriented: a version line, one or more stanzas, and a
//! MAC line. Parsing works on any `BufRead`; a byte slice is parsed by running
//! the same reader over `&[u8]`, which leaves the slice positioned at the
//! payload nonce.

use std::io::{BufRead, Read};

use tracing::trace;

use crate::error::{FormatError, Result};
use crate::wire::{
    b64_decode, b64_encode, BODY_LINE_BYTES, MAC_MARKER, MAC_SIZE, MAX_HEADER_LINE,
    STANZA_MARKER, VERSION_LINE,
};

// ---------------------------------------------------------------------------
// Stanza
// ---------------------------------------------------------------------------

/// One recipient block: a type tag plus arguments, and an opaque body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stanza {
    args: Vec<String>,
    body: Vec<u8>,
}

impl Stanza {
    /// Arguments must be non-empty, space-free printable ASCII.
    pub fn new(args: Vec<String>, body: Vec<u8>) -> Result<Self> {
        let valid = !args.is_empty()
            && args
                .iter()
                .all(|a| !a.is_empty() && a.bytes().all(|b| (33..=126).contains(&b)));
        if !valid {
            return Err(FormatError::InvalidStanza.into());
        }
        Ok(Self { args, body })
    }

    /// The first argument.
    pub fn tag(&self) -> &str {
        &self.args[0]
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(STANZA_MARKER.as_bytes());
        for arg in &self.args {
            out.push(b' ');
            out.extend_from_slice(arg.as_bytes());
        }
        out.push(b'\n');
        for chunk in self.body.chunks(BODY_LINE_BYTES) {
            out.extend_from_slice(b64_encode(chunk).as_bytes());
            out.push(b'\n');
        }
        // A full final line (or an empty body) needs an explicit empty line.
        if self.body.len() % BODY_LINE_BYTES == 0 {
            out.push(b'\n');
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Version line, stanzas, and the bare `---` marker: the MAC's input.
pub fn encode_header_no_mac(stanzas: &[Stanza]) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + stanzas.len() * 128);
    out.extend_from_slice(VERSION_LINE.as_bytes());
    out.push(b'\n');
    for stanza in stanzas {
        stanza.encode_into(&mut out);
    }
    out.extend_from_slice(MAC_MARKER.as_bytes());
    out
}

pub fn encode_header(stanzas: &[Stanza], mac: &[u8; MAC_SIZE]) -> Vec<u8> {
    let mut out = encode_header_no_mac(stanzas);
    out.push(b' ');
    out.extend_from_slice(b64_encode(mac).as_bytes());
    out.push(b'\n');
    out
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parser knobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Accept bytes 127..=136 in header lines, as some older encoders
    /// emitted. Off by default: only printable ASCII (32..=126) is valid.
    pub allow_legacy_bytes: bool,
}

impl ParseOptions {
    fn max_byte(&self) -> u8 {
        if self.allow_legacy_bytes {
            136
        } else {
            126
        }
    }
}

/// A parsed header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    stanzas: Vec<Stanza>,
    mac: [u8; MAC_SIZE],
    header_no_mac: Vec<u8>,
}

impl Header {
    pub fn stanzas(&self) -> &[Stanza] {
        &self.stanzas
    }

    pub fn mac(&self) -> &[u8; MAC_SIZE] {
        &self.mac
    }

    /// The exact bytes the MAC authenticates, as they appeared on the wire.
    pub fn header_no_mac(&self) -> &[u8] {
        &self.header_no_mac
    }

    /// Re-serialize, MAC line included.
    pub fn encode(&self) -> Vec<u8> {
        encode_header(&self.stanzas, &self.mac)
    }

    /// Parse a header from the front of `input`, returning it with the
    /// remaining bytes (payload nonce and ciphertext).
    pub fn parse(input: &[u8]) -> Result<(Self, &[u8])> {
        Self::parse_with(input, ParseOptions::default())
    }

    pub fn parse_with(input: &[u8], options: ParseOptions) -> Result<(Self, &[u8])> {
        let mut rest = input;
        let header = Self::read(&mut rest, options)?;
        Ok((header, rest))
    }

    /// Read a header from `reader`, consuming exactly through the MAC line.
    pub fn read<R: BufRead>(reader: &mut R, options: ParseOptions) -> Result<Self> {
        let mut lines = LineReader {
            reader,
            options,
            consumed: Vec::new(),
        };

        let version = lines.next_line()?;
        if version != VERSION_LINE.as_bytes() {
            return Err(FormatError::InvalidVersion(to_text(&version)).into());
        }

        let mut stanzas = Vec::new();
        loop {
            let line = lines.next_line()?;

            if let Some(mac_b64) = line.strip_prefix(b"--- ") {
                if stanzas.is_empty() {
                    return Err(FormatError::InvalidStanza.into());
                }
                let mac = b64_decode(&to_text(mac_b64)).map_err(|_| FormatError::InvalidMac)?;
                let mac: [u8; MAC_SIZE] =
                    mac.as_slice().try_into().map_err(|_| FormatError::InvalidMac)?;

                // Everything up to and including "---".
                let mut header_no_mac = lines.consumed;
                header_no_mac.truncate(header_no_mac.len() - line.len() - 1 + MAC_MARKER.len());

                trace!(stanzas = stanzas.len(), "parsed header");
                return Ok(Self {
                    stanzas,
                    mac,
                    header_no_mac,
                });
            }

            let args = parse_stanza_line(&line)?;
            let body = lines.read_body()?;
            stanzas.push(Stanza { args, body });
        }
    }
}

/// `-> arg [arg ...]`: at least one argument, none empty.
fn parse_stanza_line(line: &[u8]) -> Result<Vec<String>> {
    let mut tokens = line.split(|&b| b == b' ');
    if tokens.next() != Some(STANZA_MARKER.as_bytes()) {
        return Err(FormatError::InvalidStanza.into());
    }
    let args: Vec<String> = tokens.map(to_text).collect();
    if args.is_empty() || args.iter().any(String::is_empty) {
        return Err(FormatError::InvalidStanza.into());
    }
    Ok(args)
}

/// Header lines are ASCII (or Latin-1 under the legacy option); map bytes
/// one to one so nothing is lost.
fn to_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

struct LineReader<'r, R> {
    reader: &'r mut R,
    options: ParseOptions,
    /// Every byte read so far, newlines included.
    consumed: Vec<u8>,
}

impl<R: BufRead> LineReader<'_, R> {
    /// Next LF-terminated line, without the LF.
    fn next_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        (&mut *self.reader)
            .take(MAX_HEADER_LINE as u64 + 1)
            .read_until(b'\n', &mut line)?;

        match line.last() {
            Some(b'\n') => {
                line.pop();
            }
            _ if line.len() > MAX_HEADER_LINE => return Err(FormatError::LineTooLong.into()),
            _ => return Err(FormatError::UnexpectedEof.into()),
        }

        let max = self.options.max_byte();
        if line.iter().any(|&b| b < 32 || b > max) {
            return Err(FormatError::InvalidByte.into());
        }

        self.consumed.extend_from_slice(&line);
        self.consumed.push(b'\n');
        Ok(line)
    }

    /// Body lines until the first one shorter than a full line.
    fn read_body(&mut self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        loop {
            let line = self.next_line()?;
            let chunk = b64_decode(&to_text(&line)).map_err(|_| FormatError::InvalidStanza)?;
            if chunk.len() > BODY_LINE_BYTES {
                return Err(FormatError::InvalidStanza.into());
            }
            body.extend_from_slice(&chunk);
            if chunk.len() < BODY_LINE_BYTES {
                return Ok(body);
            }
        }
    }
}
