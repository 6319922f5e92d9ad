//! ASCII armor
//!
//! A strict PEM subset: padded standard base64, 64 columns, between
//! `-----BEGIN AGE ENCRYPTED FILE-----` and `-----END AGE ENCRYPTED FILE-----`.
//! Decoding ignores surrounding whitespace and accepts CRLF line endings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{FormatError, Result};

pub const BEGIN_MARKER: &str = "-----BEGIN AGE ENCRYPTED FILE-----";
pub const END_MARKER: &str = "-----END AGE ENCRYPTED FILE-----";

const COLUMNS: usize = 64;
const BYTES_PER_LINE: usize = COLUMNS / 4 * 3;

pub fn encode(file: &[u8]) -> String {
    let mut out = String::with_capacity(file.len() * 4 / 3 + file.len() / BYTES_PER_LINE + 80);
    out.push_str(BEGIN_MARKER);
    out.push('\n');
    for chunk in file.chunks(BYTES_PER_LINE) {
        out.push_str(&STANDARD.encode(chunk));
        out.push('\n');
    }
    out.push_str(END_MARKER);
    out.push('\n');
    out
}

pub fn decode(armored: &str) -> Result<Vec<u8>> {
    let normalized = armored.trim().replace("\r\n", "\n");
    let mut lines: Vec<&str> = normalized.split('\n').collect();

    if lines.first() != Some(&BEGIN_MARKER) {
        return Err(FormatError::Armor("invalid header").into());
    }
    if lines.len() < 2 || lines.last() != Some(&END_MARKER) {
        return Err(FormatError::Armor("invalid footer").into());
    }
    lines.remove(0);
    lines.pop();

    let last = lines.len().saturating_sub(1);
    for (i, line) in lines.iter().enumerate() {
        let valid = if i == last {
            !line.is_empty() && line.len() <= COLUMNS && line.len() % 4 == 0
        } else {
            line.len() == COLUMNS
        };
        if !valid {
            return Err(FormatError::Armor("invalid line length").into());
        }
        if !line
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
        {
            return Err(FormatError::Armor("invalid base64").into());
        }
    }

    STANDARD
        .decode(lines.concat())
        .map_err(|_| FormatError::Armor("invalid base64").into())
}
