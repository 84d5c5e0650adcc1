//! # Encoding Helpers
//!
//! Base64 schemes and line-ending transforms used when building and
//! decoding AS2 bodies.

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, MimeError};

/// Line length for RFC 2045 wrapped base64.
const RFC2045_LINE_LENGTH: usize = 76;

/// How base64 bodies are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Base64Scheme {
    /// MIME base64: 76-character lines separated by CRLF.
    Rfc2045,
    /// Strict base64 with no inserted line breaks.
    #[default]
    Rfc4648,
}

impl Base64Scheme {
    /// The scheme name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rfc2045 => "rfc2045",
            Self::Rfc4648 => "rfc4648",
        }
    }
}

impl std::fmt::Display for Base64Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Base64Scheme {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rfc2045" => Ok(Self::Rfc2045),
            "rfc4648" => Ok(Self::Rfc4648),
            other => Err(CoreError::UnsupportedBase64Scheme(other.to_string())),
        }
    }
}

/// Base64-encode `data` using `scheme`.
pub fn base64_encode(data: &[u8], scheme: Base64Scheme) -> String {
    let strict = STANDARD.encode(data);
    match scheme {
        Base64Scheme::Rfc4648 => strict,
        Base64Scheme::Rfc2045 => strict
            .as_bytes()
            .chunks(RFC2045_LINE_LENGTH)
            // Base64 output is pure ASCII, so every chunk is valid UTF-8.
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect::<Vec<_>>()
            .join("\r\n"),
    }
}

/// Decode base64 text, ignoring any whitespace or line breaks in it.
pub fn base64_decode(data: &[u8]) -> Result<Vec<u8>, MimeError> {
    let compact: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|e| MimeError::InvalidBase64(e.to_string()))
}

/// Convert every bare `\n` into `\r\n`. Existing `\r\n` pairs are kept and
/// no trailing newline is added.
pub fn canonicalize_line_endings(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 16);
    let mut previous = None;
    for &byte in data {
        if byte == b'\n' && previous != Some(b'\r') {
            out.push(b'\r');
        }
        out.push(byte);
        previous = Some(byte);
    }
    out
}

/// Rewrite every `\r\n` pair as `\n`. Lone `\r` bytes are kept.
pub fn crlf_to_lf(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut iter = data.iter().copied().peekable();
    while let Some(byte) = iter.next() {
        if byte == b'\r' && iter.peek() == Some(&b'\n') {
            continue;
        }
        out.push(byte);
    }
    out
}

/// Slice of `data` without its leading ASCII whitespace.
pub fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    &data[start..]
}
