//! # Digest Selection: MIC Algorithm Codes
//!
//! Maps the textual digest codes exchanged in AS2 headers onto concrete
//! hash implementations and computes Message Integrity Checks.
//!
//! Partners decorate codes inconsistently (`SHA-256`, `sha256`, `SHA256`,
//! `sha_256`). Every code is normalized by lowercasing and dropping all
//! non-alphanumeric characters before it is looked up in a fixed table.
//!
//! ## Security Invariant
//!
//! The MIC is computed over the exact transmitted bytes of a MIME part with
//! only leading whitespace removed. Callers must pass raw part bytes, never
//! a re-serialized entity.
//!
//! ## Fallback
//!
//! [`resolve()`] never fails. An unrecognized code resolves to SHA-1 so that
//! receipt negotiation degrades instead of aborting the MDN.

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::encoding::trim_leading_whitespace;
use crate::error::CoreError;

/// A hash algorithm usable for MICs and detached signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// MD5. Accepted for legacy partners only.
    Md5,
    /// SHA-1. The fallback for unrecognized codes.
    Sha1,
    /// SHA-256. The default MIC algorithm.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

/// Algorithm used when a code is not in the table.
pub const FALLBACK_ALGORITHM: DigestAlgorithm = DigestAlgorithm::Sha1;

/// Algorithm used when no preference was negotiated at all.
pub const DEFAULT_MIC_ALGORITHM: DigestAlgorithm = DigestAlgorithm::Sha256;

/// Normalized code table. Read-only and shared freely across threads.
const CODE_TABLE: [(&str, DigestAlgorithm); 5] = [
    ("md5", DigestAlgorithm::Md5),
    ("sha1", DigestAlgorithm::Sha1),
    ("sha256", DigestAlgorithm::Sha256),
    ("sha384", DigestAlgorithm::Sha384),
    ("sha512", DigestAlgorithm::Sha512),
];

/// Lowercase a code and strip every character outside `[a-z0-9]`.
pub fn normalize(code: &str) -> String {
    code.chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Look up a code without falling back.
pub fn lookup(code: &str) -> Option<DigestAlgorithm> {
    let normalized = normalize(code);
    CODE_TABLE
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, algorithm)| *algorithm)
}

/// Whether `code` names a supported algorithm after normalization.
pub fn is_supported(code: &str) -> bool {
    lookup(code).is_some()
}

/// Resolve a code to an algorithm, falling back to SHA-1 when unrecognized.
pub fn resolve(code: &str) -> DigestAlgorithm {
    lookup(code).unwrap_or_else(|| {
        tracing::warn!(
            code,
            fallback = FALLBACK_ALGORITHM.as_str(),
            "unrecognized digest algorithm code"
        );
        FALLBACK_ALGORITHM
    })
}

impl DigestAlgorithm {
    /// All supported algorithms in table order.
    pub fn all() -> [DigestAlgorithm; 5] {
        CODE_TABLE.map(|(_, algorithm)| algorithm)
    }

    /// The normalized code, as sent in `Received-Content-MIC` and
    /// `signed-receipt-micalg`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// The RFC 5751 `micalg` parameter name (`sha-256` style).
    pub fn micalg(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha-256",
            Self::Sha384 => "sha-384",
            Self::Sha512 => "sha-512",
        }
    }

    /// Raw digest of `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Md5 => Md5::digest(data).to_vec(),
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Strict (unwrapped) base64 of the digest of `data`.
    pub fn base64_digest(&self, data: &[u8]) -> String {
        STANDARD.encode(self.digest(data))
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(s).ok_or_else(|| CoreError::UnsupportedDigestAlgorithm(s.to_string()))
    }
}

/// Compute the MIC of a raw MIME part.
///
/// Leading whitespace (the CR/LF left behind by boundary lines) is stripped
/// before hashing. Nothing else is touched.
pub fn compute_mic(raw_part: &[u8], algorithm: DigestAlgorithm) -> String {
    algorithm.base64_digest(trim_leading_whitespace(raw_part))
}
