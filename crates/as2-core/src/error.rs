//! # Error Types
//!
//! Errors raised by the foundational layer. Header and MIME parsing never
//! fail (they degrade to partial output), so only value validation, entity
//! construction and body decoding surface errors here.

use thiserror::Error;

/// Top-level error type for `as2-core`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A base64 scheme name outside the supported set.
    #[error("unsupported scheme '{0}'. choose one of: [\"rfc2045\", \"rfc4648\"]")]
    UnsupportedBase64Scheme(String),

    /// An outbound format name outside the supported set.
    #[error("outbound_format '{0}' must be one of [\"v0\", \"v1\"]")]
    UnsupportedWireFormat(String),

    /// A digest code that does not normalize to a supported algorithm.
    ///
    /// Only strict lookups raise this. `digest::resolve` falls back to
    /// SHA-1 instead.
    #[error("unsupported digest algorithm '{0}'. choose one of: [\"md5\", \"sha1\", \"sha256\", \"sha384\", \"sha512\"]")]
    UnsupportedDigestAlgorithm(String),

    /// MIME construction or decoding failed.
    #[error("mime error: {0}")]
    Mime(#[from] MimeError),
}

/// Error while building or decoding a MIME entity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MimeError {
    /// A body was assigned to an entity that holds child parts.
    #[error("cannot set a body on a multipart entity")]
    BodyOnMultipart,

    /// A multipart-only operation was applied to a single-part entity.
    #[error("entity is not multipart")]
    NotMultipart,

    /// A pre-serialized entity was modified.
    #[error("cannot modify a pre-serialized entity")]
    Verbatim,

    /// A base64 transfer-encoded body could not be decoded.
    #[error("invalid base64 body: {0}")]
    InvalidBase64(String),

    /// A quoted-printable body contained a malformed escape.
    #[error("invalid quoted-printable body at byte {0}")]
    InvalidQuotedPrintable(usize),
}
