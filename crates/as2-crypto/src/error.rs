//! # Error Types
//!
//! Failures of identity loading, signing, enveloping and decryption.
//!
//! Signature *verification* failures are not errors. They are reported as
//! a `VerificationOutcome` so that an inbound failure can still produce a
//! well-formed failed MDN.

use openssl::error::ErrorStack;
use thiserror::Error;

use as2_core::MimeError;

/// Error in S/MIME cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// A certificate could not be parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// A private key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// The private key does not belong to the certificate.
    #[error("private key does not match certificate {0}")]
    KeyMismatch(String),

    /// Detached signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Enveloping for the recipient failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The envelope could not be parsed or decrypted with the given identity.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// A detached signature blob could not be read.
    #[error("unreadable signature: {0}")]
    SignatureParse(String),

    /// A cipher name outside the supported set.
    #[error("unsupported cipher '{0}'. choose one of: [\"aes-128-cbc\", \"aes-192-cbc\", \"aes-256-cbc\", \"des-ede3-cbc\"]")]
    UnsupportedCipher(String),

    /// MIME handling around a signature failed.
    #[error("mime error: {0}")]
    Mime(#[from] MimeError),

    /// Reading key material from disk failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reduce an OpenSSL error stack to its first reason string, such as
/// `"signer certificate not found"` or `"digest failure"`.
pub(crate) fn reason(errors: &ErrorStack) -> String {
    errors
        .errors()
        .iter()
        .find_map(|error| error.reason())
        .map(str::to_string)
        .unwrap_or_else(|| errors.to_string())
}
