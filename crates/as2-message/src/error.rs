//! # Error Types
//!
//! Outbound construction failures and structural inbound failures.
//!
//! Inbound *verification* problems are not errors: they travel as
//! `VerificationOutcome` / `SignatureCheck` values so that the receiver can
//! still answer with a failed MDN.

use thiserror::Error;

use as2_core::{CoreError, MimeError};
use as2_crypto::CryptoError;

/// Error in partner or server configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required field was not provided to a builder.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// A URL did not parse.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Parser detail.
        reason: String,
    },

    /// A TLS verify mode outside the supported set.
    #[error("tls_verify_mode '{0}' must be one of [\"peer\", \"none\"]")]
    InvalidTlsVerifyMode(String),

    /// Two partners registered under the same AS2 name.
    #[error("partner '{0}' is already registered")]
    DuplicatePartner(String),

    /// An enum-constrained value (format, scheme, digest) was rejected.
    #[error(transparent)]
    Value(#[from] CoreError),

    /// Certificate or key material could not be loaded.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid YAML for this schema.
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Error while building, decoding or evaluating AS2 messages.
#[derive(Error, Debug)]
pub enum MessageError {
    /// Signing, enveloping or decryption failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A MIME entity could not be built or decoded.
    #[error(transparent)]
    Mime(#[from] MimeError),

    /// Configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The decrypted message has no business-content part.
    #[error("message contains no attachment")]
    MissingAttachment,

    /// An MDN has no `message/disposition-notification` part.
    #[error("MDN contains no message/disposition-notification part")]
    MissingDispositionNotification,

    /// A signed MDN lacks its report or signature part.
    #[error("signed MDN is missing its {0} part")]
    MissingSignedPart(&'static str),
}
