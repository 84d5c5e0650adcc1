//! # as2-core: Foundational Types for AS2 Messaging
//!
//! This crate is the leaf of the AS2 workspace. It holds the pieces every
//! other crate needs and that involve no private-key cryptography:
//!
//! - **Digest selection.** `DigestAlgorithm` maps the loose algorithm codes
//!   partners send (`sha256`, `SHA-256`, `sha_1`) onto a fixed table and
//!   computes the base64 Message Integrity Check (MIC).
//! - **Structured header parsing.** AS2 headers such as
//!   `Disposition-Notification-Options` pack ordered `key=value` attributes
//!   with comma lists into one line. `header::parse_body` unpacks them.
//! - **MIME entities.** `MimePart` builds entities, `MimeEntity` parses them
//!   while keeping the exact raw bytes of every part. Signatures and MICs
//!   are computed over those bytes, so re-serialization is never used on
//!   the receive path.
//! - **Wire formats and encodings.** `WireFormat` (v0 legacy, v1 standard),
//!   `Base64Scheme`, line-ending canonicalization, identifier helpers.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `as2-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Parsers are lenient: malformed input degrades to partial results
//!   instead of errors wherever a partner quirk is plausible.

pub mod digest;
pub mod encoding;
pub mod error;
pub mod format;
pub mod header;
pub mod identifiers;
pub mod mime;

// Re-export primary types for ergonomic imports.
pub use digest::{compute_mic, DigestAlgorithm, DEFAULT_MIC_ALGORITHM, FALLBACK_ALGORITHM};
pub use encoding::{base64_encode, canonicalize_line_endings, Base64Scheme};
pub use error::{CoreError, MimeError};
pub use format::WireFormat;
pub use header::{choose_mic_algorithm, HeaderMap, HeaderValue, StructuredHeader};
pub use identifiers::{generate_message_id, quoted_system_identifier, unquoted_system_identifier};
pub use mime::{parse_header_fields, LineEnding, MimeEntity, MimePart};
