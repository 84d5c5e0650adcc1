//! # as2-crypto: S/MIME Primitives for AS2
//!
//! Wraps OpenSSL's PKCS#7 implementation behind AS2-shaped operations:
//!
//! - **Identities.** `Certificate`, `PrivateKey` and `Identity` newtypes.
//!   An `Identity` is only constructible when the key matches the
//!   certificate.
//! - **Detached signatures.** `DetachedSignature::sign` produces the blob
//!   carried in a `multipart/signed` container and reports the `micalg`
//!   OpenSSL actually used.
//! - **Enveloping.** `encrypt` and `decrypt` for `application/pkcs7-mime`
//!   enveloped data, with a selectable `SymmetricCipher`.
//! - **Pinned verification.** `verify_detached` checks a signature against
//!   exactly one expected certificate.
//!
//! ## Security Invariant
//!
//! Verification builds a trust store holding only the expected signer,
//! disables chain building (`NOVERIFY`) and ignores certificates embedded
//! in the signature (`NOINTERN`). "Valid" therefore means "signed by this
//! exact certificate".
//!
//! ## Crate Policy
//!
//! - Depends only on `as2-core` internally.
//! - Private keys never implement `Serialize` and are redacted in `Debug`.
//! - No mocking of cryptographic operations in tests. Tests use real RSA
//!   fixtures and real OpenSSL.

pub mod cipher;
pub mod error;
pub mod identity;
pub mod smime;
pub mod verify;

#[cfg(test)]
mod fixtures;

pub use cipher::SymmetricCipher;
pub use error::CryptoError;
pub use identity::{Certificate, Identity, PrivateKey};
pub use smime::{decrypt, encrypt, read_smime, DetachedSignature};
pub use verify::{verify_detached, VerificationOutcome};
