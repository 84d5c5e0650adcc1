//! # Pinned-Certificate Verification
//!
//! ## Security Invariant
//!
//! The verifier sees exactly one certificate: the expected signer. It is
//! the only entry in both the signer stack and the trust store,
//! `NOINTERN` stops OpenSSL from using certificates embedded in the
//! signature, and `NOVERIFY` disables chain building. A signature made by
//! any other key fails with `"signer certificate not found"`, even when
//! that key's certificate chains to a trusted root.
//!
//! Verification digests the content byte-for-byte. Line-ending
//! canonicalization only happens when signing, so callers must pass the
//! exact transmitted bytes (or the canonical form the signer hashed).

use openssl::error::ErrorStack;
use openssl::pkcs7::Pkcs7Flags;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::X509;
use serde::Serialize;

use crate::error::reason;
use crate::identity::Certificate;
use crate::smime::DetachedSignature;

/// Result of a signature check.
///
/// `error` carries the OpenSSL reason, e.g. `"signer certificate not found"`
/// or `"digest failure"`, and is `None` when the signature is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    /// Whether the signature is valid for the pinned certificate.
    pub valid: bool,
    /// Failure detail when `valid` is false.
    pub error: Option<String>,
}

impl VerificationOutcome {
    pub fn verified() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// Verify `signature` over `content` against exactly `expected`.
pub fn verify_detached(
    signature: &DetachedSignature,
    content: &[u8],
    expected: &Certificate,
) -> VerificationOutcome {
    match verify_pinned(signature, content, expected) {
        Ok(()) => VerificationOutcome::verified(),
        Err(errors) => {
            let detail = reason(&errors);
            tracing::debug!(
                expected_signer = ?expected.common_name(),
                error = %detail,
                "detached signature rejected"
            );
            VerificationOutcome::failed(detail)
        }
    }
}

impl DetachedSignature {
    /// Method form of [`verify_detached`].
    pub fn verify(&self, content: &[u8], expected: &Certificate) -> VerificationOutcome {
        verify_detached(self, content, expected)
    }
}

fn verify_pinned(
    signature: &DetachedSignature,
    content: &[u8],
    expected: &Certificate,
) -> Result<(), ErrorStack> {
    let mut signers = Stack::<X509>::new()?;
    signers.push(expected.x509().clone())?;

    let mut store = X509StoreBuilder::new()?;
    store.add_cert(expected.x509().clone())?;
    let store = store.build();

    signature.pkcs7().verify(
        &signers,
        &store,
        Some(content),
        None,
        Pkcs7Flags::NOVERIFY | Pkcs7Flags::NOINTERN,
    )
}
