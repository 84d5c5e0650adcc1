//! # PKCS#7 Signing and Enveloping
//!
//! Detached signatures and enveloped data as used by AS2.
//!
//! Signing runs in S/MIME text mode: OpenSSL canonicalizes line endings of
//! the signed content to CRLF before hashing. Callers hand in content that
//! is already CRLF-canonical, so the signed bytes are the transmitted bytes.
//! `sign_binary` skips canonicalization for binary transfer-encoded parts.
//!
//! Envelopes are accepted in three encodings on the way in: raw DER (what
//! this crate emits), base64 text of the DER, and a full S/MIME
//! `application/pkcs7-mime` entity.

use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::stack::Stack;
use openssl::x509::X509;

use as2_core::digest;
use as2_core::encoding::base64_decode;
use as2_core::{DigestAlgorithm, MimeEntity};

use crate::cipher::SymmetricCipher;
use crate::error::{reason, CryptoError};
use crate::identity::{Certificate, Identity};

/// A PKCS#7 signed-data structure without embedded content.
pub struct DetachedSignature {
    pkcs7: Pkcs7,
}

impl DetachedSignature {
    /// Sign `content` with `identity` in S/MIME text mode. The signer
    /// certificate is embedded.
    pub fn sign(identity: &Identity, content: &[u8]) -> Result<Self, CryptoError> {
        Self::sign_with_flags(identity, content, Pkcs7Flags::DETACHED)
    }

    /// Sign `content` byte-for-byte, without line-ending canonicalization.
    ///
    /// Used for parts sent with `Content-Transfer-Encoding: binary`, whose
    /// bytes must not be rewritten.
    pub fn sign_binary(identity: &Identity, content: &[u8]) -> Result<Self, CryptoError> {
        Self::sign_with_flags(identity, content, Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY)
    }

    fn sign_with_flags(
        identity: &Identity,
        content: &[u8],
        flags: Pkcs7Flags,
    ) -> Result<Self, CryptoError> {
        let extra_certs = Stack::<X509>::new().map_err(|e| CryptoError::Signing(reason(&e)))?;
        let pkcs7 = Pkcs7::sign(
            identity.certificate().x509(),
            identity.private_key().pkey(),
            &extra_certs,
            content,
            flags,
        )
        .map_err(|e| CryptoError::Signing(reason(&e)))?;
        tracing::debug!(
            signer = ?identity.certificate().common_name(),
            content_len = content.len(),
            binary = flags.contains(Pkcs7Flags::BINARY),
            "created detached signature"
        );
        Ok(Self { pkcs7 })
    }

    /// Parse a DER-encoded signature blob.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let pkcs7 = Pkcs7::from_der(der).map_err(|e| CryptoError::SignatureParse(reason(&e)))?;
        Ok(Self { pkcs7 })
    }

    /// DER encoding of the signature blob.
    pub fn to_der(&self) -> Result<Vec<u8>, CryptoError> {
        self.pkcs7
            .to_der()
            .map_err(|e| CryptoError::SignatureParse(reason(&e)))
    }

    /// OpenSSL's own `multipart/signed` rendering of `content` with this
    /// signature.
    ///
    /// OpenSSL re-finalizes the signed-data over `content` while writing, so
    /// the rendering works on a copy and leaves this signature untouched.
    pub fn to_smime(&self, content: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Self::from_der(&self.to_der()?)?
            .pkcs7
            .to_smime(content, Pkcs7Flags::DETACHED)
            .map_err(|e| CryptoError::Signing(reason(&e)))
    }

    /// The `micalg` parameter for the digest algorithm the signature uses,
    /// e.g. `sha-256`.
    ///
    /// Read back from OpenSSL's S/MIME writer so the value always matches
    /// the digest inside the blob.
    pub fn micalg(&self) -> Result<String, CryptoError> {
        let rendered = self.to_smime(&[])?;
        MimeEntity::parse(&rendered)
            .content_type()
            .and_then(|ct| ct.attribute_str("micalg").map(str::to_ascii_lowercase))
            .ok_or_else(|| {
                CryptoError::SignatureParse("signature does not declare a digest algorithm".into())
            })
    }

    /// The digest algorithm behind [`micalg`](Self::micalg).
    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm, CryptoError> {
        Ok(digest::resolve(&self.micalg()?))
    }

    pub(crate) fn pkcs7(&self) -> &Pkcs7 {
        &self.pkcs7
    }
}

impl std::fmt::Debug for DetachedSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DetachedSignature(..)")
    }
}

/// Read an S/MIME `multipart/signed` entity with OpenSSL's reader.
///
/// Returns the signature and the signed content as OpenSSL extracted it.
/// Fails when the signature part is not base64 encoded, which some partner
/// stacks do; callers fall back to splitting the multipart themselves.
pub fn read_smime(data: &[u8]) -> Result<(DetachedSignature, Vec<u8>), CryptoError> {
    let (pkcs7, content) =
        Pkcs7::from_smime(data).map_err(|e| CryptoError::SignatureParse(reason(&e)))?;
    let content = content.ok_or_else(|| {
        CryptoError::SignatureParse("S/MIME entity is not a detached signature".into())
    })?;
    Ok((DetachedSignature { pkcs7 }, content))
}

/// Envelope `content` for `recipient`. Returns DER.
pub fn encrypt(
    content: &[u8],
    recipient: &Certificate,
    cipher: SymmetricCipher,
) -> Result<Vec<u8>, CryptoError> {
    let mut recipients = Stack::<X509>::new().map_err(|e| CryptoError::Encryption(reason(&e)))?;
    recipients
        .push(recipient.x509().clone())
        .map_err(|e| CryptoError::Encryption(reason(&e)))?;
    let pkcs7 = Pkcs7::encrypt(&recipients, content, cipher.openssl_cipher(), Pkcs7Flags::BINARY)
        .map_err(|e| CryptoError::Encryption(reason(&e)))?;
    let der = pkcs7
        .to_der()
        .map_err(|e| CryptoError::Encryption(reason(&e)))?;
    tracing::debug!(
        recipient = ?recipient.common_name(),
        cipher = %cipher,
        envelope_len = der.len(),
        "enveloped content"
    );
    Ok(der)
}

/// Decrypt an envelope addressed to `identity`.
pub fn decrypt(envelope: &[u8], identity: &Identity) -> Result<Vec<u8>, CryptoError> {
    let pkcs7 = parse_envelope(envelope)?;
    pkcs7
        .decrypt(
            identity.private_key().pkey(),
            identity.certificate().x509(),
            Pkcs7Flags::empty(),
        )
        .map_err(|e| CryptoError::Decryption(reason(&e)))
}

fn parse_envelope(envelope: &[u8]) -> Result<Pkcs7, CryptoError> {
    if let Ok(pkcs7) = Pkcs7::from_der(envelope) {
        return Ok(pkcs7);
    }
    if let Ok(der) = base64_decode(envelope) {
        if let Ok(pkcs7) = Pkcs7::from_der(&der) {
            return Ok(pkcs7);
        }
    }
    Pkcs7::from_smime(envelope)
        .map(|(pkcs7, _)| pkcs7)
        .map_err(|e| CryptoError::Decryption(reason(&e)))
}
