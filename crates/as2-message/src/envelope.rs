//! # Envelope Builder
//!
//! Sign, wrap and encrypt a document for one recipient:
//!
//! 1. Serialize the [`DocumentPayload`] (CRLF headers, base64 or binary body).
//! 2. Detach-sign those exact bytes with the sender identity.
//! 3. Wrap document and signature in the partner's [`SignedLayout`](crate::signed::SignedLayout).
//! 4. Envelope the container for the recipient certificate.
//!
//! ## Security Invariant
//!
//! Every step propagates its failure. A partially built envelope is never
//! returned, so nothing unsigned or unencrypted can reach the wire.

use as2_core::{compute_mic, Base64Scheme, DigestAlgorithm, WireFormat};
use as2_crypto::{encrypt, Certificate, DetachedSignature, Identity, SymmetricCipher};

use crate::config::{Partner, ServerInfo};
use crate::error::MessageError;
use crate::payload::{DocumentPayload, TransferEncoding};
use crate::signed::{layout_for, SignedContainer};

/// Builds encrypted AS2 envelopes.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder<'a> {
    signer: &'a Identity,
    recipient: &'a Certificate,
    format: WireFormat,
    cipher: SymmetricCipher,
    base64_scheme: Option<Base64Scheme>,
}

impl<'a> EnvelopeBuilder<'a> {
    /// A builder with the default format (`v0`) and cipher (AES-256-CBC).
    pub fn new(signer: &'a Identity, recipient: &'a Certificate) -> Self {
        Self {
            signer,
            recipient,
            format: WireFormat::default(),
            cipher: SymmetricCipher::default(),
            base64_scheme: None,
        }
    }

    /// A builder configured from the partner's interoperability settings.
    pub fn for_partner(server: &'a ServerInfo, partner: &'a Partner) -> Self {
        Self::new(server.signing_identity(), partner.encryption_certificate())
            .format(partner.outbound_format())
            .cipher(partner.cipher())
            .base64_scheme(partner.document_base64_scheme())
    }

    pub fn format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    pub fn cipher(mut self, cipher: SymmetricCipher) -> Self {
        self.cipher = cipher;
        self
    }

    /// Override the document base64 layout. Defaults to the format's.
    pub fn base64_scheme(mut self, scheme: Base64Scheme) -> Self {
        self.base64_scheme = Some(scheme);
        self
    }

    pub fn build(&self, payload: &DocumentPayload) -> Result<BuiltEnvelope, MessageError> {
        let scheme = self
            .base64_scheme
            .unwrap_or_else(|| self.format.base64_scheme());
        let document_payload = payload.to_bytes(scheme)?;

        let signature = match payload.transfer_encoding() {
            TransferEncoding::Base64 => DetachedSignature::sign(self.signer, &document_payload)?,
            TransferEncoding::Binary => {
                DetachedSignature::sign_binary(self.signer, &document_payload)?
            }
        };
        let signed = layout_for(self.format).wrap(&document_payload, &signature)?;
        let wire = encrypt(signed.as_bytes(), self.recipient, self.cipher)?;

        tracing::debug!(
            file_name = %payload.file_name(),
            format = %self.format,
            cipher = %self.cipher,
            micalg = %signed.micalg(),
            wire_len = wire.len(),
            "built envelope"
        );
        Ok(BuiltEnvelope {
            document_payload,
            signed,
            wire,
        })
    }
}

/// Output of [`EnvelopeBuilder::build`].
#[derive(Debug, Clone)]
pub struct BuiltEnvelope {
    document_payload: Vec<u8>,
    signed: SignedContainer,
    wire: Vec<u8>,
}

impl BuiltEnvelope {
    /// The serialized document exactly as signed. Retain it: the partner's
    /// MDN MIC is checked against these bytes.
    pub fn document_payload(&self) -> &[u8] {
        &self.document_payload
    }

    pub fn signed_container(&self) -> &SignedContainer {
        &self.signed
    }

    /// DER-encoded enveloped data.
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }

    /// MIC the partner should report for this document.
    pub fn mic(&self, algorithm: DigestAlgorithm) -> String {
        compute_mic(&self.document_payload, algorithm)
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.document_payload, self.wire)
    }
}

/// One-call form of the builder. Returns `(document_payload, wire)`.
pub fn build_envelope(
    content: &[u8],
    content_type: &str,
    file_name: &str,
    format: WireFormat,
    signer: &Identity,
    recipient: &Certificate,
    cipher: SymmetricCipher,
) -> Result<(Vec<u8>, Vec<u8>), MessageError> {
    let payload = DocumentPayload::new(file_name, content).with_content_type(content_type);
    let built = EnvelopeBuilder::new(signer, recipient)
        .format(format)
        .cipher(cipher)
        .build(&payload)?;
    Ok(built.into_parts())
}
