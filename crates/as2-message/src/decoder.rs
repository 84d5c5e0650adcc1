//! # Message Decoder
//!
//! Turns a received envelope into an [`InboundMessage`]:
//!
//! 1. Decrypt with the local identity. Failure is fatal.
//! 2. Parse the decrypted MIME tree, keeping every part's exact bytes.
//! 3. Resolve the attachment: the first non-signature leaf, preferring
//!    `application/edi*`. A flat (non-multipart) message has none.
//! 4. Resolve the signature part, only inside a `multipart/signed` body.
//!
//! Verification is a separate step, [`InboundMessage::verify_signature`],
//! so that a message with a bad signature can still be inspected and
//! answered with a failed MDN.
//!
//! ## Security Invariant
//!
//! The signature is checked over the raw bytes of the first part of the
//! `multipart/signed` body with only leading whitespace removed, against a
//! single pinned certificate. The MIC is computed over the same kind of raw
//! bytes, never over a re-serialization.
//!
//! ## Line-ending recovery
//!
//! Some sending stacks emit a `Content-Transfer-Encoding: binary` part whose
//! body gained CR bytes after it was signed. When the first verification
//! fails for such a part and [`DecodeOptions::line_ending_recovery`] is on,
//! the body's `\r\n` pairs are rewritten to `\n` (headers untouched) and
//! verification is retried once. A successful retry replaces the resolved
//! attachment, sets [`InboundMessage::line_endings_recovered`] and logs a
//! warning. Any other failure stands as reported.

use as2_core::encoding::{crlf_to_lf, trim_leading_whitespace};
use as2_core::{compute_mic, DigestAlgorithm, MimeEntity, DEFAULT_MIC_ALGORITHM};
use as2_crypto::{decrypt, Certificate, DetachedSignature, Identity, VerificationOutcome};

use crate::error::MessageError;

/// Knobs for [`InboundMessage::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Algorithm for [`InboundMessage::mic`].
    pub mic_algorithm: DigestAlgorithm,
    /// Retry failed binary parts with CRLF rewritten to LF.
    pub line_ending_recovery: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            mic_algorithm: DEFAULT_MIC_ALGORITHM,
            line_ending_recovery: true,
        }
    }
}

impl DecodeOptions {
    pub fn with_mic_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.mic_algorithm = algorithm;
        self
    }

    pub fn with_line_ending_recovery(mut self, enabled: bool) -> Self {
        self.line_ending_recovery = enabled;
        self
    }
}

/// A decrypted inbound AS2 message.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    entity: MimeEntity,
    content: Option<MimeEntity>,
    signature: Option<MimeEntity>,
    attachment: Option<MimeEntity>,
    options: DecodeOptions,
    verification: Option<VerificationOutcome>,
    line_endings_recovered: bool,
}

impl InboundMessage {
    /// Decrypt `envelope` (DER, base64 DER or S/MIME text) and parse it.
    pub fn decode(
        envelope: &[u8],
        identity: &Identity,
        options: DecodeOptions,
    ) -> Result<Self, MessageError> {
        let decrypted = decrypt(envelope, identity)?;
        Ok(Self::from_decrypted(&decrypted, options))
    }

    /// Parse an already-decrypted message.
    pub fn from_decrypted(decrypted: &[u8], options: DecodeOptions) -> Self {
        let entity = MimeEntity::parse(decrypted);
        let signed = entity.mime_type() == "multipart/signed";

        let content = if signed {
            entity.parts().first().cloned()
        } else {
            None
        };
        let signature = if signed {
            entity.parts().iter().find(|part| is_signature(part)).cloned()
        } else {
            None
        };
        let attachment = if entity.is_multipart() {
            select_attachment(entity.leaves()).cloned()
        } else {
            None
        };

        tracing::debug!(
            content_type = %entity.mime_type(),
            signed,
            parts = entity.parts().len(),
            has_attachment = attachment.is_some(),
            "decoded inbound message"
        );
        Self {
            entity,
            content,
            signature,
            attachment,
            options,
            verification: None,
            line_endings_recovered: false,
        }
    }

    /// Verify the detached signature against `expected` only.
    ///
    /// May replace the resolved attachment when line-ending recovery
    /// succeeds; see the module docs.
    pub fn verify_signature(&mut self, expected: &Certificate) -> VerificationOutcome {
        let outcome = self.check_signature(expected);
        self.verification = Some(outcome.clone());
        outcome
    }

    fn check_signature(&mut self, expected: &Certificate) -> VerificationOutcome {
        let (Some(content), Some(signature_part)) = (&self.content, &self.signature) else {
            return VerificationOutcome::failed("message is not signed");
        };
        let signature = match signature_part
            .decoded_body()
            .map_err(MessageError::from)
            .and_then(|der| DetachedSignature::from_der(&der).map_err(MessageError::from))
        {
            Ok(signature) => signature,
            Err(e) => return VerificationOutcome::failed(e.to_string()),
        };

        let outcome = signature.verify(trim_leading_whitespace(content.raw()), expected);
        if outcome.valid
            || !self.options.line_ending_recovery
            || content.transfer_encoding() != "binary"
        {
            return outcome;
        }

        let rewritten = content.with_body(&crlf_to_lf(content.body()));
        let retry = signature.verify(trim_leading_whitespace(rewritten.raw()), expected);
        if !retry.valid {
            return outcome;
        }

        tracing::warn!(
            original_error = ?outcome.error,
            "signature verified only after rewriting CRLF to LF in a binary part"
        );
        self.attachment = select_attachment(rewritten.leaves()).cloned();
        self.content = Some(rewritten);
        self.line_endings_recovered = true;
        retry
    }

    /// The parsed decrypted message.
    pub fn entity(&self) -> &MimeEntity {
        &self.entity
    }

    /// Whether the message is `multipart/signed`.
    pub fn is_signed(&self) -> bool {
        self.content.is_some()
    }

    /// The business-content part, if one was resolved.
    pub fn attachment(&self) -> Option<&MimeEntity> {
        self.attachment.as_ref()
    }

    /// The detached-signature part, if the message is signed.
    pub fn signature_part(&self) -> Option<&MimeEntity> {
        self.signature.as_ref()
    }

    /// Outcome of the last [`verify_signature`](Self::verify_signature)
    /// call; `None` before verification.
    pub fn verification(&self) -> Option<&VerificationOutcome> {
        self.verification.as_ref()
    }

    /// Whether verification only succeeded after line-ending recovery.
    pub fn line_endings_recovered(&self) -> bool {
        self.line_endings_recovered
    }

    /// MIC of the attachment under the configured algorithm.
    pub fn mic(&self) -> Option<String> {
        self.mic_with(self.options.mic_algorithm)
    }

    /// MIC of the attachment under `algorithm`.
    pub fn mic_with(&self, algorithm: DigestAlgorithm) -> Option<String> {
        self.attachment
            .as_ref()
            .map(|part| compute_mic(part.raw(), algorithm))
    }

    pub fn mic_algorithm(&self) -> DigestAlgorithm {
        self.options.mic_algorithm
    }

    /// File name declared by the attachment.
    pub fn file_name(&self) -> Option<String> {
        self.attachment.as_ref().and_then(MimeEntity::file_name)
    }

    /// Attachment body with its transfer encoding removed.
    pub fn attachment_content(&self) -> Result<Vec<u8>, MessageError> {
        let attachment = self
            .attachment
            .as_ref()
            .ok_or(MessageError::MissingAttachment)?;
        Ok(attachment.decoded_body()?)
    }
}

fn is_signature(part: &MimeEntity) -> bool {
    part.mime_type().contains("pkcs7-signature")
}

fn select_attachment(leaves: Vec<&MimeEntity>) -> Option<&MimeEntity> {
    let candidates: Vec<&MimeEntity> = leaves.into_iter().filter(|p| !is_signature(p)).collect();
    candidates
        .iter()
        .find(|part| part.mime_type().starts_with("application/edi"))
        .or_else(|| candidates.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::payload::DocumentPayload;
    use crate::signed::layout_for;
    use as2_core::WireFormat;
    use as2_crypto::{encrypt, SymmetricCipher};

    fn signed(content: &[u8], signature: &DetachedSignature, format: WireFormat) -> Vec<u8> {
        layout_for(format)
            .wrap(content, signature)
            .unwrap()
            .as_bytes()
            .to_vec()
    }

    fn signed_document(format: WireFormat) -> (Vec<u8>, Vec<u8>) {
        let document = DocumentPayload::new("data.txt", b"hello\n".to_vec())
            .to_bytes(format.base64_scheme())
            .unwrap();
        let signature = DetachedSignature::sign(&fixtures::alice(), &document).unwrap();
        (document.clone(), signed(&document, &signature, format))
    }

    #[test]
    fn test_decode_round_trip() {
        let bob = fixtures::bob();
        for format in [WireFormat::V0, WireFormat::V1] {
            let (document, container) = signed_document(format);
            let wire = encrypt(&container, bob.certificate(), SymmetricCipher::default()).unwrap();

            let mut message = InboundMessage::decode(&wire, &bob, DecodeOptions::default()).unwrap();
            assert!(message.is_signed());
            assert_eq!(message.attachment().unwrap().raw(), document.as_slice());
            assert_eq!(message.attachment_content().unwrap(), b"hello\n");
            assert_eq!(message.file_name().as_deref(), Some("data.txt"));

            let outcome = message.verify_signature(fixtures::alice().certificate());
            assert!(outcome.valid, "{format}: {:?}", outcome.error);
            assert_eq!(message.verification(), Some(&outcome));
            assert!(!message.line_endings_recovered());
        }
    }

    #[test]
    fn test_decrypt_failure_is_fatal() {
        let wire = encrypt(b"x", fixtures::bob().certificate(), SymmetricCipher::default()).unwrap();
        let err = InboundMessage::decode(&wire, &fixtures::alice(), DecodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, MessageError::Crypto(_)));
    }

    #[test]
    fn test_mic_uses_raw_attachment_bytes() {
        let (document, container) = signed_document(WireFormat::V1);
        let message = InboundMessage::from_decrypted(&container, DecodeOptions::default());
        assert_eq!(message.mic(), Some(compute_mic(&document, DigestAlgorithm::Sha256)));
        assert_eq!(
            message.mic_with(DigestAlgorithm::Sha1),
            Some(compute_mic(&document, DigestAlgorithm::Sha1))
        );

        let sha1 = InboundMessage::from_decrypted(
            &container,
            DecodeOptions::default().with_mic_algorithm(DigestAlgorithm::Sha1),
        );
        assert_eq!(sha1.mic_algorithm(), DigestAlgorithm::Sha1);
        assert_eq!(sha1.mic(), message.mic_with(DigestAlgorithm::Sha1));
    }

    #[test]
    fn test_pinned_to_expected_signer() {
        let (_, container) = signed_document(WireFormat::V0);
        let mut message = InboundMessage::from_decrypted(&container, DecodeOptions::default());
        let outcome = message.verify_signature(fixtures::mallory().certificate());
        assert!(!outcome.valid);
        assert_eq!(outcome.error.as_deref(), Some("signer certificate not found"));
    }

    #[test]
    fn test_tampered_content_still_exposed() {
        let (_, container) = signed_document(WireFormat::V1);
        let text = String::from_utf8(container).unwrap();
        // "aGVsbG8K" is base64 for "hello\n"; "aGVsbG9K" decodes to "hello" + 'J'.
        let tampered = text.replacen("aGVsbG8K", "aGVsbG9K", 1).into_bytes();

        let mut message = InboundMessage::from_decrypted(&tampered, DecodeOptions::default());
        let outcome = message.verify_signature(fixtures::alice().certificate());
        assert_eq!(outcome.error.as_deref(), Some("digest failure"));
        assert_eq!(message.attachment_content().unwrap(), b"helloJ");
    }

    #[test]
    fn test_flat_message_has_no_attachment() {
        let message = InboundMessage::from_decrypted(
            b"Content-Type: application/edi-x12\r\n\r\nISA*00*",
            DecodeOptions::default(),
        );
        assert!(!message.is_signed());
        assert!(message.attachment().is_none());
        assert!(message.mic().is_none());
        assert!(matches!(
            message.attachment_content(),
            Err(MessageError::MissingAttachment)
        ));
    }

    #[test]
    fn test_unsigned_message_fails_verification() {
        let mut message = InboundMessage::from_decrypted(
            b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\nContent-Type: text/plain\r\n\r\nhi\r\n--b--\r\n",
            DecodeOptions::default(),
        );
        assert!(message.attachment().is_some());
        let outcome = message.verify_signature(fixtures::alice().certificate());
        assert_eq!(outcome.error.as_deref(), Some("message is not signed"));
    }

    #[test]
    fn test_prefers_edi_part() {
        let data = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\nContent-Type: text/plain\r\n\r\ncover letter\r\n\
--b\r\nContent-Type: application/EDIFACT\r\nContent-Disposition: attachment; filename=order.edi\r\n\r\nUNB+UNOA\r\n\
--b\r\nContent-Type: application/pkcs7-signature\r\n\r\nAAAA\r\n\
--b--\r\n";
        let message = InboundMessage::from_decrypted(data, DecodeOptions::default());
        assert_eq!(message.file_name().as_deref(), Some("order.edi"));
        assert_eq!(message.attachment_content().unwrap(), b"UNB+UNOA");
    }

    #[test]
    fn test_only_signature_parts_yield_no_attachment() {
        let data = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\nContent-Type: application/x-pkcs7-signature\r\n\r\nAAAA\r\n\
--b--\r\n";
        let message = InboundMessage::from_decrypted(data, DecodeOptions::default());
        assert!(message.attachment().is_none());
    }

    #[test]
    fn test_garbage_signature_part_is_reported() {
        let data = b"Content-Type: multipart/signed; boundary=b\r\n\r\n\
--b\r\nContent-Type: text/plain\r\n\r\nhi\r\n\
--b\r\nContent-Type: application/pkcs7-signature\r\nContent-Transfer-Encoding: base64\r\n\r\n!!!\r\n\
--b--\r\n";
        let mut message = InboundMessage::from_decrypted(data, DecodeOptions::default());
        let outcome = message.verify_signature(fixtures::alice().certificate());
        assert!(!outcome.valid);
        assert!(outcome.error.unwrap().contains("base64"));
    }

    const SIGNED_BINARY: &[u8] =
        b"Content-Type: application/edi-x12\r\nContent-Transfer-Encoding: binary\r\n\r\nISA*00\nGS*01\n";
    const TRANSMITTED_BINARY: &[u8] =
        b"Content-Type: application/edi-x12\r\nContent-Transfer-Encoding: binary\r\n\r\nISA*00\r\nGS*01\r\n";

    fn corrupted_binary_message() -> Vec<u8> {
        let signature = DetachedSignature::sign_binary(&fixtures::alice(), SIGNED_BINARY).unwrap();
        signed(TRANSMITTED_BINARY, &signature, WireFormat::V1)
    }

    #[test]
    fn test_binary_line_ending_recovery() {
        let mut message =
            InboundMessage::from_decrypted(&corrupted_binary_message(), DecodeOptions::default());
        let outcome = message.verify_signature(fixtures::alice().certificate());
        assert!(outcome.valid, "{:?}", outcome.error);
        assert!(message.line_endings_recovered());
        assert_eq!(message.attachment().unwrap().raw(), SIGNED_BINARY);
        assert_eq!(message.attachment_content().unwrap(), b"ISA*00\nGS*01\n");
        assert_eq!(
            message.mic(),
            Some(compute_mic(SIGNED_BINARY, DigestAlgorithm::Sha256))
        );
    }

    #[test]
    fn test_recovery_can_be_disabled() {
        let mut message = InboundMessage::from_decrypted(
            &corrupted_binary_message(),
            DecodeOptions::default().with_line_ending_recovery(false),
        );
        let outcome = message.verify_signature(fixtures::alice().certificate());
        assert_eq!(outcome.error.as_deref(), Some("digest failure"));
        assert!(!message.line_endings_recovered());
        assert_eq!(message.attachment().unwrap().raw(), TRANSMITTED_BINARY);
    }

    #[test]
    fn test_recovery_does_not_rescue_wrong_signer() {
        let mut message =
            InboundMessage::from_decrypted(&corrupted_binary_message(), DecodeOptions::default());
        let outcome = message.verify_signature(fixtures::mallory().certificate());
        assert_eq!(outcome.error.as_deref(), Some("signer certificate not found"));
        assert!(!message.line_endings_recovered());
    }

    #[test]
    fn test_recovery_only_applies_to_binary_parts() {
        let signed_8bit: &[u8] =
            b"Content-Type: application/edi-x12\r\nContent-Transfer-Encoding: 8bit\r\n\r\nISA*00\nGS*01\n";
        let transmitted_8bit: &[u8] =
            b"Content-Type: application/edi-x12\r\nContent-Transfer-Encoding: 8bit\r\n\r\nISA*00\r\nGS*01\r\n";
        let signature = DetachedSignature::sign_binary(&fixtures::alice(), signed_8bit).unwrap();
        let container = signed(transmitted_8bit, &signature, WireFormat::V1);

        let mut message = InboundMessage::from_decrypted(&container, DecodeOptions::default());
        let outcome = message.verify_signature(fixtures::alice().certificate());
        assert_eq!(outcome.error.as_deref(), Some("digest failure"));
        assert!(!message.line_endings_recovered());
    }
}
