//! # MDN Evaluator
//!
//! Reads the partner's synchronous MDN and decides whether a transmission
//! succeeded.
//!
//! The HTTP layer hands the `Content-Type` over as a response header, so the
//! evaluator prepends it to the body to get a parseable MIME entity. Signed
//! MDNs go through OpenSSL's S/MIME reader first; partners that send the
//! signature part in binary instead of base64 break that reader, in which
//! case the multipart is split by position (part 0 report, part 1
//! signature) and verified against the same pinned certificate.
//!
//! Problems found along the way are recorded in the [`TransmissionResult`],
//! never returned as errors.

use as2_core::digest;
use as2_core::encoding::trim_leading_whitespace;
use as2_core::{canonicalize_line_endings, compute_mic, DigestAlgorithm, HeaderMap, MimeEntity};
use as2_crypto::{read_smime, Certificate, DetachedSignature};

use crate::error::MessageError;
use crate::mdn::MdnReport;

/// Transport-neutral view of the HTTP response that carried an MDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get_str("Content-Type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Result of checking an MDN's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureCheck {
    Verified,
    Failed(String),
    /// The MDN was not signed.
    NotChecked,
}

impl SignatureCheck {
    /// Error text, with a fixed sentinel for unsigned MDNs.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Verified => None,
            Self::Failed(error) => Some(error),
            Self::NotChecked => Some("not checked: MDN is unsigned"),
        }
    }
}

/// What the sender retained about an outbound message.
#[derive(Debug, Clone, Copy)]
pub struct SentMessage<'a> {
    pub message_id: &'a str,
    /// The document exactly as signed.
    pub document_payload: &'a [u8],
    /// Algorithm requested from the partner, used when the MDN omits one.
    pub mic_algorithm: DigestAlgorithm,
}

/// Outcome of one transmission, as judged from its MDN.
#[derive(Debug, Clone)]
pub struct TransmissionResult {
    response: Option<HttpResponse>,
    outbound_message_id: String,
    mic_matched: Option<bool>,
    mid_matched: bool,
    body: Option<String>,
    disposition: Option<String>,
    signature: SignatureCheck,
    exception: Option<String>,
}

impl TransmissionResult {
    fn empty(outbound_message_id: &str, response: Option<HttpResponse>) -> Self {
        Self {
            response,
            outbound_message_id: outbound_message_id.to_string(),
            mic_matched: None,
            mid_matched: false,
            body: None,
            disposition: None,
            signature: SignatureCheck::NotChecked,
            exception: None,
        }
    }

    /// A result for a transmission that failed before an MDN arrived.
    pub fn from_transport_error(outbound_message_id: &str, error: impl std::fmt::Display) -> Self {
        let mut result = Self::empty(outbound_message_id, None);
        result.exception = Some(error.to_string());
        result
    }

    /// The HTTP response, when one arrived.
    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    pub fn outbound_message_id(&self) -> &str {
        &self.outbound_message_id
    }

    /// Whether `Received-Content-MIC` matched; `None` when the MDN had none.
    pub fn mic_matched(&self) -> Option<bool> {
        self.mic_matched
    }

    /// Whether `Original-Message-ID` matched the sent Message-ID.
    pub fn mid_matched(&self) -> bool {
        self.mid_matched
    }

    /// Text of the MDN's human-readable part.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn disposition(&self) -> Option<&str> {
        self.disposition.as_deref()
    }

    /// Alias of [`disposition`](Self::disposition).
    pub fn disp_code(&self) -> Option<&str> {
        self.disposition()
    }

    pub fn signature_check(&self) -> &SignatureCheck {
        &self.signature
    }

    pub fn signature_verification_error(&self) -> Option<&str> {
        self.signature.error()
    }

    pub fn signature_verified(&self) -> bool {
        self.signature == SignatureCheck::Verified
    }

    /// Transport or structural problem that stopped evaluation.
    pub fn exception(&self) -> Option<&str> {
        self.exception.as_deref()
    }

    /// Signed and verified, both MIC and Message-ID matched, and the
    /// disposition is `processed` without an `/error` qualifier.
    /// Warnings still count as success.
    pub fn success(&self) -> bool {
        let disposition = self.disposition.as_deref().unwrap_or_default().to_ascii_lowercase();
        self.signature_verified()
            && self.mic_matched == Some(true)
            && self.mid_matched
            && disposition.contains("processed")
            && !disposition.contains("processed/error")
    }
}

/// Evaluate the MDN in `response` for the message described by `sent`.
pub fn evaluate_mdn(
    response: HttpResponse,
    partner_certificate: &Certificate,
    sent: &SentMessage<'_>,
) -> TransmissionResult {
    if !response.is_success() {
        let status = response.status;
        let mut result = TransmissionResult::empty(sent.message_id, Some(response));
        result.exception = Some(format!("unexpected HTTP status {status}"));
        return result;
    }
    let Some(content_type) = response.content_type().map(str::to_string) else {
        let mut result = TransmissionResult::empty(sent.message_id, Some(response));
        result.exception = Some("MDN response has no Content-Type".to_string());
        return result;
    };

    let mut synthetic = format!("Content-Type: {content_type}\r\n\r\n").into_bytes();
    synthetic.extend_from_slice(&response.body);
    let entity = MimeEntity::parse(&synthetic);

    let mut result = TransmissionResult::empty(sent.message_id, None);
    result.signature = if entity.mime_type() == "multipart/signed" {
        check_signed(&synthetic, &entity, partner_certificate)
    } else {
        tracing::warn!(
            content_type = %content_type,
            message_id = %sent.message_id,
            "MDN is unsigned"
        );
        SignatureCheck::NotChecked
    };

    match extract_report(&entity) {
        Ok(report) => {
            result.mid_matched = report
                .original_message_id
                .as_deref()
                .map(str::trim)
                == Some(sent.message_id);
            result.mic_matched = report.received_content_mic.as_ref().map(|received| {
                let algorithm = received
                    .algorithm
                    .as_deref()
                    .map(digest::resolve)
                    .unwrap_or(sent.mic_algorithm);
                received.mic == compute_mic(sent.document_payload, algorithm)
            });
            result.disposition = Some(report.disposition.clone()).filter(|d| !d.is_empty());
            result.body = Some(report.text);
        }
        Err(e) => result.exception = Some(e.to_string()),
    }

    tracing::debug!(
        message_id = %sent.message_id,
        signature_verified = result.signature_verified(),
        mic_matched = ?result.mic_matched,
        mid_matched = result.mid_matched,
        disposition = ?result.disposition,
        "evaluated MDN"
    );
    result.response = Some(response);
    result
}

fn check_signed(synthetic: &[u8], entity: &MimeEntity, certificate: &Certificate) -> SignatureCheck {
    match read_smime(synthetic) {
        Ok((signature, content)) => {
            let outcome = signature.verify(&content, certificate);
            if outcome.valid {
                return SignatureCheck::Verified;
            }
            tracing::debug!(
                error = ?outcome.error,
                "content from S/MIME reader did not verify, retrying over the raw report part"
            );
            match verify_split(entity, certificate) {
                Ok(()) => SignatureCheck::Verified,
                Err(_) => SignatureCheck::Failed(outcome.error.unwrap_or_default()),
            }
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "S/MIME reader rejected MDN, splitting multipart/signed manually"
            );
            match verify_split(entity, certificate) {
                Ok(()) => SignatureCheck::Verified,
                Err(error) => SignatureCheck::Failed(error),
            }
        }
    }
}

fn verify_split(entity: &MimeEntity, certificate: &Certificate) -> Result<(), String> {
    let report = entity
        .parts()
        .first()
        .ok_or_else(|| MessageError::MissingSignedPart("report").to_string())?;
    let signature_part = entity
        .parts()
        .get(1)
        .ok_or_else(|| MessageError::MissingSignedPart("signature").to_string())?;

    let der = signature_part.decoded_body().map_err(|e| e.to_string())?;
    let signature = DetachedSignature::from_der(&der).map_err(|e| e.to_string())?;
    let content = canonicalize_line_endings(trim_leading_whitespace(report.raw()));
    let outcome = signature.verify(&content, certificate);
    if outcome.valid {
        Ok(())
    } else {
        Err(outcome.error.unwrap_or_default())
    }
}

fn extract_report(entity: &MimeEntity) -> Result<MdnReport, MessageError> {
    let leaves = entity.leaves();
    let notification = leaves
        .iter()
        .find(|part| part.mime_type() == "message/disposition-notification")
        .ok_or(MessageError::MissingDispositionNotification)?;
    let text = leaves
        .iter()
        .find(|part| part.mime_type() == "text/plain")
        .and_then(|part| part.decoded_body().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    Ok(MdnReport::parse_fields(&notification.decoded_body()?, text))
}
