//! Outbound AS2 requests: the encrypted envelope plus the HTTP headers a
//! partner expects alongside it. Transport is left to the caller.

use as2_core::{generate_message_id, quoted_system_identifier, DigestAlgorithm, HeaderMap};

use crate::config::{Partner, ServerInfo};
use crate::envelope::EnvelopeBuilder;
use crate::error::MessageError;
use crate::evaluator::{evaluate_mdn, HttpResponse, SentMessage, TransmissionResult};
use crate::payload::DocumentPayload;

const SUBJECT: &str = "AS2 EDI Transaction";
const ENVELOPE_CONTENT_TYPE: &str =
    "application/pkcs7-mime; smime-type=enveloped-data; name=smime.p7m";

/// A ready-to-send AS2 request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    headers: HeaderMap,
    body: Vec<u8>,
    document_payload: Vec<u8>,
    message_id: String,
    mic_algorithm: DigestAlgorithm,
}

impl OutboundRequest {
    /// Build the envelope for `partner` and the matching request headers.
    pub fn prepare(
        server: &ServerInfo,
        partner: &Partner,
        payload: &DocumentPayload,
    ) -> Result<Self, MessageError> {
        let built = EnvelopeBuilder::for_partner(server, partner).build(payload)?;
        let message_id = generate_message_id(server.name(), server.domain());
        let mic_algorithm = partner.mic_algorithm();

        let mut headers = HeaderMap::new();
        headers.append("AS2-Version", "1.0".to_string());
        headers.append("AS2-From", quoted_system_identifier(server.name()));
        headers.append("AS2-To", quoted_system_identifier(partner.name()));
        headers.append("Subject", SUBJECT.to_string());
        headers.append("Content-Type", ENVELOPE_CONTENT_TYPE.to_string());
        headers.append(
            "Content-Disposition",
            "attachment; filename=\"smime.p7m\"".to_string(),
        );
        headers.append("Content-Transfer-Encoding", "binary".to_string());
        headers.append("Disposition-Notification-To", server.url().to_string());
        headers.append(
            "Disposition-Notification-Options",
            format!(
                "signed-receipt-protocol=optional, pkcs7-signature; \
                 signed-receipt-micalg=optional, {}",
                mic_algorithm.as_str()
            ),
        );
        headers.append("Recipient-Address", partner.url().to_string());
        headers.append("Message-ID", message_id.clone());
        headers.append("MIME-Version", "1.0".to_string());

        tracing::info!(
            message_id = %message_id,
            partner = %partner.name(),
            file_name = %payload.file_name(),
            "prepared outbound AS2 request"
        );
        let (document_payload, body) = built.into_parts();
        Ok(Self {
            headers,
            body,
            document_payload,
            message_id,
            mic_algorithm,
        })
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The DER enveloped data to POST.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The document exactly as signed.
    pub fn document_payload(&self) -> &[u8] {
        &self.document_payload
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn mic_algorithm(&self) -> DigestAlgorithm {
        self.mic_algorithm
    }

    /// What the MDN evaluator needs to know about this request.
    pub fn sent_message(&self) -> SentMessage<'_> {
        SentMessage {
            message_id: &self.message_id,
            document_payload: &self.document_payload,
            mic_algorithm: self.mic_algorithm,
        }
    }

    /// Evaluate the partner's synchronous MDN for this request.
    pub fn evaluate_response(&self, response: HttpResponse, partner: &Partner) -> TransmissionResult {
        let result = evaluate_mdn(response, partner.signing_certificate(), &self.sent_message());
        if result.success() {
            tracing::info!(message_id = %self.message_id, "transmission acknowledged");
        } else {
            tracing::warn!(
                message_id = %self.message_id,
                disposition = ?result.disposition(),
                exception = ?result.exception(),
                "transmission not acknowledged"
            );
        }
        result
    }
}
