//! # Inbound Receiver
//!
//! Turns an inbound AS2 request into a signed MDN. Every failure along the
//! way is answered with a `failed` (or `processed/error`) MDN rather than
//! an error, so the partner always gets a receipt:
//!
//! 1. `AS2-To` must name this server.
//! 2. `AS2-From` must name a registered partner.
//! 3. The body must decrypt with the server's identity.
//! 4. The signature must verify against the partner's pinned certificate.
//! 5. A business attachment must be present.
//! 6. The caller's handler must accept the message.
//!
//! `Err` is returned only when the MDN itself cannot be signed.

use as2_core::{choose_mic_algorithm, digest, unquoted_system_identifier, HeaderMap, WireFormat};

use crate::config::{PartnerRegistry, ServerInfo};
use crate::decoder::{DecodeOptions, InboundMessage};
use crate::error::MessageError;
use crate::mdn::{DispositionStatus, MdnReport, MdnResponse, ReceivedMic};

/// Transport-neutral view of an inbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl InboundRequest {
    pub fn new(headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get_str(name)
    }
}

/// Receives messages on behalf of one local server.
#[derive(Debug, Clone)]
pub struct Receiver<'a> {
    server: &'a ServerInfo,
    partners: &'a PartnerRegistry,
    line_ending_recovery: bool,
}

impl<'a> Receiver<'a> {
    pub fn new(server: &'a ServerInfo, partners: &'a PartnerRegistry) -> Self {
        Self {
            server,
            partners,
            line_ending_recovery: true,
        }
    }

    /// Toggle CRLF-to-LF recovery for binary parts. On by default.
    pub fn line_ending_recovery(mut self, enabled: bool) -> Self {
        self.line_ending_recovery = enabled;
        self
    }

    /// Process `request` and build the MDN to return.
    ///
    /// `handler` sees the verified message and returns `Err(reason)` to
    /// reject it; the reason is reported to the partner.
    pub fn receive<F>(&self, request: &InboundRequest, handler: F) -> Result<MdnResponse, MessageError>
    where
        F: FnOnce(&InboundMessage) -> Result<(), String>,
    {
        let message_id = request.header("Message-ID").map(str::trim);
        let sender = unquoted_system_identifier(request.header("AS2-From").unwrap_or_default());
        let destination = unquoted_system_identifier(request.header("AS2-To").unwrap_or_default());

        if destination != self.server.name() {
            return self.reply(
                &sender,
                WireFormat::default(),
                message_id,
                DispositionStatus::Failed(format!("Invalid destination name {destination}")),
                None,
            );
        }
        let Some(partner) = self.partners.get(&sender) else {
            return self.reply(
                &sender,
                WireFormat::default(),
                message_id,
                DispositionStatus::Failed(format!("Invalid partner name {sender}")),
                None,
            );
        };
        let format = partner.mdn_format();

        let algorithm = choose_mic_algorithm(request.header("Disposition-Notification-Options"))
            .map(|code| digest::resolve(&code))
            .unwrap_or_else(|| partner.mic_algorithm());
        let options = DecodeOptions::default()
            .with_mic_algorithm(algorithm)
            .with_line_ending_recovery(self.line_ending_recovery);

        let mut message =
            match InboundMessage::decode(&request.body, self.server.decryption_identity(), options) {
                Ok(message) => message,
                Err(e) => {
                    return self.reply(
                        &sender,
                        format,
                        message_id,
                        DispositionStatus::Failed(e.to_string()),
                        None,
                    )
                }
            };

        let outcome = message.verify_signature(partner.signing_certificate());
        let mic = message
            .mic()
            .map(|mic| ReceivedMic::new(mic, algorithm.as_str()));
        if !outcome.valid {
            let reason = outcome.error.unwrap_or_default();
            return self.reply(
                &sender,
                format,
                message_id,
                DispositionStatus::Failed(format!("signature verification failed: {reason}")),
                mic,
            );
        }
        if message.attachment().is_none() {
            return self.reply(
                &sender,
                format,
                message_id,
                DispositionStatus::Failed(MessageError::MissingAttachment.to_string()),
                None,
            );
        }
        if let Err(reason) = handler(&message) {
            return self.reply(
                &sender,
                format,
                message_id,
                DispositionStatus::ProcessedWithError(reason),
                mic,
            );
        }

        tracing::info!(
            partner = %partner.name(),
            message_id = ?message_id,
            file_name = ?message.file_name(),
            line_endings_recovered = message.line_endings_recovered(),
            "accepted inbound message"
        );
        self.reply(&sender, format, message_id, DispositionStatus::Processed, mic)
    }

    fn reply(
        &self,
        partner_name: &str,
        format: WireFormat,
        message_id: Option<&str>,
        status: DispositionStatus,
        mic: Option<ReceivedMic>,
    ) -> Result<MdnResponse, MessageError> {
        if let Some(reason) = status.failure() {
            tracing::warn!(partner = %partner_name, message_id = ?message_id, reason, "rejecting inbound message");
        }
        let report = MdnReport::new(self.server.name(), message_id, &status, mic);
        MdnResponse::build(self.server, partner_name, report, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::HttpResponse;
    use crate::fixtures;
    use crate::outbound::OutboundRequest;
    use crate::payload::DocumentPayload;
    use as2_core::{compute_mic, DigestAlgorithm};

    fn registry() -> PartnerRegistry {
        let mut partners = PartnerRegistry::new();
        partners.register(fixtures::alice_partner()).unwrap();
        partners
    }

    fn send_from(server: &ServerInfo) -> (OutboundRequest, InboundRequest) {
        let outbound = OutboundRequest::prepare(
            server,
            &fixtures::bob_partner(),
            &DocumentPayload::new("data.txt", b"hello\n".to_vec()),
        )
        .unwrap();
        let inbound = InboundRequest::new(outbound.headers().clone(), outbound.body().to_vec());
        (outbound, inbound)
    }

    fn reply_to(response: &MdnResponse) -> HttpResponse {
        HttpResponse::new(200, response.headers().clone(), response.body().to_vec())
    }

    #[test]
    fn test_accepts_and_acknowledges() {
        let bob = fixtures::bob_server();
        let partners = registry();
        let (outbound, inbound) = send_from(&fixtures::alice_server());

        let mut received = None;
        let mdn = Receiver::new(&bob, &partners)
            .receive(&inbound, |message| {
                received = Some((message.file_name(), message.attachment_content().unwrap()));
                Ok(())
            })
            .unwrap();
        assert_eq!(
            received,
            Some((Some("data.txt".to_string()), b"hello\n".to_vec()))
        );

        let report = mdn.report();
        assert_eq!(report.reporting_ua, "BOB");
        assert_eq!(report.original_message_id.as_deref(), Some(outbound.message_id()));
        assert_eq!(
            report.received_content_mic,
            Some(ReceivedMic::new(
                compute_mic(outbound.document_payload(), DigestAlgorithm::Sha256),
                "sha256"
            ))
        );
        assert_eq!(mdn.headers().get_str("AS2-From"), Some("BOB"));
        assert_eq!(mdn.headers().get_str("AS2-To"), Some("ALICE"));

        let result = outbound.evaluate_response(reply_to(&mdn), &fixtures::bob_partner());
        assert!(result.success(), "{result:?}");
    }

    #[test]
    fn test_wrong_destination() {
        let alice = fixtures::alice_server();
        let partners = registry();
        let (_, inbound) = send_from(&fixtures::alice_server());

        let mdn = Receiver::new(&alice, &partners)
            .receive(&inbound, |_| panic!("handler must not run"))
            .unwrap();
        assert_eq!(mdn.report().failure.as_deref(), Some("Invalid destination name BOB"));
        assert!(mdn.report().disposition.ends_with("; failed"));
    }

    #[test]
    fn test_unknown_partner() {
        let bob = fixtures::bob_server();
        let partners = PartnerRegistry::new();
        let (outbound, inbound) = send_from(&fixtures::alice_server());

        let mdn = Receiver::new(&bob, &partners)
            .receive(&inbound, |_| panic!("handler must not run"))
            .unwrap();
        assert_eq!(mdn.report().failure.as_deref(), Some("Invalid partner name ALICE"));

        let result = outbound.evaluate_response(reply_to(&mdn), &fixtures::bob_partner());
        assert!(result.signature_verified());
        assert!(result.mid_matched());
        assert!(!result.success());
    }

    #[test]
    fn test_impostor_signature_is_rejected() {
        let impostor = ServerInfo::builder()
            .name("ALICE")
            .url("http://alice.example.com/as2")
            .domain("alice.example.com")
            .identity(fixtures::mallory())
            .build()
            .unwrap();
        let bob = fixtures::bob_server();
        let partners = registry();
        let (_, inbound) = send_from(&impostor);

        let mdn = Receiver::new(&bob, &partners)
            .receive(&inbound, |_| panic!("handler must not run"))
            .unwrap();
        assert_eq!(
            mdn.report().failure.as_deref(),
            Some("signature verification failed: signer certificate not found")
        );
        assert!(mdn.report().received_content_mic.is_some());
    }

    #[test]
    fn test_undecryptable_body() {
        let bob = fixtures::bob_server();
        let partners = registry();
        let (_, mut inbound) = send_from(&fixtures::alice_server());
        inbound.body = b"not an envelope".to_vec();

        let mdn = Receiver::new(&bob, &partners)
            .receive(&inbound, |_| panic!("handler must not run"))
            .unwrap();
        assert!(mdn.report().disposition.ends_with("; failed"));
        assert!(mdn.report().failure.is_some());
        assert!(mdn.report().received_content_mic.is_none());
    }

    #[test]
    fn test_handler_rejection() {
        let bob = fixtures::bob_server();
        let partners = registry();
        let (outbound, inbound) = send_from(&fixtures::alice_server());

        let mdn = Receiver::new(&bob, &partners)
            .receive(&inbound, |_| Err("duplicate document".to_string()))
            .unwrap();
        assert_eq!(
            mdn.report().disposition,
            "automatic-action/MDN-sent-automatically; processed/error: duplicate document"
        );

        let result = outbound.evaluate_response(reply_to(&mdn), &fixtures::bob_partner());
        assert_eq!(result.mic_matched(), Some(true));
        assert!(!result.success());
    }

    #[test]
    fn test_mic_algorithm_follows_request_options() {
        let bob = fixtures::bob_server();
        let partners = registry();
        let (outbound, mut inbound) = send_from(&fixtures::alice_server());
        inbound.headers.insert(
            "Disposition-Notification-Options",
            "signed-receipt-protocol=optional, pkcs7-signature; \
             signed-receipt-micalg=optional, sha1, sha256"
                .to_string(),
        );

        let mdn = Receiver::new(&bob, &partners)
            .receive(&inbound, |_| Ok(()))
            .unwrap();
        let mic = mdn.report().received_content_mic.clone().unwrap();
        assert_eq!(mic.algorithm.as_deref(), Some("sha1"));
        assert_eq!(
            mic.mic,
            compute_mic(outbound.document_payload(), DigestAlgorithm::Sha1)
        );
    }

    #[test]
    fn test_quoted_identifiers_are_accepted() {
        let bob = fixtures::bob_server();
        let partners = registry();
        let (_, mut inbound) = send_from(&fixtures::alice_server());
        inbound.headers.insert("AS2-From", "\"ALICE\"".to_string());
        inbound.headers.insert("AS2-To", "\"BOB\"".to_string());

        let mdn = Receiver::new(&bob, &partners)
            .receive(&inbound, |_| Ok(()))
            .unwrap();
        assert_eq!(mdn.report().failure, None);
        assert!(mdn.report().disposition.ends_with("; processed"));
    }
}
