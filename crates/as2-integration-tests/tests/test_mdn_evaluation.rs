//! # MDN Evaluation Against Partner Quirks
//!
//! Receipts as partners actually send them: unsigned, with lowercase field
//! names, with a binary signature part, with every disposition flavour.

use as2_core::{compute_mic, DigestAlgorithm, HeaderMap, LineEnding, MimeEntity, MimePart, WireFormat};
use as2_crypto::{DetachedSignature, Identity};
use as2_message::{
    evaluate_mdn, DispositionStatus, HttpResponse, MdnReport, MdnResponse, ReceivedMic,
    SentMessage, ServerInfo, SignatureCheck,
};

const MESSAGE_ID: &str = "<ALICE-20240101-120000-42@alice.example.com>";
const DOCUMENT: &[u8] =
    b"Content-Type: application/EDI-Consent\r\nContent-Transfer-Encoding: base64\r\n\r\naGVsbG8K\r\n";

fn bob() -> Identity {
    Identity::from_pem(
        include_bytes!("../../../fixtures/bob.crt"),
        include_bytes!("../../../fixtures/bob.key"),
    )
    .unwrap()
}

fn mallory() -> Identity {
    Identity::from_pem(
        include_bytes!("../../../fixtures/mallory.crt"),
        include_bytes!("../../../fixtures/mallory.key"),
    )
    .unwrap()
}

fn station(name: &str, identity: Identity) -> ServerInfo {
    ServerInfo::builder()
        .name(name)
        .url("http://bob.example.com/as2")
        .domain("bob.example.com")
        .identity(identity)
        .build()
        .unwrap()
}

fn sent() -> SentMessage<'static> {
    SentMessage {
        message_id: MESSAGE_ID,
        document_payload: DOCUMENT,
        mic_algorithm: DigestAlgorithm::Sha256,
    }
}

fn good_mic() -> ReceivedMic {
    ReceivedMic::new(compute_mic(DOCUMENT, DigestAlgorithm::Sha256), "sha256")
}

fn signed_mdn(signer: Identity, status: DispositionStatus, format: WireFormat) -> HttpResponse {
    let report = MdnReport::new("BOB", Some(MESSAGE_ID), &status, Some(good_mic()));
    let (headers, body) = MdnResponse::build(&station("BOB", signer), "ALICE", report, format)
        .unwrap()
        .into_parts();
    HttpResponse::new(200, headers, body)
}

/// Split a serialized entity into an HTTP response.
fn as_response(entity_bytes: &[u8]) -> HttpResponse {
    let entity = MimeEntity::parse(entity_bytes);
    let mut headers = HeaderMap::new();
    headers.append("Content-Type", entity.header("Content-Type").unwrap().to_string());
    HttpResponse::new(200, headers, entity.body().to_vec())
}

#[test]
fn disposition_flavours() {
    let cases = [
        (DispositionStatus::Processed, true),
        (DispositionStatus::ProcessedWithWarning("duplicate-document".into()), true),
        (DispositionStatus::ProcessedWithError("unexpected-processing-error".into()), false),
        (DispositionStatus::Failed("authentication-failed".into()), false),
    ];
    for format in [WireFormat::V0, WireFormat::V1] {
        for (status, success) in &cases {
            let result = evaluate_mdn(signed_mdn(bob(), status.clone(), format), bob().certificate(), &sent());
            assert!(result.signature_verified(), "{format} {status:?}");
            assert_eq!(result.success(), *success, "{format} {status:?}");
        }
    }
}

#[test]
fn receipt_signed_by_impostor_is_not_success() {
    let result = evaluate_mdn(
        signed_mdn(mallory(), DispositionStatus::Processed, WireFormat::V1),
        bob().certificate(),
        &sent(),
    );
    assert_eq!(
        result.signature_check(),
        &SignatureCheck::Failed("signer certificate not found".to_string())
    );
    assert!(result.mid_matched());
    assert_eq!(result.mic_matched(), Some(true));
    assert!(!result.success());
}

#[test]
fn unsigned_receipt_with_lowercase_fields() {
    let fields = format!(
        "reporting-ua: BOB\r\noriginal-message-id: {MESSAGE_ID}\r\n\
         disposition: automatic-action/MDN-sent-automatically; processed\r\n\
         received-content-mic: {}",
        good_mic()
    );
    let mut report = MimePart::multipart("multipart/report; report-type=disposition-notification");
    report
        .add_part(MimePart::new("text/plain").with_body("ok").unwrap())
        .unwrap();
    report
        .add_part(
            MimePart::new("message/disposition-notification")
                .with_body(fields)
                .unwrap(),
        )
        .unwrap();

    let result = evaluate_mdn(
        as_response(&report.to_bytes(LineEnding::CrLf)),
        bob().certificate(),
        &sent(),
    );
    assert_eq!(result.signature_check(), &SignatureCheck::NotChecked);
    assert!(result.signature_verification_error().is_some());
    assert!(result.mid_matched());
    assert_eq!(result.mic_matched(), Some(true));
    assert_eq!(result.body(), Some("ok"));
    assert!(!result.success(), "unsigned receipts never count as success");
}

#[test]
fn binary_signature_part_is_verified_by_manual_split() {
    let bob = bob();
    let report = MdnReport::new(
        "BOB",
        Some(MESSAGE_ID),
        &DispositionStatus::Processed,
        Some(good_mic()),
    )
    .to_bytes()
    .unwrap();
    let signature = DetachedSignature::sign(&bob, &report).unwrap();

    let mut container = MimePart::multipart(
        "multipart/signed; protocol=\"application/pkcs7-signature\"; micalg=sha-256",
    );
    container.add_part(MimePart::verbatim(report)).unwrap();
    container
        .add_part(
            MimePart::new("application/pkcs7-signature")
                .with_header("Content-Transfer-Encoding", "binary")
                .unwrap()
                .with_body(signature.to_der().unwrap())
                .unwrap(),
        )
        .unwrap();

    let result = evaluate_mdn(
        as_response(&container.to_bytes(LineEnding::CrLf)),
        bob.certificate(),
        &sent(),
    );
    assert!(result.signature_verified(), "{:?}", result.signature_check());
    assert!(result.success());
}

#[test]
fn transport_failures_are_captured() {
    let result = evaluate_mdn(
        HttpResponse::new(502, HeaderMap::new(), Vec::new()),
        bob().certificate(),
        &sent(),
    );
    assert_eq!(result.exception(), Some("unexpected HTTP status 502"));
    assert!(!result.success());

    let result = evaluate_mdn(
        HttpResponse::new(200, HeaderMap::new(), b"no headers".to_vec()),
        bob().certificate(),
        &sent(),
    );
    assert_eq!(result.exception(), Some("MDN response has no Content-Type"));
}
