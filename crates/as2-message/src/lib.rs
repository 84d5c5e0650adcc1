//! # as2-message: AS2 Envelopes and Receipts
//!
//! Message-level AS2 (RFC 4130) built on `as2-core` and `as2-crypto`:
//!
//! - **Configuration.** `ServerInfo` for the local station, `Partner` for
//!   each trading partner, `PartnerRegistry` for lookup, `As2Config` for
//!   YAML files.
//! - **Outbound.** `EnvelopeBuilder` signs, wraps and encrypts a
//!   `DocumentPayload` in the partner's wire format (`v0` legacy or `v1`
//!   standard). `OutboundRequest` adds the AS2 HTTP headers and keeps what
//!   is needed to judge the receipt.
//! - **Inbound.** `InboundMessage` decrypts, parses, selects the business
//!   attachment and verifies the signature against a pinned certificate.
//!   `Receiver` wraps that into a request-to-MDN flow.
//! - **Receipts.** `MdnReport`, `MdnBuilder` and `MdnResponse` produce signed
//!   MDNs; `evaluate_mdn` reads them back into a `TransmissionResult`.
//!
//! HTTP transport is out of scope. Requests and responses are exchanged as
//! header maps and byte bodies.
//!
//! ## Security Invariant
//!
//! Signatures are only ever checked against the configured partner
//! certificate. A transmission counts as successful only when the MDN
//! signature verified, the MIC and Message-ID match what was sent, and the
//! disposition is `processed` without an error qualifier.

pub mod config;
pub mod decoder;
pub mod envelope;
pub mod error;
pub mod evaluator;
pub mod mdn;
pub mod outbound;
pub mod payload;
pub mod receiver;
pub mod signed;

#[cfg(test)]
mod fixtures;

pub use config::{As2Config, Partner, PartnerRegistry, ServerInfo, TlsVerifyMode};
pub use decoder::{DecodeOptions, InboundMessage};
pub use envelope::{build_envelope, BuiltEnvelope, EnvelopeBuilder};
pub use error::{ConfigError, MessageError};
pub use evaluator::{evaluate_mdn, HttpResponse, SentMessage, SignatureCheck, TransmissionResult};
pub use mdn::{DispositionStatus, MdnBuilder, MdnReport, MdnResponse, ReceivedMic};
pub use outbound::OutboundRequest;
pub use payload::{DocumentPayload, TransferEncoding};
pub use receiver::{InboundRequest, Receiver};
pub use signed::{layout_for, LegacyLayout, SignedContainer, SignedLayout, StandardLayout};
