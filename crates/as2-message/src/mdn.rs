//! # MDN Builder
//!
//! Builds signed `multipart/report` receipts:
//!
//! ```text
//! multipart/signed
//! ├── multipart/report; report-type=disposition-notification
//! │   ├── text/plain                          human-readable outcome
//! │   └── message/disposition-notification    machine-readable fields
//! └── detached signature (v0 or v1 layout)
//! ```
//!
//! Reception failures are reported inside the MDN (`Disposition: ...;
//! failed` plus a `Failure` field). Building only fails when the signing
//! identity is unusable.

use as2_core::{
    canonicalize_line_endings, generate_message_id, parse_header_fields, quoted_system_identifier,
    HeaderMap, LineEnding, MimePart, WireFormat,
};
use as2_crypto::{DetachedSignature, Identity};

use crate::config::ServerInfo;
use crate::error::MessageError;
use crate::signed::{layout_for, SignedContainer};

/// Disposition mode shared by every MDN this crate sends.
pub const DISPOSITION_MODE: &str = "automatic-action/MDN-sent-automatically";

/// Body of the text part of a successful MDN.
pub const SUCCESS_TEXT: &str = "The AS2 message has been received successfully";

/// Prefix of the text part of a failed MDN.
pub const FAILURE_TEXT: &str = "There was an error with the AS2 transmission.";

/// Outcome reported by an MDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionStatus {
    Processed,
    /// Processed, with a `processed/Warning: ...` qualifier.
    ProcessedWithWarning(String),
    /// Processed, with a `processed/error: ...` qualifier.
    ProcessedWithError(String),
    /// Rejected; the text goes into the `Failure` field.
    Failed(String),
}

impl DispositionStatus {
    /// The full `Disposition` field value.
    pub fn disposition(&self) -> String {
        match self {
            Self::Processed => format!("{DISPOSITION_MODE}; processed"),
            Self::ProcessedWithWarning(reason) => {
                format!("{DISPOSITION_MODE}; processed/Warning: {reason}")
            }
            Self::ProcessedWithError(reason) => {
                format!("{DISPOSITION_MODE}; processed/error: {reason}")
            }
            Self::Failed(_) => format!("{DISPOSITION_MODE}; failed"),
        }
    }

    /// Text for the `Failure` field.
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Human-readable body of the text part.
    pub fn text(&self) -> String {
        match self {
            Self::Processed | Self::ProcessedWithWarning(_) => SUCCESS_TEXT.to_string(),
            Self::ProcessedWithError(reason) | Self::Failed(reason) => {
                format!("{FAILURE_TEXT}\n\n{reason}")
            }
        }
    }
}

/// A `Received-Content-MIC` value: `<mic>, <algorithm>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMic {
    pub mic: String,
    /// Algorithm code as it should appear on the wire; `None` when a
    /// received field omitted it.
    pub algorithm: Option<String>,
}

impl ReceivedMic {
    pub fn new(mic: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Self {
            mic: mic.into(),
            algorithm: Some(algorithm.into()),
        }
    }

    /// Split a field value on its first comma.
    pub fn parse(value: &str) -> Self {
        match value.split_once(',') {
            Some((mic, algorithm)) => Self {
                mic: mic.trim().to_string(),
                algorithm: Some(algorithm.trim().to_string()).filter(|a| !a.is_empty()),
            },
            None => Self {
                mic: value.trim().to_string(),
                algorithm: None,
            },
        }
    }
}

impl std::fmt::Display for ReceivedMic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.algorithm {
            Some(algorithm) => write!(f, "{}, {algorithm}", self.mic),
            None => f.write_str(&self.mic),
        }
    }
}

/// Contents of an MDN report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdnReport {
    pub reporting_ua: String,
    pub original_recipient: String,
    pub final_recipient: String,
    pub original_message_id: Option<String>,
    pub disposition: String,
    pub failure: Option<String>,
    pub received_content_mic: Option<ReceivedMic>,
    /// Body of the `text/plain` part.
    pub text: String,
}

impl MdnReport {
    /// A report from `reporter` about the message `original_message_id`.
    pub fn new(
        reporter: &str,
        original_message_id: Option<&str>,
        status: &DispositionStatus,
        received_content_mic: Option<ReceivedMic>,
    ) -> Self {
        let recipient = format!("rfc822; {reporter}");
        Self {
            reporting_ua: reporter.to_string(),
            original_recipient: recipient.clone(),
            final_recipient: recipient,
            original_message_id: original_message_id.map(str::to_string),
            disposition: unfold(&status.disposition()),
            failure: status.failure().map(unfold),
            received_content_mic,
            text: status.text(),
        }
    }

    /// The `message/disposition-notification` fields, in wire order.
    pub fn to_fields(&self) -> HeaderMap {
        let mut fields = HeaderMap::new();
        fields.append("Reporting-UA", self.reporting_ua.clone());
        fields.append("Original-Recipient", self.original_recipient.clone());
        fields.append("Final-Recipient", self.final_recipient.clone());
        if let Some(id) = &self.original_message_id {
            fields.append("Original-Message-ID", id.clone());
        }
        fields.append("Disposition", unfold(&self.disposition));
        if let Some(failure) = &self.failure {
            fields.append("Failure", unfold(failure));
        }
        if let Some(mic) = &self.received_content_mic {
            fields.append("Received-Content-MIC", mic.to_string());
        }
        fields
    }

    /// Read a report back from its fields. Field names match
    /// case-insensitively; absent fields become empty.
    pub fn from_fields(fields: &HeaderMap, text: impl Into<String>) -> Self {
        let get = |name: &str| fields.get_str(name).map(str::to_string);
        Self {
            reporting_ua: get("Reporting-UA").unwrap_or_default(),
            original_recipient: get("Original-Recipient").unwrap_or_default(),
            final_recipient: get("Final-Recipient").unwrap_or_default(),
            original_message_id: get("Original-Message-ID"),
            disposition: get("Disposition").unwrap_or_default(),
            failure: get("Failure"),
            received_content_mic: fields.get_str("Received-Content-MIC").map(ReceivedMic::parse),
            text: text.into(),
        }
    }

    /// Parse the body of a `message/disposition-notification` part.
    pub fn parse_fields(body: &[u8], text: impl Into<String>) -> Self {
        Self::from_fields(&parse_header_fields(body), text)
    }

    /// The unsigned `multipart/report` entity, CRLF throughout.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MessageError> {
        let field_block = self
            .to_fields()
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\r\n");

        let text = MimePart::new("text/plain")
            .with_header("Content-Transfer-Encoding", "7bit")?
            .with_body(self.text.as_bytes())?;
        let notification = MimePart::new("message/disposition-notification")
            .with_header("Content-Transfer-Encoding", "7bit")?
            .with_body(field_block.into_bytes())?;

        let mut report = MimePart::multipart("multipart/report; report-type=disposition-notification");
        report.add_part(text)?;
        report.add_part(notification)?;
        Ok(canonicalize_line_endings(&report.to_bytes(LineEnding::CrLf)))
    }
}

/// Collapse line breaks in a field value to single spaces. A raw break
/// would end the field block early and drop every later field.
fn unfold(value: &str) -> String {
    if !value.contains(['\r', '\n']) {
        return value.to_string();
    }
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Signs reports into `multipart/signed` containers.
#[derive(Debug, Clone)]
pub struct MdnBuilder<'a> {
    signer: &'a Identity,
    format: WireFormat,
}

impl<'a> MdnBuilder<'a> {
    pub fn new(signer: &'a Identity) -> Self {
        Self {
            signer,
            format: WireFormat::default(),
        }
    }

    pub fn format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    pub fn build(&self, report: &MdnReport) -> Result<SignedContainer, MessageError> {
        let report_bytes = report.to_bytes()?;
        let signature = DetachedSignature::sign(self.signer, &report_bytes)?;
        let container = layout_for(self.format).wrap(&report_bytes, &signature)?;
        tracing::debug!(
            disposition = %report.disposition,
            original_message_id = ?report.original_message_id,
            format = %self.format,
            "built MDN"
        );
        Ok(container)
    }
}

/// An MDN ready to be returned as an HTTP response.
#[derive(Debug, Clone)]
pub struct MdnResponse {
    headers: HeaderMap,
    body: Vec<u8>,
    report: MdnReport,
}

impl MdnResponse {
    /// Sign `report` as `server` and address it back to `partner_name`.
    pub fn build(
        server: &ServerInfo,
        partner_name: &str,
        report: MdnReport,
        format: WireFormat,
    ) -> Result<Self, MessageError> {
        let container = MdnBuilder::new(server.signing_identity())
            .format(format)
            .build(&report)?;

        let mut headers = HeaderMap::new();
        headers.append("Content-Type", container.content_type().to_string());
        headers.append("MIME-Version", "1.0".to_string());
        headers.append(
            "Message-ID",
            generate_message_id(server.name(), server.domain()),
        );
        headers.append("AS2-From", quoted_system_identifier(server.name()));
        headers.append("AS2-To", quoted_system_identifier(partner_name));
        headers.append("AS2-Version", "1.0".to_string());
        headers.append("Connection", "close".to_string());

        Ok(Self {
            headers,
            body: container.body().to_vec(),
            report,
        })
    }

    /// HTTP response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// HTTP response body: the signed container without its header block.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn report(&self) -> &MdnReport {
        &self.report
    }

    pub fn into_parts(self) -> (HeaderMap, Vec<u8>) {
        (self.headers, self.body)
    }
}
