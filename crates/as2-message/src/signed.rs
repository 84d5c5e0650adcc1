//! # Signed Containers
//!
//! Wraps already-serialized content and its detached signature into a
//! `multipart/signed` entity. The two wire formats share the signing step
//! and differ only in how the container is laid out, so the layout is a
//! trait with one implementation per [`WireFormat`]:
//!
//! - [`LegacyLayout`] (`v0`): `application/x-pkcs7-signature`, the S/MIME
//!   banner as preamble, bare `\n` on container lines, strict base64.
//! - [`StandardLayout`] (`v1`): `application/pkcs7-signature` with
//!   `smime-type=signed-data`, no preamble, CRLF, RFC 2045 base64.
//!
//! The signed content is embedded verbatim. Its bytes are exactly the bytes
//! that were signed and that the receiver will hash for the MIC.

use as2_core::{base64_encode, Base64Scheme, LineEnding, MimeEntity, MimePart, WireFormat};
use as2_crypto::DetachedSignature;

use crate::error::MessageError;

/// File name advertised for the signature part.
const SIGNATURE_FILE_NAME: &str = "smime.p7s";

/// Layout rules for a `multipart/signed` container.
pub trait SignedLayout {
    /// The format this layout renders.
    fn format(&self) -> WireFormat;

    /// `Content-Type` of the signature part, including parameters.
    fn signature_content_type(&self) -> String;

    /// Base64 layout of the signature blob.
    fn signature_scheme(&self) -> Base64Scheme;

    /// Line ending of container header and boundary lines.
    fn line_ending(&self) -> LineEnding;

    /// Text before the first boundary.
    fn preamble(&self) -> Option<&'static str> {
        None
    }

    /// Build the container around `content` and its `signature`.
    fn wrap(
        &self,
        content: &[u8],
        signature: &DetachedSignature,
    ) -> Result<SignedContainer, MessageError> {
        let micalg = signature.micalg()?;
        let format = self.format();
        let mut container = MimePart::multipart(&format!(
            "multipart/signed; protocol=\"{}\"; micalg={micalg}",
            format.signature_content_type()
        ));
        container.set_header("MIME-Version", "1.0")?;
        if let Some(text) = self.preamble() {
            container.set_preamble(text)?;
        }
        container.add_part(MimePart::verbatim(content))?;
        container.add_part(self.signature_part(signature)?)?;

        let content_type = container
            .headers()
            .get_str("Content-Type")
            .unwrap_or_default()
            .to_string();
        let bytes = container.to_bytes(self.line_ending());
        let header_len = MimeEntity::parse(&bytes).header_block().len();
        tracing::debug!(
            format = %format,
            micalg = %micalg,
            len = bytes.len(),
            "wrapped signed container"
        );
        Ok(SignedContainer {
            format,
            content_type,
            micalg,
            bytes,
            header_len,
        })
    }

    /// The base64 signature part.
    fn signature_part(&self, signature: &DetachedSignature) -> Result<MimePart, MessageError> {
        let der = signature.to_der()?;
        let part = MimePart::new(&self.signature_content_type())
            .with_header("Content-Transfer-Encoding", "base64")?
            .with_header(
                "Content-Disposition",
                format!("attachment; filename=\"{SIGNATURE_FILE_NAME}\""),
            )?
            .with_body(base64_encode(&der, self.signature_scheme()))?;
        Ok(part)
    }
}

/// `v0` container layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyLayout;

/// `v1` container layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLayout;

impl SignedLayout for LegacyLayout {
    fn format(&self) -> WireFormat {
        WireFormat::V0
    }

    fn signature_content_type(&self) -> String {
        format!(
            "{}; name=\"{SIGNATURE_FILE_NAME}\"",
            WireFormat::V0.signature_content_type()
        )
    }

    fn signature_scheme(&self) -> Base64Scheme {
        WireFormat::V0.base64_scheme()
    }

    fn line_ending(&self) -> LineEnding {
        WireFormat::V0.line_ending()
    }

    fn preamble(&self) -> Option<&'static str> {
        WireFormat::V0.preamble()
    }
}

impl SignedLayout for StandardLayout {
    fn format(&self) -> WireFormat {
        WireFormat::V1
    }

    fn signature_content_type(&self) -> String {
        format!(
            "{}; name={SIGNATURE_FILE_NAME}; smime-type=signed-data",
            WireFormat::V1.signature_content_type()
        )
    }

    fn signature_scheme(&self) -> Base64Scheme {
        WireFormat::V1.base64_scheme()
    }

    fn line_ending(&self) -> LineEnding {
        WireFormat::V1.line_ending()
    }
}

/// The layout for `format`.
pub fn layout_for(format: WireFormat) -> &'static dyn SignedLayout {
    match format {
        WireFormat::V0 => &LegacyLayout,
        WireFormat::V1 => &StandardLayout,
    }
}

/// A serialized `multipart/signed` entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedContainer {
    format: WireFormat,
    content_type: String,
    micalg: String,
    bytes: Vec<u8>,
    header_len: usize,
}

impl SignedContainer {
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// The container's `Content-Type` value, boundary included.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// `micalg` parameter, e.g. `sha-256`.
    pub fn micalg(&self) -> &str {
        &self.micalg
    }

    /// The full entity: headers, separator and body.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The entity without its own header block, as sent in an HTTP body
    /// whose headers carry the `Content-Type`.
    pub fn body(&self) -> &[u8] {
        &self.bytes[self.header_len..]
    }
}
