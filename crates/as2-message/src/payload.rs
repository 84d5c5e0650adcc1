//! Business document wrapped as the first part of a signed container.

use as2_core::{base64_encode, quoted_system_identifier, Base64Scheme, LineEnding, MimePart};

use crate::error::MessageError;

/// Content type used when the caller does not supply one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/EDI-Consent";

/// `Content-Transfer-Encoding` of a document part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferEncoding {
    #[default]
    Base64,
    Binary,
}

impl TransferEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Binary => "binary",
        }
    }
}

/// A document ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPayload {
    content_type: String,
    transfer_encoding: TransferEncoding,
    file_name: String,
    content: Vec<u8>,
}

impl DocumentPayload {
    /// A base64-encoded document with the default content type.
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            transfer_encoding: TransferEncoding::Base64,
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_transfer_encoding(mut self, encoding: TransferEncoding) -> Self {
        self.transfer_encoding = encoding;
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.transfer_encoding
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Serialize the document part with CRLF header lines.
    ///
    /// Base64 bodies end with a CRLF; binary bodies are written untouched.
    pub fn to_bytes(&self, scheme: Base64Scheme) -> Result<Vec<u8>, MessageError> {
        let body = match self.transfer_encoding {
            TransferEncoding::Base64 => {
                let mut encoded = base64_encode(&self.content, scheme).into_bytes();
                encoded.extend_from_slice(LineEnding::CrLf.as_bytes());
                encoded
            }
            TransferEncoding::Binary => self.content.clone(),
        };
        let part = MimePart::new(&self.content_type)
            .with_header("Content-Transfer-Encoding", self.transfer_encoding.as_str())?
            .with_header(
                "Content-Disposition",
                format!(
                    "attachment; filename={}",
                    quoted_system_identifier(&self.file_name)
                ),
            )?
            .with_body(body)?;
        Ok(part.to_bytes(LineEnding::CrLf))
    }
}
