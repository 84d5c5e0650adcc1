//! # Wire Formats
//!
//! AS2 stacks in the field disagree on the exact layout of a
//! `multipart/signed` container. Two layouts are supported:
//!
//! | Aspect | `V0` (legacy) | `V1` (standard) |
//! |---|---|---|
//! | Signature content-type | `application/x-pkcs7-signature` | `application/pkcs7-signature; smime-type=signed-data` |
//! | Preamble | S/MIME banner | none |
//! | Container line endings | `\n` | `\r\n` |
//! | Document base64 | strict | RFC 2045 wrapped |

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::encoding::Base64Scheme;
use crate::error::CoreError;
use crate::mime::LineEnding;

/// Signed-container layout sent to a partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Legacy layout produced by OpenSSL's S/MIME writer.
    #[default]
    V0,
    /// RFC 5751 aligned layout.
    V1,
}

impl WireFormat {
    /// The configuration name (`"v0"` / `"v1"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V0 => "v0",
            Self::V1 => "v1",
        }
    }

    /// Content-type of the detached signature part.
    pub fn signature_content_type(&self) -> &'static str {
        match self {
            Self::V0 => "application/x-pkcs7-signature",
            Self::V1 => "application/pkcs7-signature",
        }
    }

    /// Line ending used for the container's own header and boundary lines.
    pub fn line_ending(&self) -> LineEnding {
        match self {
            Self::V0 => LineEnding::Lf,
            Self::V1 => LineEnding::CrLf,
        }
    }

    /// Base64 layout for the document body when no override is configured.
    pub fn base64_scheme(&self) -> Base64Scheme {
        match self {
            Self::V0 => Base64Scheme::Rfc4648,
            Self::V1 => Base64Scheme::Rfc2045,
        }
    }

    /// Text placed before the first boundary, if any.
    pub fn preamble(&self) -> Option<&'static str> {
        match self {
            Self::V0 => Some("This is an S/MIME signed message"),
            Self::V1 => None,
        }
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v0" => Ok(Self::V0),
            "v1" => Ok(Self::V1),
            other => Err(CoreError::UnsupportedWireFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        assert_eq!("v0".parse::<WireFormat>().unwrap(), WireFormat::V0);
        assert_eq!("v1".parse::<WireFormat>().unwrap(), WireFormat::V1);
    }

    #[test]
    fn test_invalid_format_message() {
        let err = "invalid".parse::<WireFormat>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "outbound_format 'invalid' must be one of [\"v0\", \"v1\"]"
        );
    }

    #[test]
    fn test_layout_table() {
        assert_eq!(WireFormat::V0.line_ending(), LineEnding::Lf);
        assert_eq!(WireFormat::V1.line_ending(), LineEnding::CrLf);
        assert_eq!(WireFormat::V0.base64_scheme(), Base64Scheme::Rfc4648);
        assert_eq!(WireFormat::V1.base64_scheme(), Base64Scheme::Rfc2045);
        assert!(WireFormat::V0.signature_content_type().contains("x-pkcs7-signature"));
        assert!(WireFormat::V1.preamble().is_none());
    }

    #[test]
    fn test_default_is_legacy() {
        assert_eq!(WireFormat::default(), WireFormat::V0);
    }
}
