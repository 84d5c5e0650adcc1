//! # MIME Entities
//!
//! Two views of a MIME entity:
//!
//! - [`MimePart`] is the build-side model. Headers are set, then either a
//!   body or child parts, and the tree is serialized once with a chosen
//!   line ending. A finished entity can be embedded byte-for-byte with
//!   [`MimePart::verbatim`], which is how signed content is placed in a
//!   `multipart/signed` container without being re-serialized.
//! - [`MimeEntity`] is the receive-side model. Parsing keeps the exact raw
//!   bytes of every entity and part. A part's raw bytes run from the line
//!   after its delimiter up to, but not including, the line break that
//!   precedes the next delimiter (RFC 2046 §5.1.1).
//!
//! ## Security Invariant
//!
//! Signature verification and MIC computation must read
//! [`MimeEntity::raw`]. Nothing on the receive path re-serializes a parsed
//! entity.
//!
//! Parsing is lenient. LF and CRLF line endings are both accepted, folded
//! headers are unfolded, and a missing or unmatched boundary produces an
//! entity without parts instead of an error.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::encoding::base64_decode;
use crate::error::MimeError;
use crate::header::{parse_body, HeaderMap, StructuredHeader};

/// Nesting beyond this depth is treated as an opaque body.
const MAX_NESTING_DEPTH: usize = 16;

static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a multipart boundary.
///
/// Combines a process-wide atomic sequence number, a random nonce and the
/// current time, so boundaries are unique across concurrent builds.
pub fn generate_boundary() -> String {
    let sequence = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nonce: u32 = rand::random();
    format!(
        "----=_Part_{sequence}_{nonce:08x}.{}",
        Utc::now().timestamp_millis()
    )
}

/// Line terminator used when serializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineEnding {
    /// Bare `\n`.
    Lf,
    /// Canonical `\r\n`.
    CrLf,
}

impl LineEnding {
    /// The terminator bytes.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
        }
    }
}

// ---------------------------------------------------------------------------
// Build side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Body(Vec<u8>),
    Multipart {
        boundary: String,
        preamble: Option<String>,
        parts: Vec<MimePart>,
    },
    Verbatim(Vec<u8>),
}

/// A MIME entity under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    headers: HeaderMap,
    content: Content,
}

impl MimePart {
    /// A single-part entity with the given `Content-Type` and an empty body.
    pub fn new(content_type: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", content_type.to_string());
        Self {
            headers,
            content: Content::Body(Vec::new()),
        }
    }

    /// A multipart entity. A fresh boundary is generated and appended to
    /// the `Content-Type` header.
    pub fn multipart(content_type: &str) -> Self {
        let boundary = generate_boundary();
        let mut headers = HeaderMap::new();
        headers.insert(
            "Content-Type",
            format!("{content_type}; boundary=\"{boundary}\""),
        );
        Self {
            headers,
            content: Content::Multipart {
                boundary,
                preamble: None,
                parts: Vec::new(),
            },
        }
    }

    /// An already-serialized entity, emitted byte-for-byte.
    pub fn verbatim(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            headers: HeaderMap::new(),
            content: Content::Verbatim(bytes.into()),
        }
    }

    /// Set a header, replacing any existing value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> Result<(), MimeError> {
        if matches!(self.content, Content::Verbatim(_)) {
            return Err(MimeError::Verbatim);
        }
        self.headers.insert(name, value.into());
        Ok(())
    }

    /// Builder form of [`set_header`](Self::set_header).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Result<Self, MimeError> {
        self.set_header(name, value)?;
        Ok(self)
    }

    /// Replace the body of a single-part entity.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> Result<(), MimeError> {
        match &mut self.content {
            Content::Body(existing) => {
                *existing = body.into();
                Ok(())
            }
            Content::Multipart { .. } => Err(MimeError::BodyOnMultipart),
            Content::Verbatim(_) => Err(MimeError::Verbatim),
        }
    }

    /// Builder form of [`set_body`](Self::set_body).
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Result<Self, MimeError> {
        self.set_body(body)?;
        Ok(self)
    }

    /// Append a child part to a multipart entity.
    pub fn add_part(&mut self, part: MimePart) -> Result<(), MimeError> {
        match &mut self.content {
            Content::Multipart { parts, .. } => {
                parts.push(part);
                Ok(())
            }
            _ => Err(MimeError::NotMultipart),
        }
    }

    /// Set text written before the first boundary.
    pub fn set_preamble(&mut self, text: impl Into<String>) -> Result<(), MimeError> {
        match &mut self.content {
            Content::Multipart { preamble, .. } => {
                *preamble = Some(text.into());
                Ok(())
            }
            _ => Err(MimeError::NotMultipart),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.content, Content::Multipart { .. })
    }

    pub fn boundary(&self) -> Option<&str> {
        match &self.content {
            Content::Multipart { boundary, .. } => Some(boundary),
            _ => None,
        }
    }

    /// Child parts of a multipart entity; empty otherwise.
    pub fn parts(&self) -> &[MimePart] {
        match &self.content {
            Content::Multipart { parts, .. } => parts,
            _ => &[],
        }
    }

    /// Serialize the entity.
    ///
    /// `line_ending` applies to header lines, the header/body separator and
    /// boundary lines. Body and verbatim bytes are written untouched.
    pub fn to_bytes(&self, line_ending: LineEnding) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out, line_ending.as_bytes());
        out
    }

    fn write_to(&self, out: &mut Vec<u8>, eol: &[u8]) {
        if let Content::Verbatim(bytes) = &self.content {
            out.extend_from_slice(bytes);
            return;
        }

        for (name, value) in self.headers.iter() {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(eol);
        }
        out.extend_from_slice(eol);

        match &self.content {
            Content::Body(body) => out.extend_from_slice(body),
            Content::Multipart {
                boundary,
                preamble,
                parts,
            } => {
                if let Some(text) = preamble {
                    out.extend_from_slice(text.as_bytes());
                    out.extend_from_slice(eol);
                    out.extend_from_slice(eol);
                }
                for part in parts {
                    out.extend_from_slice(b"--");
                    out.extend_from_slice(boundary.as_bytes());
                    out.extend_from_slice(eol);
                    part.write_to(out, eol);
                    out.extend_from_slice(eol);
                }
                out.extend_from_slice(b"--");
                out.extend_from_slice(boundary.as_bytes());
                out.extend_from_slice(b"--");
                out.extend_from_slice(eol);
            }
            Content::Verbatim(_) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Receive side
// ---------------------------------------------------------------------------

/// A parsed MIME entity that keeps its exact raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeEntity {
    raw: Vec<u8>,
    body_offset: usize,
    headers: HeaderMap,
    parts: Vec<MimeEntity>,
}

impl MimeEntity {
    /// Parse an entity. Never fails; see the module docs for leniency rules.
    pub fn parse(data: &[u8]) -> Self {
        Self::parse_nested(data, 0)
    }

    fn parse_nested(data: &[u8], depth: usize) -> Self {
        let (headers, body_offset) = split_header_block(data);
        let mut entity = Self {
            raw: data.to_vec(),
            body_offset,
            headers,
            parts: Vec::new(),
        };

        if depth < MAX_NESTING_DEPTH && entity.is_multipart() {
            if let Some(boundary) = entity.boundary() {
                let body = &data[body_offset..];
                entity.parts = split_parts(body, &boundary)
                    .into_iter()
                    .map(|(start, end)| Self::parse_nested(&body[start..end], depth + 1))
                    .collect();
            }
        }
        entity
    }

    /// Exact bytes of this entity: headers, separator and body.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Header lines plus the blank separator line.
    pub fn header_block(&self) -> &[u8] {
        &self.raw[..self.body_offset]
    }

    /// Body bytes, still transfer-encoded.
    pub fn body(&self) -> &[u8] {
        &self.raw[self.body_offset..]
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get_str(name)
    }

    /// Parsed `Content-Type`, if present.
    pub fn content_type(&self) -> Option<StructuredHeader> {
        self.header("Content-Type").map(parse_body)
    }

    /// Lowercased media type, defaulting to `text/plain`.
    pub fn mime_type(&self) -> String {
        self.content_type()
            .and_then(|ct| ct.value_str().map(str::to_ascii_lowercase))
            .unwrap_or_else(|| "text/plain".to_string())
    }

    /// Lowercased `Content-Transfer-Encoding`, defaulting to `7bit`.
    pub fn transfer_encoding(&self) -> String {
        self.header("Content-Transfer-Encoding")
            .map(|value| value.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "7bit".to_string())
    }

    pub fn is_multipart(&self) -> bool {
        self.mime_type().starts_with("multipart/")
    }

    /// The `boundary` parameter of a multipart `Content-Type`.
    pub fn boundary(&self) -> Option<String> {
        self.content_type()
            .and_then(|ct| ct.attribute_str("boundary").map(str::to_string))
    }

    /// Direct child parts, in transmitted order.
    pub fn parts(&self) -> &[MimeEntity] {
        &self.parts
    }

    /// Every non-multipart entity in the tree, depth first.
    pub fn leaves(&self) -> Vec<&MimeEntity> {
        if self.parts.is_empty() {
            return vec![self];
        }
        self.parts.iter().flat_map(|part| part.leaves()).collect()
    }

    /// Body with the transfer encoding removed.
    ///
    /// `base64` and `quoted-printable` are decoded; any other encoding is
    /// returned as-is.
    pub fn decoded_body(&self) -> Result<Vec<u8>, MimeError> {
        match self.transfer_encoding().as_str() {
            "base64" => base64_decode(self.body()),
            "quoted-printable" => decode_quoted_printable(self.body()),
            _ => Ok(self.body().to_vec()),
        }
    }

    /// `Content-Disposition` filename, falling back to `Content-Type` name.
    pub fn file_name(&self) -> Option<String> {
        let from_disposition = self
            .header("Content-Disposition")
            .map(parse_body)
            .and_then(|cd| cd.attribute("filename").map(ToString::to_string));
        from_disposition.or_else(|| {
            self.content_type()
                .and_then(|ct| ct.attribute("name").map(ToString::to_string))
        })
    }

    /// Re-parse this entity with its header block kept and `body` swapped in.
    pub fn with_body(&self, body: &[u8]) -> MimeEntity {
        let mut data = self.header_block().to_vec();
        data.extend_from_slice(body);
        MimeEntity::parse(&data)
    }
}

/// Parse a bare header block (no body), such as the fields of a
/// `message/disposition-notification` part.
pub fn parse_header_fields(data: &[u8]) -> HeaderMap {
    split_header_block(data).0
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// One physical line: content is `start..end`, the next line starts at `next`.
struct Line {
    start: usize,
    end: usize,
    next: usize,
}

fn lines(data: &[u8]) -> impl Iterator<Item = Line> + '_ {
    let mut position = 0;
    std::iter::from_fn(move || {
        if position >= data.len() {
            return None;
        }
        let start = position;
        let line = match data[start..].iter().position(|&b| b == b'\n') {
            Some(offset) => {
                let newline = start + offset;
                let end = if newline > start && data[newline - 1] == b'\r' {
                    newline - 1
                } else {
                    newline
                };
                Line {
                    start,
                    end,
                    next: newline + 1,
                }
            }
            None => Line {
                start,
                end: data.len(),
                next: data.len(),
            },
        };
        position = line.next;
        Some(line)
    })
}

fn is_field_name(name: &[u8]) -> bool {
    !name.is_empty() && name.iter().all(|&b| (33..=126).contains(&b) && b != b':')
}

/// Split the header block off `data`, returning the headers and the offset
/// at which the body begins.
fn split_header_block(data: &[u8]) -> (HeaderMap, usize) {
    let mut headers = HeaderMap::new();
    let mut current: Option<(String, String)> = None;

    for (index, line) in lines(data).enumerate() {
        let content = &data[line.start..line.end];

        if content.is_empty() {
            if let Some((name, value)) = current.take() {
                headers.append(name, value);
            }
            return (headers, line.next);
        }

        if content[0] == b' ' || content[0] == b'\t' {
            if let Some((_, value)) = current.as_mut() {
                let continuation = String::from_utf8_lossy(content);
                value.push(' ');
                value.push_str(continuation.trim());
                continue;
            }
        }

        let field = content
            .iter()
            .position(|&b| b == b':')
            .filter(|&colon| is_field_name(&content[..colon]));
        match field {
            Some(colon) => {
                if let Some((name, value)) = current.take() {
                    headers.append(name, value);
                }
                let name = String::from_utf8_lossy(&content[..colon]).into_owned();
                let value = String::from_utf8_lossy(&content[colon + 1..])
                    .trim()
                    .to_string();
                current = Some((name, value));
            }
            None if index == 0 => return (HeaderMap::new(), 0),
            None => {
                if let Some((name, value)) = current.take() {
                    headers.append(name, value);
                }
                return (headers, line.start);
            }
        }
    }

    if let Some((name, value)) = current.take() {
        headers.append(name, value);
    }
    (headers, data.len())
}

fn trim_trailing_whitespace(data: &[u8]) -> &[u8] {
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |index| index + 1);
    &data[..end]
}

/// Start of the line break that ends just before `line_start`.
fn line_break_start(data: &[u8], line_start: usize) -> usize {
    if line_start >= 2 && &data[line_start - 2..line_start] == b"\r\n" {
        line_start - 2
    } else if line_start >= 1 && data[line_start - 1] == b'\n' {
        line_start - 1
    } else {
        line_start
    }
}

/// Byte ranges of the parts of a multipart body.
fn split_parts(body: &[u8], boundary: &str) -> Vec<(usize, usize)> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut ranges = Vec::new();
    let mut part_start: Option<usize> = None;

    for line in lines(body) {
        let content = trim_trailing_whitespace(&body[line.start..line.end]);
        let Some(rest) = content.strip_prefix(delimiter) else {
            continue;
        };
        let closing = rest == b"--";
        if !rest.is_empty() && !closing {
            continue;
        }
        if let Some(start) = part_start.take() {
            let end = line_break_start(body, line.start).max(start);
            ranges.push((start, end));
        }
        if closing {
            return ranges;
        }
        part_start = Some(line.next);
    }

    if let Some(start) = part_start {
        ranges.push((start, body.len()));
    }
    ranges
}

fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>, MimeError> {
    let mut out = Vec::with_capacity(data.len());
    let mut index = 0;
    while index < data.len() {
        if data[index] != b'=' {
            out.push(data[index]);
            index += 1;
            continue;
        }
        let rest = &data[index + 1..];
        if rest.starts_with(b"\r\n") {
            index += 3;
        } else if rest.starts_with(b"\n") {
            index += 2;
        } else {
            let hex = rest
                .get(..2)
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or(MimeError::InvalidQuotedPrintable(index))?;
            out.push(hex);
            index += 3;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn signed_fixture(eol: &str) -> Vec<u8> {
        [
            "MIME-Version: 1.0",
            "Content-Type: multipart/signed; protocol=\"application/pkcs7-signature\";",
            "\tmicalg=sha-256; boundary=\"XYZ\"",
            "",
            "preamble text",
            "--XYZ",
            "Content-Type: application/edi-x12",
            "Content-Disposition: attachment; filename=\"order.edi\"",
            "",
            "ISA*00*",
            "--XYZ",
            "Content-Type: application/pkcs7-signature; name=smime.p7s",
            "Content-Transfer-Encoding: base64",
            "",
            "aGVsbG8=",
            "--XYZ--",
            "epilogue",
        ]
        .join(eol)
        .into_bytes()
    }

    #[test]
    fn test_parse_crlf_multipart() {
        let entity = MimeEntity::parse(&signed_fixture("\r\n"));
        assert_eq!(entity.mime_type(), "multipart/signed");
        assert_eq!(entity.boundary().as_deref(), Some("XYZ"));
        assert_eq!(entity.parts().len(), 2);

        let content = &entity.parts()[0];
        assert_eq!(
            content.raw(),
            b"Content-Type: application/edi-x12\r\nContent-Disposition: attachment; filename=\"order.edi\"\r\n\r\nISA*00*"
        );
        assert_eq!(content.body(), b"ISA*00*");
        assert_eq!(content.file_name().as_deref(), Some("order.edi"));

        let signature = &entity.parts()[1];
        assert_eq!(signature.decoded_body().unwrap(), b"hello");
    }

    #[test]
    fn test_parse_lf_multipart() {
        let entity = MimeEntity::parse(&signed_fixture("\n"));
        assert_eq!(entity.parts().len(), 2);
        assert_eq!(
            entity.parts()[0].raw(),
            b"Content-Type: application/edi-x12\nContent-Disposition: attachment; filename=\"order.edi\"\n\nISA*00*"
        );
    }

    #[test]
    fn test_folded_header_is_unfolded() {
        let entity = MimeEntity::parse(&signed_fixture("\r\n"));
        let ct = entity.content_type().unwrap();
        assert_eq!(ct.attribute_str("micalg"), Some("sha-256"));
        assert_eq!(ct.attribute_str("protocol"), Some("application/pkcs7-signature"));
    }

    #[test]
    fn test_build_then_parse_preserves_part_bytes() {
        let leaf = MimePart::new("text/plain")
            .with_header("Content-Transfer-Encoding", "7bit")
            .unwrap()
            .with_body(b"line one\r\nline two\r\n".to_vec())
            .unwrap();

        let mut outer = MimePart::multipart("multipart/mixed");
        outer.add_part(leaf.clone()).unwrap();
        outer.add_part(MimePart::verbatim(b"Content-Type: text/csv\r\n\r\na,b".to_vec())).unwrap();

        // Built children take the container's line ending; verbatim ones keep theirs.
        for eol in [LineEnding::Lf, LineEnding::CrLf] {
            let parsed = MimeEntity::parse(&outer.to_bytes(eol));
            assert_eq!(parsed.parts().len(), 2);
            assert_eq!(parsed.parts()[0].raw(), leaf.to_bytes(eol).as_slice(), "{eol:?}");
            assert_eq!(parsed.parts()[1].raw(), b"Content-Type: text/csv\r\n\r\na,b");
        }
    }

    #[test]
    fn test_preamble_serialization() {
        let mut outer = MimePart::multipart("multipart/signed");
        outer.set_preamble("This is an S/MIME signed message").unwrap();
        outer.add_part(MimePart::verbatim(b"X".to_vec())).unwrap();
        let boundary = outer.boundary().unwrap().to_string();
        let bytes = outer.to_bytes(LineEnding::Lf);
        let expected_tail =
            format!("\n\nThis is an S/MIME signed message\n\n--{boundary}\nX\n--{boundary}--\n");
        assert!(bytes.ends_with(expected_tail.as_bytes()));
    }

    #[test]
    fn test_body_and_parts_are_exclusive() {
        let mut multipart = MimePart::multipart("multipart/mixed");
        assert_eq!(multipart.set_body(b"x".to_vec()), Err(MimeError::BodyOnMultipart));

        let mut leaf = MimePart::new("text/plain");
        assert_eq!(leaf.add_part(MimePart::new("text/plain")), Err(MimeError::NotMultipart));
        assert_eq!(leaf.set_preamble("x"), Err(MimeError::NotMultipart));

        let mut verbatim = MimePart::verbatim(b"raw".to_vec());
        assert_eq!(verbatim.set_header("X", "y"), Err(MimeError::Verbatim));
    }

    #[test]
    fn test_flat_body_has_no_parts() {
        let entity = MimeEntity::parse(b"Content-Type: text/plain\r\n\r\nhello");
        assert!(entity.parts().is_empty());
        assert_eq!(entity.leaves().len(), 1);
        assert_eq!(entity.body(), b"hello");
    }

    #[test]
    fn test_multipart_without_boundary_has_no_parts() {
        let entity = MimeEntity::parse(b"Content-Type: multipart/mixed\r\n\r\n--X\r\n\r\na\r\n--X--\r\n");
        assert!(entity.parts().is_empty());
    }

    #[test]
    fn test_unterminated_multipart_keeps_last_part() {
        let entity =
            MimeEntity::parse(b"Content-Type: multipart/mixed; boundary=B\n\n--B\nContent-Type: text/plain\n\nabc");
        assert_eq!(entity.parts().len(), 1);
        assert_eq!(entity.parts()[0].body(), b"abc");
    }

    #[test]
    fn test_nested_multipart_leaves() {
        let mut inner = MimePart::multipart("multipart/alternative");
        inner.add_part(MimePart::new("text/plain").with_body(b"a".to_vec()).unwrap()).unwrap();
        inner.add_part(MimePart::new("text/html").with_body(b"<b>a</b>".to_vec()).unwrap()).unwrap();
        let mut outer = MimePart::multipart("multipart/mixed");
        outer.add_part(inner).unwrap();
        outer.add_part(MimePart::new("application/edi-x12").with_body(b"ISA".to_vec()).unwrap()).unwrap();

        let parsed = MimeEntity::parse(&outer.to_bytes(LineEnding::CrLf));
        let types: Vec<String> = parsed.leaves().iter().map(|leaf| leaf.mime_type()).collect();
        assert_eq!(types, vec!["text/plain", "text/html", "application/edi-x12"]);
    }

    #[test]
    fn test_headerless_data_is_all_body() {
        let entity = MimeEntity::parse(b"just some text\nmore text");
        assert!(entity.headers().is_empty());
        assert_eq!(entity.body(), b"just some text\nmore text");
        assert_eq!(entity.mime_type(), "text/plain");
        assert_eq!(entity.transfer_encoding(), "7bit");
    }

    #[test]
    fn test_decoded_body_quoted_printable() {
        let entity = MimeEntity::parse(
            b"Content-Transfer-Encoding: quoted-printable\r\n\r\ncaf=C3=A9 soft=\r\nbreak",
        );
        assert_eq!(entity.decoded_body().unwrap(), "café softbreak".as_bytes());

        let broken = MimeEntity::parse(b"Content-Transfer-Encoding: quoted-printable\r\n\r\nbad=Z");
        assert_eq!(broken.decoded_body(), Err(MimeError::InvalidQuotedPrintable(3)));
    }

    #[test]
    fn test_file_name_falls_back_to_content_type_name() {
        let entity = MimeEntity::parse(b"Content-Type: application/edi-x12; name=\"po.edi\"\r\n\r\nISA");
        assert_eq!(entity.file_name().as_deref(), Some("po.edi"));
        let entity = MimeEntity::parse(b"Content-Type: text/plain\r\n\r\nx");
        assert_eq!(entity.file_name(), None);
    }

    #[test]
    fn test_with_body_keeps_header_block() {
        let entity = MimeEntity::parse(b"Content-Transfer-Encoding: binary\r\n\r\na\r\nb");
        let rewritten = entity.with_body(b"a\nb");
        assert_eq!(rewritten.raw(), b"Content-Transfer-Encoding: binary\r\n\r\na\nb");
        assert_eq!(rewritten.transfer_encoding(), "binary");
    }

    #[test]
    fn test_parse_header_fields() {
        let fields = parse_header_fields(b"Reporting-UA: BOB\r\nDisposition: automatic-action/MDN-sent-automatically; processed\r\n");
        assert_eq!(fields.get_str("reporting-ua"), Some("BOB"));
        assert_eq!(
            fields.get_str("DISPOSITION"),
            Some("automatic-action/MDN-sent-automatically; processed")
        );
    }

    #[test]
    fn test_boundaries_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..100).map(|_| generate_boundary()).collect::<Vec<_>>()))
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for boundary in handle.join().unwrap() {
                assert!(seen.insert(boundary));
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
