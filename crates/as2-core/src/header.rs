//! # Structured Header Parsing
//!
//! AS2 packs several values into single header fields:
//!
//! ```text
//! Disposition-Notification-Options: signed-receipt-protocol=optional, pkcs7-signature;
//!     signed-receipt-micalg=optional, sha256
//! Content-Type: application/pkcs7-mime; smime-type=enveloped-data; name=smime.p7m
//! ```
//!
//! Grammar: the body is a `;`-delimited list of segments. A segment is a
//! bare value or `key=value`. A value may itself be a `,`-delimited list;
//! one-element lists collapse to a scalar. Surrounding single or double
//! quotes are stripped and delimiters inside double quotes are literal.
//!
//! Attribute keys are matched case-insensitively through [`HeaderMap`],
//! the same ordered multimap that holds MIME headers and MDN fields.
//!
//! Parsing never fails. Malformed input yields whatever segments could be
//! recognized.

use crate::digest;

// ---------------------------------------------------------------------------
// HeaderMap
// ---------------------------------------------------------------------------

/// Ordered multimap with case-insensitive, case-preserving keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap<V = String> {
    entries: Vec<(String, V)>,
}

impl<V> Default for HeaderMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> HeaderMap<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, keeping any existing entries with the same name.
    pub fn append(&mut self, name: impl Into<String>, value: V) {
        self.entries.push((name.into(), value));
    }

    /// Set `name` to a single value.
    ///
    /// The first existing entry keeps its position and takes the new value;
    /// later duplicates are removed.
    pub fn insert(&mut self, name: impl Into<String>, value: V) {
        let name = name.into();
        match self.position(&name) {
            Some(index) => {
                let mut position = 0usize;
                self.entries.retain(|(existing, _)| {
                    let keep = position <= index || !existing.eq_ignore_ascii_case(&name);
                    position += 1;
                    keep
                });
                self.entries[index] = (name, value);
            }
            None => self.entries.push((name, value)),
        }
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&V> {
        self.position(name).map(|index| &self.entries[index].1)
    }

    /// Every value stored under `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a V> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Whether any entry is stored under `name`.
    pub fn contains_key(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove every entry stored under `name`, returning the removed values.
    pub fn remove(&mut self, name: &str) -> Vec<V> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for (key, value) in self.entries.drain(..) {
            if key.eq_ignore_ascii_case(name) {
                removed.push(value);
            } else {
                kept.push((key, value));
            }
        }
        self.entries = kept;
        removed
    }

    /// Entries in insertion order, with their original name spelling.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of entries, counting duplicates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

impl HeaderMap<String> {
    /// First value under `name` as a string slice.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for HeaderMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Structured values
// ---------------------------------------------------------------------------

/// A parsed header value: a scalar or a comma-separated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// A single value.
    Single(String),
    /// Two or more comma-separated values.
    List(Vec<String>),
}

impl HeaderValue {
    /// The value when it is a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::List(_) => None,
        }
    }

    /// The scalar, or the first list element.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::List(values) => values.first().map(String::as_str),
        }
    }

    /// All elements, treating a scalar as a one-element list.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::List(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(value) => f.write_str(value),
            Self::List(values) => f.write_str(&values.join(", ")),
        }
    }
}

/// A header body split into bare values and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredHeader {
    values: Vec<HeaderValue>,
    attributes: HeaderMap<HeaderValue>,
    raw: String,
}

impl StructuredHeader {
    /// The first bare (non `key=value`) segment, e.g. the media type of a
    /// `Content-Type`.
    pub fn value(&self) -> Option<&HeaderValue> {
        self.values.first()
    }

    /// The first bare segment as a string.
    pub fn value_str(&self) -> Option<&str> {
        self.value().and_then(HeaderValue::first)
    }

    /// Every bare segment in order.
    pub fn values(&self) -> &[HeaderValue] {
        &self.values
    }

    /// Attribute lookup, case-insensitive.
    pub fn attribute(&self, key: &str) -> Option<&HeaderValue> {
        self.attributes.get(key)
    }

    /// Attribute lookup returning the scalar or first list element.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(HeaderValue::first)
    }

    /// All attributes in order of appearance.
    pub fn attributes(&self) -> &HeaderMap<HeaderValue> {
        &self.attributes
    }

    /// The unparsed header body.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for StructuredHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse a header body (without the field name).
pub fn parse_body(raw: &str) -> StructuredHeader {
    let mut values = Vec::new();
    let mut attributes = HeaderMap::new();

    for segment in split_unquoted(raw, ';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match split_attribute(segment) {
            Some((key, value)) => attributes.append(key.to_ascii_lowercase(), parse_list(value)),
            None => values.push(parse_list(segment)),
        }
    }

    StructuredHeader {
        values,
        attributes,
        raw: raw.to_string(),
    }
}

/// Parse a complete `Name: body` header line.
///
/// Returns `None` when the line has no `:` separator.
pub fn parse_field(line: &str) -> Option<(String, StructuredHeader)> {
    let (name, body) = line.split_once(':')?;
    Some((name.trim().to_string(), parse_body(body.trim())))
}

/// Pick the MIC algorithm for a receipt from `Disposition-Notification-Options`.
///
/// Returns the first `signed-receipt-micalg` entry the digest selector
/// supports, spelled as the partner sent it. `None` when the header is
/// absent, has no micalg attribute, or lists nothing supported.
pub fn choose_mic_algorithm(options: Option<&str>) -> Option<String> {
    let options = options?.trim();
    if options.is_empty() {
        return None;
    }
    let parsed = parse_body(options);
    let micalg = parsed.attribute("signed-receipt-micalg")?;
    micalg
        .values()
        .into_iter()
        .find(|code| digest::is_supported(code))
        .map(str::to_string)
}

/// Split on `delimiter` outside double-quoted runs.
fn split_unquoted(input: &str, delimiter: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (index, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                pieces.push(&input[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&input[start..]);
    pieces
}

/// Split `key=value` when the segment is an attribute.
///
/// A segment is an attribute only when the text before the first unquoted
/// `=` is a non-empty token without whitespace or quotes.
fn split_attribute(segment: &str) -> Option<(&str, &str)> {
    let (key, value) = segment.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || key.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
        return None;
    }
    Some((key, value.trim()))
}

fn parse_list(value: &str) -> HeaderValue {
    let mut items: Vec<String> = split_unquoted(value, ',')
        .into_iter()
        .map(|item| unquote(item.trim()))
        .filter(|item| !item.is_empty())
        .collect();

    match items.len() {
        0 => HeaderValue::Single(String::new()),
        1 => HeaderValue::Single(items.remove(0)),
        _ => HeaderValue::List(items),
    }
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && bytes[0] == bytes[bytes.len() - 1] {
        match bytes[0] {
            b'"' => return unescape(&value[1..value.len() - 1]),
            b'\'' => return value[1..value.len() - 1].to_string(),
            _ => {}
        }
    }
    value.to_string()
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
