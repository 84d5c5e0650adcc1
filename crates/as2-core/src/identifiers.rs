//! # AS2 Identifiers
//!
//! System identifiers (`AS2-From` / `AS2-To`) and Message-ID generation.
//!
//! RFC 4130 §6.2 allows system identifiers to contain spaces, in which case
//! they travel as a quoted-string. Identifiers are compared in their
//! unquoted form.

use chrono::Utc;
use uuid::Uuid;

/// Generate a Message-ID of the form `<name-YYYYMMDD-HHMMSS-uuid@domain>`.
///
/// The random UUID makes every call unique, including calls made within
/// the same second.
pub fn generate_message_id(name: &str, domain: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
    format!("<{name}-{timestamp}-{}@{domain}>", Uuid::new_v4())
}

/// Quote an identifier for an `AS2-From` / `AS2-To` header when it contains
/// a space. Already-quoted identifiers are returned unchanged.
pub fn quoted_system_identifier(name: &str) -> String {
    if is_quoted(name) || !name.contains(' ') {
        return name.to_string();
    }
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Strip the surrounding quotes of an identifier and unescape `\"` and `\\`.
pub fn unquoted_system_identifier(name: &str) -> String {
    let trimmed = name.trim();
    if !is_quoted(trimmed) {
        return trimmed.to_string();
    }
    let inner = &trimmed[1..trimmed.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn is_quoted(name: &str) -> bool {
    name.len() >= 2 && name.starts_with('"') && name.ends_with('"')
}
