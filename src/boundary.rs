// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Byte-level utilities: boundary extraction/validation and RFC 5987 codec.
//!
//! Ported from `multipart_utils.py`'s regex-based scan into direct string
//! scanning, per the re-architecture guidance that the two boundary-
//! extraction regexes are a convenience replaceable with a two-pass scan.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::BoundaryError;

/// RFC 2046's boundary alphabet, plus space (never as the final character).
const BOUNDARY_CHARS: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz'()+_,-./:=? ";

/// Extract the `boundary=` parameter from a `Content-Type` header value.
///
/// Prefers the quoted form `boundary="…"`; falls back to the unquoted form
/// terminated by whitespace or `;`. Matching is case-insensitive on the
/// parameter name. Returns `None` if neither form is present.
pub fn parse_boundary(content_type: &str) -> Option<String> {
    if content_type.is_empty() {
        return None;
    }

    let lower = content_type.to_ascii_lowercase();

    if let Some(key_pos) = lower.find("boundary=") {
        let after_key = key_pos + "boundary=".len();
        let rest = &content_type[after_key..];
        if let Some(stripped) = rest.strip_prefix('"') {
            if let Some(end) = stripped.find('"') {
                return Some(stripped[..end].to_string());
            }
            // Unterminated quote: fall through to unquoted scan below.
        } else {
            let end = rest
                .find(|c: char| c == ';' || c.is_whitespace())
                .unwrap_or(rest.len());
            let value = rest[..end].trim_end();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Validate a boundary string against RFC 2046's character set and length.
pub fn validate_boundary(boundary: &str) -> Result<(), BoundaryError> {
    if boundary.is_empty() {
        return Err(BoundaryError("Boundary cannot be empty".into()));
    }

    if boundary.chars().count() > 70 {
        return Err(BoundaryError(format!(
            "Boundary exceeds maximum length of 70 (got {})",
            boundary.chars().count()
        )));
    }

    if boundary.ends_with(' ') {
        return Err(BoundaryError("Boundary cannot end with a space".into()));
    }

    let invalid: Vec<char> = boundary
        .chars()
        .filter(|c| !BOUNDARY_CHARS.contains(*c))
        .collect();
    if !invalid.is_empty() {
        return Err(BoundaryError(format!(
            "Boundary contains invalid characters: {:?}",
            invalid
        )));
    }

    Ok(())
}

/// The set of bytes RFC 5987's `attr-char` excludes from the percent-encoded
/// segment (everything that isn't `ALPHA / DIGIT / "!" / "#" / "$" / "&" /
/// "+" / "-" / "." / "^" / "_" / "`" / "|" / "~"`, expressed as its
/// complement for `utf8_percent_encode`).
const RFC5987_ATTR_CHAR: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'{')
    .add(b'}');

/// Decode an RFC 5987 `charset'language'encoded-value` parameter.
///
/// Returns the input unchanged if the structure doesn't match (missing or
/// malformed quote delimiters), mirroring the reference's forgiving
/// fallback.
pub fn decode_rfc5987(value: &str) -> String {
    if !value.contains('\'') {
        return value.to_string();
    }

    let mut parts = value.splitn(3, '\'');
    let (charset, _language, encoded) = match (parts.next(), parts.next(), parts.next()) {
        (Some(c), Some(l), Some(e)) => (c, l, e),
        _ => return value.to_string(),
    };

    // Only UTF-8 is meaningfully decodable without a full charset registry;
    // anything else is treated as UTF-8 too, matching the reference's
    // `unquote(encoding=charset.lower() or 'utf-8')` best-effort behavior.
    let _ = charset;
    match percent_decode_str(encoded).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_string(),
    }
}

/// Encode a value as an RFC 5987 `charset''encoded-value` parameter.
pub fn encode_rfc5987(value: &str, charset: &str) -> String {
    let encoded = utf8_percent_encode(value, RFC5987_ATTR_CHAR).to_string();
    format!("{}''{}", charset, encoded)
}

/// Split a header parameter string on `;`, respecting double-quoted
/// segments. Inside quotes, `\"` and `\\` escapes are preserved verbatim
/// (unescaping happens later, in [`crate::headers::parse_content_disposition`]).
pub fn tokenize_header_params(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape_next = false;

    for ch in s.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
        } else if ch == '\\' && in_quotes {
            current.push(ch);
            escape_next = true;
        } else if ch == '"' {
            current.push(ch);
            in_quotes = !in_quotes;
        } else if ch == ';' && !in_quotes {
            tokens.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_boundary_quoted_and_unquoted_agree() {
        let quoted = parse_boundary(r#"multipart/form-data; boundary="abc""#);
        let unquoted = parse_boundary("multipart/form-data; boundary=abc");
        assert_eq!(quoted, Some("abc".to_string()));
        assert_eq!(unquoted, Some("abc".to_string()));
    }

    #[test]
    fn parse_boundary_unquoted_stops_at_semicolon() {
        assert_eq!(
            parse_boundary("multipart/form-data; boundary=abc; charset=utf-8"),
            Some("abc".to_string())
        );
    }

    #[test]
    fn parse_boundary_absent() {
        assert_eq!(parse_boundary("text/plain"), None);
        assert_eq!(parse_boundary(""), None);
    }

    #[test]
    fn validate_boundary_length_70_ok_71_rejected() {
        let b70 = "a".repeat(70);
        let b71 = "a".repeat(71);
        assert!(validate_boundary(&b70).is_ok());
        assert!(validate_boundary(&b71).is_err());
    }

    #[test]
    fn validate_boundary_rejects_trailing_space() {
        assert!(validate_boundary("abc ").is_err());
    }

    #[test]
    fn validate_boundary_accepts_interior_space() {
        assert!(validate_boundary("abc def").is_ok());
    }

    #[test]
    fn validate_boundary_rejects_empty() {
        assert!(validate_boundary("").is_err());
    }

    #[test]
    fn rfc5987_round_trip() {
        let original = "wr\u{00f3}d\u{017a}.txt";
        let encoded = encode_rfc5987(original, "utf-8");
        assert_eq!(decode_rfc5987(&encoded), original);
    }

    #[test]
    fn rfc5987_decode_known_value() {
        assert_eq!(decode_rfc5987("utf-8''%E6%96%87.txt"), "\u{6587}.txt");
    }

    #[test]
    fn rfc5987_decode_malformed_passthrough() {
        assert_eq!(decode_rfc5987("no-quotes-here"), "no-quotes-here");
    }

    #[test]
    fn tokenize_respects_quotes() {
        let tokens = tokenize_header_params(
            r#"form-data; name="f"; filename="a;b.txt""#,
        );
        assert_eq!(
            tokens,
            vec![
                "form-data".to_string(),
                " name=\"f\"".to_string(),
                " filename=\"a;b.txt\"".to_string(),
            ]
        );
    }
}
