// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The reference multipart parser (C3): a strict-by-default, optionally
//! lenient, stream-over-buffer parser that turns a raw body plus a boundary
//! string into an ordered sequence of [`Part`]s or a precise [`ParseResult::Invalid`].
//!
//! Transliterated from `run-reference.py`'s `MultipartParser` class into a
//! byte-slice state machine; `delimiter`/`close_delimiter`/`pos` keep their
//! names from that reference.

use log::trace;

use crate::boundary::validate_boundary;
use crate::error::ParseErrorKind;
use crate::headers::{parse_content_disposition, parse_content_type, parse_header_block, HeaderList};
use crate::model::{Part, ParseResult};

const CRLF: &[u8] = b"\r\n";
const LF: &[u8] = b"\n";

fn build_part(
    headers: HeaderList,
    name: String,
    filename: Option<String>,
    filename_star: Option<String>,
    body: Vec<u8>,
) -> Part {
    let (content_type, charset) = match headers.get("content-type") {
        Some(v) => {
            let (media, charset) = parse_content_type(v);
            (Some(media), charset)
        }
        None => (None, None),
    };

    Part {
        name,
        filename,
        filename_star,
        content_type,
        charset,
        headers,
        body,
    }
}

/// Parse `body` as a `multipart/*` message delimited by `boundary`.
///
/// In strict mode every structural line-ending must be CRLF; in lenient
/// mode a lone LF is also accepted wherever strict mode expects CRLF.
pub fn parse(body: &[u8], boundary: &str, strict: bool) -> ParseResult {
    if boundary.is_empty() {
        return invalid(ParseErrorKind::InvalidBoundary, "No boundary provided", vec![]);
    }

    let delimiter = format!("--{}", boundary).into_bytes();
    let close_delimiter = format!("--{}--", boundary).into_bytes();

    let first = match find(body, &delimiter, 0) {
        Some(pos) => pos,
        None => {
            return invalid(
                ParseErrorKind::BoundaryMismatch,
                &format!("Boundary '{}' not found in body", boundary),
                vec![],
            )
        }
    };

    let mut pos = first + delimiter.len();
    pos = match skip_line_ending(body, pos, strict) {
        Some(p) => p,
        None => {
            return invalid(
                ParseErrorKind::Truncated,
                "Unexpected end after first boundary",
                vec![],
            )
        }
    };

    let mut parts: Vec<Part> = Vec::new();

    while pos < body.len() {
        trace!("parsing part headers at offset {}", pos);
        let parsed_headers = match parse_header_block(body, pos, strict) {
            Some(h) => h,
            None => {
                return invalid(
                    ParseErrorKind::InvalidHeader,
                    &format!("Failed to parse headers at position {}", pos),
                    parts,
                )
            }
        };
        pos = parsed_headers.end;
        let headers = parsed_headers.headers;

        let content_disposition = match headers.get("content-disposition") {
            Some(v) => v.to_string(),
            None => {
                return invalid(
                    ParseErrorKind::MissingContentDisposition,
                    "Missing Content-Disposition header",
                    parts,
                )
            }
        };

        let cd = parse_content_disposition(&content_disposition);
        let name = match cd.name {
            Some(n) => n,
            None => {
                return invalid(
                    ParseErrorKind::MissingName,
                    "Missing name parameter in Content-Disposition",
                    parts,
                )
            }
        };

        let body_end = match find_next_boundary(body, pos, &delimiter, strict) {
            Some(p) => p,
            None => {
                // No occurrence of the delimiter follows at all. If the
                // close delimiter exists further on but wasn't adjacent
                // (malformed spacing), this is a structural truncation; if
                // it doesn't exist anywhere, the document simply never
                // closed and this part's content runs to EOF (spec
                // Ambiguity 2 / literal scenario: emit it, report
                // `missing_terminator`).
                if find(body, &close_delimiter, pos).is_some() {
                    return invalid(
                        ParseErrorKind::Truncated,
                        "Part body not terminated by boundary",
                        parts,
                    );
                }

                let mut end = body.len();
                if body.ends_with(CRLF) {
                    end -= CRLF.len();
                } else if !strict && body.ends_with(LF) {
                    end -= LF.len();
                }
                let tail_body = body[pos..end].to_vec();
                parts.push(build_part(headers, name, cd.filename, cd.filename_star, tail_body));

                return invalid(
                    ParseErrorKind::MissingTerminator,
                    "Missing final boundary terminator",
                    parts,
                );
            }
        };

        let part_body = body[pos..body_end].to_vec();
        parts.push(build_part(headers, name, cd.filename, cd.filename_star, part_body));

        pos = body_end;
        if body[pos..].starts_with(CRLF) {
            pos += 2;
        } else if !strict && body.get(pos) == Some(&b'\n') {
            pos += 1;
        }

        if body[pos..].starts_with(close_delimiter.as_slice()) {
            break;
        } else if body[pos..].starts_with(delimiter.as_slice()) {
            pos += delimiter.len();
            match skip_line_ending(body, pos, strict) {
                Some(p) => pos = p,
                None => break,
            }
        } else {
            return invalid(
                ParseErrorKind::BoundaryMismatch,
                "Expected boundary not found",
                parts,
            );
        }
    }

    if find(body, &close_delimiter, 0).is_none() {
        return invalid(
            ParseErrorKind::MissingTerminator,
            "Missing final boundary terminator",
            parts,
        );
    }

    ParseResult::Valid { parts }
}

/// Validate a boundary string and, if valid, parse with it — the common
/// entry point used by the test-case engine (which already validated the
/// boundary at extraction time) and by callers that haven't.
pub fn parse_with_validation(body: &[u8], boundary: &str, strict: bool) -> ParseResult {
    if let Err(err) = validate_boundary(boundary) {
        return invalid(ParseErrorKind::InvalidBoundary, &err.0, vec![]);
    }
    parse(body, boundary, strict)
}

fn invalid(kind: ParseErrorKind, message: &str, parts_so_far: Vec<Part>) -> ParseResult {
    ParseResult::Invalid {
        error_type: kind,
        error_message: message.to_string(),
        parts_so_far,
    }
}

/// Skip one CRLF (or, in lenient mode, one LF) at `pos`. Returns `None` if
/// there's nothing to skip (end of input, or a lone LF in strict mode).
fn skip_line_ending(body: &[u8], pos: usize, strict: bool) -> Option<usize> {
    if pos >= body.len() {
        return None;
    }

    if body[pos..].starts_with(CRLF) {
        Some(pos + 2)
    } else if body.get(pos) == Some(&b'\n') {
        if strict {
            None
        } else {
            Some(pos + 1)
        }
    } else {
        Some(pos)
    }
}

/// Find the earliest occurrence of `CRLF + delimiter` (strict) or the
/// earlier of `CRLF + delimiter` / `LF + delimiter` (lenient) at or after
/// `pos`. Returns the position of the line-ending that precedes the
/// delimiter (i.e. the end of the part body).
fn find_next_boundary(body: &[u8], pos: usize, delimiter: &[u8], strict: bool) -> Option<usize> {
    let mut search_crlf = Vec::with_capacity(CRLF.len() + delimiter.len());
    search_crlf.extend_from_slice(CRLF);
    search_crlf.extend_from_slice(delimiter);

    let crlf_pos = find(body, &search_crlf, pos);

    if strict {
        return crlf_pos;
    }

    let mut search_lf = Vec::with_capacity(LF.len() + delimiter.len());
    search_lf.extend_from_slice(LF);
    search_lf.extend_from_slice(delimiter);
    let lf_pos = find(body, &search_lf, pos);

    match (crlf_pos, lf_pos) {
        (Some(c), Some(l)) => Some(c.min(l)),
        (Some(c), None) => Some(c),
        (None, Some(l)) => Some(l),
        (None, None) => None,
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts_of(result: &ParseResult) -> &[Part] {
        result.parts()
    }

    #[test]
    fn single_text_field_crlf() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"x\"\r\n\r\nhello\r\n--B--\r\n";
        let result = parse(body, "B", true);
        assert!(result.is_valid());
        let parts = parts_of(&result);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "x");
        assert_eq!(parts[0].filename, None);
        assert_eq!(parts[0].content_type, None);
        assert_eq!(parts[0].body, b"hello");
        assert_eq!(parts[0].body_size(), 5);
    }

    #[test]
    fn file_with_escaped_quote_filename() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"a\\\"b.txt\"\r\n\r\nDATA\r\n--B--\r\n";
        let result = parse(body, "B", true);
        let parts = parts_of(&result);
        assert_eq!(parts[0].name, "f");
        assert_eq!(parts[0].filename.as_deref(), Some("a\"b.txt"));
    }

    #[test]
    fn rfc5987_filename_star() {
        let body = "--B\r\nContent-Disposition: form-data; name=\"f\"; filename*=utf-8''%E6%96%87.txt\r\n\r\nDATA\r\n--B--\r\n".as_bytes();
        let result = parse(body, "B", true);
        let parts = parts_of(&result);
        assert_eq!(parts[0].filename_star.as_deref(), Some("\u{6587}.txt"));
    }

    #[test]
    fn missing_terminator_returns_partial_parts() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"x\"\r\n\r\nhello\r\n";
        let result = parse(body, "B", true);
        assert!(!result.is_valid());
        match &result {
            ParseResult::Invalid { error_type, parts_so_far, .. } => {
                assert_eq!(*error_type, ParseErrorKind::MissingTerminator);
                assert_eq!(parts_so_far.len(), 1);
                assert_eq!(parts_so_far[0].name, "x");
                assert_eq!(parts_so_far[0].body, b"hello");
            }
            _ => panic!("expected Invalid"),
        }
    }

    #[test]
    fn missing_content_disposition() {
        let body = b"--B\r\nContent-Type: text/plain\r\n\r\nhello\r\n--B--\r\n";
        let result = parse(body, "B", true);
        match &result {
            ParseResult::Invalid { error_type, .. } => {
                assert_eq!(*error_type, ParseErrorKind::MissingContentDisposition);
            }
            _ => panic!("expected Invalid"),
        }
    }

    #[test]
    fn lf_only_strict_vs_lenient() {
        let body = b"--B\nContent-Disposition: form-data; name=\"x\"\n\nhello\n--B--\n";

        let strict_result = parse(body, "B", true);
        assert!(!strict_result.is_valid());

        let lenient_result = parse(body, "B", false);
        assert!(lenient_result.is_valid());
        let parts = parts_of(&lenient_result);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "x");
        assert_eq!(parts[0].body, b"hello");
    }

    #[test]
    fn empty_body_is_boundary_mismatch() {
        let result = parse(b"", "B", true);
        match &result {
            ParseResult::Invalid { error_type, .. } => {
                assert_eq!(*error_type, ParseErrorKind::BoundaryMismatch);
            }
            _ => panic!("expected Invalid"),
        }
    }

    #[test]
    fn empty_boundary_is_invalid_boundary() {
        let result = parse(b"--B\r\n\r\n\r\n--B--\r\n", "", true);
        match &result {
            ParseResult::Invalid { error_type, .. } => {
                assert_eq!(*error_type, ParseErrorKind::InvalidBoundary);
            }
            _ => panic!("expected Invalid"),
        }
    }

    #[test]
    fn zero_length_part_body_is_valid() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"x\"\r\n\r\n\r\n--b--";
        let result = parse(body, "b", true);
        assert!(result.is_valid());
        let parts = parts_of(&result);
        assert_eq!(parts[0].body, b"");
    }

    #[test]
    fn duplicate_headers_latest_wins_but_both_preserved() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"x\"\r\nX-Dup: one\r\nX-Dup: two\r\n\r\nhello\r\n--B--\r\n";
        let result = parse(body, "B", true);
        let parts = parts_of(&result);
        assert_eq!(parts[0].headers.get("x-dup"), Some("two"));
        let dup_count = parts[0]
            .headers
            .0
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("x-dup"))
            .count();
        assert_eq!(dup_count, 2);
    }

    #[test]
    fn multiple_parts_in_sequence() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--B\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\n2\r\n--B--\r\n";
        let result = parse(body, "B", true);
        assert!(result.is_valid());
        let parts = parts_of(&result);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name, "a");
        assert_eq!(parts[0].body, b"1");
        assert_eq!(parts[1].name, "b");
        assert_eq!(parts[1].body, b"2");
    }

    #[test]
    fn content_type_and_charset_extracted() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"x\"; filename=\"a.txt\"\r\nContent-Type: text/plain; charset=iso-8859-1\r\n\r\nhello\r\n--B--\r\n";
        let result = parse(body, "B", true);
        let parts = parts_of(&result);
        assert_eq!(parts[0].content_type.as_deref(), Some("text/plain"));
        assert_eq!(parts[0].charset.as_deref(), Some("iso-8859-1"));
    }
}
