// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! MIME header block parsing (C2) and `Content-Disposition` parameter
//! grammar (the remaining half of C1).

use crate::boundary::{decode_rfc5987, tokenize_header_params};

/// An ordered list of `(name, value)` pairs as they appeared in the part,
/// names case-preserved for display but looked up case-insensitively via
/// [`HeaderList::get`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList(pub Vec<(String, String)>);

impl HeaderList {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn push_or_fold(&mut self, name: String, value: String) {
        self.0.push((name, value));
    }
}

/// Outcome of scanning one header block.
pub struct ParsedHeaders {
    pub headers: HeaderList,
    /// Byte offset immediately after the blank line terminating the block.
    pub end: usize,
}

/// Parse a MIME header block starting at `pos`, stopping at the first blank
/// line. Lines are CRLF-terminated in strict mode, CRLF-or-LF in lenient
/// mode. A continuation line (leading SP/HTAB, at least one header already
/// seen) is folded onto the previous header's value with a single
/// separating space, per RFC 822 obsolete folding (kept per spec
/// Ambiguity 3 — never rejected even though RFC 7230 deprecates it).
///
/// Returns `None` if a non-continuation line lacks `:` or input runs out
/// before a blank line is found.
pub fn parse_header_block(body: &[u8], pos: usize, strict: bool) -> Option<ParsedHeaders> {
    let mut headers = HeaderList::default();
    let mut cursor = pos;

    loop {
        if cursor >= body.len() {
            return None;
        }

        if body[cursor..].starts_with(b"\r\n") {
            return Some(ParsedHeaders {
                headers,
                end: cursor + 2,
            });
        }
        if !strict && body.get(cursor) == Some(&b'\n') {
            return Some(ParsedHeaders {
                headers,
                end: cursor + 1,
            });
        }

        let crlf_pos = find(body, b"\r\n", cursor);
        let lf_pos = find(body, b"\n", cursor);

        let (line_end, next_pos) = match (crlf_pos, lf_pos) {
            (Some(c), Some(l)) if c <= l => (c, c + 2),
            (Some(c), None) => (c, c + 2),
            (_, Some(l)) if !strict => (l, l + 1),
            _ => return None,
        };

        let line = &body[cursor..line_end];
        let line_str = decode_header_line(line);

        if (line_str.starts_with(' ') || line_str.starts_with('\t')) && !headers.0.is_empty() {
            let trimmed = line_str.trim();
            let last = headers.0.last_mut().expect("checked non-empty above");
            last.1.push(' ');
            last.1.push_str(trimmed);
        } else if let Some(colon) = line_str.find(':') {
            let name = line_str[..colon].trim().to_string();
            let value = line_str[colon + 1..].trim().to_string();
            headers.push_or_fold(name, value);
        } else {
            return None;
        }

        cursor = next_pos;
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Decode a raw header line as UTF-8, falling back to Latin-1 (which always
/// succeeds) on decode error.
fn decode_header_line(line: &[u8]) -> String {
    match std::str::from_utf8(line) {
        Ok(s) => s.to_string(),
        Err(_) => line.iter().map(|&b| b as char).collect(),
    }
}

/// Parsed `Content-Disposition` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDisposition {
    pub disposition_type: Option<String>,
    pub name: Option<String>,
    pub filename: Option<String>,
    pub filename_star: Option<String>,
}

/// Parse a `Content-Disposition` header value into its disposition type and
/// `name`/`filename`/`filename*` parameters.
pub fn parse_content_disposition(value: &str) -> ContentDisposition {
    let mut result = ContentDisposition::default();

    if value.is_empty() {
        return result;
    }

    let tokens = tokenize_header_params(value);
    let mut tokens = tokens.into_iter();

    if let Some(first) = tokens.next() {
        result.disposition_type = Some(first.trim().to_ascii_lowercase());
    }

    for token in tokens {
        let token = token.trim();
        let eq = match token.find('=') {
            Some(idx) => idx,
            None => continue,
        };

        let key = token[..eq].trim().to_ascii_lowercase();
        let mut value = token[eq + 1..].trim().to_string();

        if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
            value = value[1..value.len() - 1].replace("\\\"", "\"").replace("\\\\", "\\");
        }

        match key.as_str() {
            "name" => result.name = Some(value),
            "filename" => result.filename = Some(value),
            "filename*" => result.filename_star = Some(decode_rfc5987(&value)),
            _ => {}
        }
    }

    result
}

/// Extract the media type and `charset` parameter from a `Content-Type`
/// header value. The media type is the portion before the first `;`.
pub fn parse_content_type(value: &str) -> (String, Option<String>) {
    let media_type = value.split(';').next().unwrap_or("").trim().to_string();

    let mut charset = None;
    for segment in value.split(';').skip(1) {
        let segment = segment.trim();
        if segment.len() >= 8 && segment[..8].eq_ignore_ascii_case("charset=") {
            charset = Some(segment[8..].trim().trim_matches('"').to_string());
            break;
        }
    }

    (media_type, charset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_headers() {
        let input = b"Content-Disposition: form-data; name=\"x\"\r\nContent-Type: text/plain\r\n\r\nbody";
        let parsed = parse_header_block(input, 0, true).unwrap();
        assert_eq!(
            parsed.headers.get("content-disposition"),
            Some("form-data; name=\"x\"")
        );
        assert_eq!(parsed.headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(parsed.end, input.len() - b"body".len());
    }

    #[test]
    fn rejects_line_without_colon() {
        let input = b"not-a-header\r\n\r\n";
        assert!(parse_header_block(input, 0, true).is_none());
    }

    #[test]
    fn folds_continuation_lines() {
        let input = b"X-Long: first\r\n  second\r\n\r\nbody";
        let parsed = parse_header_block(input, 0, true).unwrap();
        assert_eq!(parsed.headers.get("x-long"), Some("first second"));
    }

    #[test]
    fn strict_mode_rejects_lone_lf() {
        let input = b"Content-Disposition: form-data; name=\"x\"\n\nbody";
        assert!(parse_header_block(input, 0, true).is_none());
    }

    #[test]
    fn lenient_mode_accepts_lone_lf() {
        let input = b"Content-Disposition: form-data; name=\"x\"\n\nbody";
        let parsed = parse_header_block(input, 0, false).unwrap();
        assert_eq!(
            parsed.headers.get("content-disposition"),
            Some("form-data; name=\"x\"")
        );
    }

    #[test]
    fn duplicate_headers_keep_both_but_lookup_latest() {
        let input = b"X-A: first\r\nX-A: second\r\n\r\n";
        let parsed = parse_header_block(input, 0, true).unwrap();
        assert_eq!(parsed.headers.0.len(), 2);
        assert_eq!(parsed.headers.get("x-a"), Some("second"));
    }

    #[test]
    fn content_disposition_with_escaped_quote_filename() {
        let cd = parse_content_disposition(r#"form-data; name="f"; filename="a\"b.txt""#);
        assert_eq!(cd.name.as_deref(), Some("f"));
        assert_eq!(cd.filename.as_deref(), Some("a\"b.txt"));
    }

    #[test]
    fn content_disposition_filename_star() {
        let cd = parse_content_disposition("form-data; name=\"f\"; filename*=utf-8''%E6%96%87.txt");
        assert_eq!(cd.filename_star.as_deref(), Some("\u{6587}.txt"));
    }

    #[test]
    fn content_disposition_missing_name() {
        let cd = parse_content_disposition("form-data; filename=\"x.txt\"");
        assert!(cd.name.is_none());
    }

    #[test]
    fn content_type_strips_parameters() {
        let (media, charset) = parse_content_type("text/plain; charset=utf-8");
        assert_eq!(media, "text/plain");
        assert_eq!(charset.as_deref(), Some("utf-8"));
    }

    #[test]
    fn content_type_without_charset() {
        let (media, charset) = parse_content_type("application/octet-stream");
        assert_eq!(media, "application/octet-stream");
        assert_eq!(charset, None);
    }
}
