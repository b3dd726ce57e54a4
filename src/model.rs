// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Shared data model consumed by the parser, generator, test-case engine,
//! and suite validator (spec §3).

use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::headers::HeaderList;

/// One payload in a multipart message.
///
/// Invariant P1: a `Part` only exists if it survived parsing with a
/// non-empty `name`. Invariant P2: `body` excludes the line-ending that
/// precedes the next boundary. Invariant P3: if `body_text()` is `Some`,
/// it is exactly the UTF-8 decoding of `body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub filename_star: Option<String>,
    pub content_type: Option<String>,
    pub charset: Option<String>,
    pub headers: HeaderList,
    pub body: Vec<u8>,
}

impl Part {
    /// UTF-8 decoding of `body`, or `None` if it isn't valid UTF-8.
    pub fn body_text(&self) -> Option<String> {
        std::str::from_utf8(&self.body).ok().map(str::to_string)
    }

    pub fn body_base64(&self) -> String {
        STANDARD.encode(&self.body)
    }

    pub fn body_sha256(&self) -> String {
        let digest = Sha256::digest(&self.body);
        hex::encode(digest)
    }

    pub fn body_size(&self) -> usize {
        self.body.len()
    }

    /// JSON shape used by the HTTP driver and the `--json` runner report.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("name".into(), self.name.clone().into());
        obj.insert("filename".into(), self.filename.clone().into());
        obj.insert("content_type".into(), self.content_type.clone().into());
        if let Some(star) = &self.filename_star {
            obj.insert("filename_star".into(), star.clone().into());
        }
        if let Some(charset) = &self.charset {
            obj.insert("charset".into(), charset.clone().into());
        }
        match self.body_text() {
            Some(text) => {
                obj.insert("body_text".into(), text.into());
                obj.insert("body_base64".into(), serde_json::Value::Null);
            }
            None => {
                obj.insert("body_text".into(), serde_json::Value::Null);
                obj.insert("body_base64".into(), self.body_base64().into());
            }
        }
        obj.insert("body_size".into(), self.body_size().into());
        serde_json::Value::Object(obj)
    }
}

/// Result of parsing a multipart message: either a fully valid sequence of
/// parts, or a terminal error carrying whatever parts were emitted before
/// the failure (spec Ambiguity 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    Valid {
        parts: Vec<Part>,
    },
    Invalid {
        error_type: crate::error::ParseErrorKind,
        error_message: String,
        parts_so_far: Vec<Part>,
    },
}

impl ParseResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParseResult::Valid { .. })
    }

    pub fn parts(&self) -> &[Part] {
        match self {
            ParseResult::Valid { parts } => parts,
            ParseResult::Invalid { parts_so_far, .. } => parts_so_far,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParseResult::Valid { parts } => serde_json::json!({
                "valid": true,
                "parts": parts.iter().map(Part::to_json).collect::<Vec<_>>(),
            }),
            ParseResult::Invalid {
                error_type,
                error_message,
                parts_so_far,
            } => {
                let mut obj = serde_json::Map::new();
                obj.insert("valid".into(), false.into());
                obj.insert("error_type".into(), error_type.as_str().into());
                obj.insert("error_message".into(), error_message.clone().into());
                if !parts_so_far.is_empty() {
                    obj.insert(
                        "parts".into(),
                        serde_json::Value::Array(
                            parts_so_far.iter().map(Part::to_json).collect(),
                        ),
                    );
                }
                serde_json::Value::Object(obj)
            }
        }
    }
}

/// `test.json`'s declared expectation for a part, as loose JSON — only the
/// fields present are compared (spec §4.4 execution rules).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExpectedPart {
    pub name: Option<String>,
    /// Compared unconditionally (`None` means "expected no filename").
    #[serde(default)]
    pub filename: Option<String>,
    /// Only compared when `Some` (spec §4.4: "only when expected declares a
    /// non-null value").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_size: Option<usize>,
}

/// `test.json`'s `expected` / `lenient_expected` object.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExpectedResult {
    #[serde(default = "default_true")]
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub parts: Vec<ExpectedPart>,
}

fn default_true() -> bool {
    true
}

/// `test.json`'s top-level metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestMeta {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: HashSet<String>,
    pub expected: ExpectedResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lenient_expected: Option<ExpectedResult>,
}

/// The `(test, headers, body)` triple loaded from a test-case directory.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub meta: TestMeta,
    pub headers: serde_json::Map<String, serde_json::Value>,
    pub body: Vec<u8>,
}

impl TestCase {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").and_then(|v| v.as_str())
    }

    pub fn is_lenient_only(&self) -> bool {
        self.meta.tags.contains("lenient")
    }
}
