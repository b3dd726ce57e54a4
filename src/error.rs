// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Error taxonomy.
//!
//! [`ParseErrorKind`] is the closed, stringly-interfaced enumeration from the
//! conformance corpus's `error_type` field (spec taxonomy, exact string
//! values). Every other error type here is ambient plumbing around it:
//! loading a test case, validating a boundary, or talking to an HTTP driver.

use thiserror::Error;

/// The exact `error_type` values a [`crate::parser`] parse can fail with.
///
/// `as_str` / `Display` produce the literal strings the corpus and the JSON
/// wire format expect; do not rename variants without updating both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    InvalidBoundary,
    BoundaryMismatch,
    Truncated,
    InvalidHeader,
    MissingContentDisposition,
    MissingName,
    MissingTerminator,
    ParseError,
}

impl ParseErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseErrorKind::InvalidBoundary => "invalid_boundary",
            ParseErrorKind::BoundaryMismatch => "boundary_mismatch",
            ParseErrorKind::Truncated => "truncated",
            ParseErrorKind::InvalidHeader => "invalid_header",
            ParseErrorKind::MissingContentDisposition => "missing_content_disposition",
            ParseErrorKind::MissingName => "missing_name",
            ParseErrorKind::MissingTerminator => "missing_terminator",
            ParseErrorKind::ParseError => "parse_error",
        }
    }

    /// Parse the wire string back into a kind. Unknown strings map to
    /// `ParseError`, mirroring how a lenient third-party driver's unexpected
    /// error string is folded into the generic fallback (spec §7).
    pub fn from_str(s: &str) -> ParseErrorKind {
        match s {
            "invalid_boundary" => ParseErrorKind::InvalidBoundary,
            "boundary_mismatch" => ParseErrorKind::BoundaryMismatch,
            "truncated" => ParseErrorKind::Truncated,
            "invalid_header" => ParseErrorKind::InvalidHeader,
            "missing_content_disposition" => ParseErrorKind::MissingContentDisposition,
            "missing_name" => ParseErrorKind::MissingName,
            "missing_terminator" => ParseErrorKind::MissingTerminator,
            _ => ParseErrorKind::ParseError,
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boundary string rejected by [`crate::boundary::validate_boundary`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BoundaryError(pub String);

/// Failure loading a test case triple from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("missing {file} in {dir}")]
    MissingFile { dir: String, file: &'static str },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure talking to the HTTP driver under test.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("server did not become healthy within the startup timeout")]
    StartupTimeout,

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response body was not valid JSON: {source}")]
    InvalidResponse {
        #[source]
        source: reqwest::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: &[ParseErrorKind] = &[
        ParseErrorKind::InvalidBoundary,
        ParseErrorKind::BoundaryMismatch,
        ParseErrorKind::Truncated,
        ParseErrorKind::InvalidHeader,
        ParseErrorKind::MissingContentDisposition,
        ParseErrorKind::MissingName,
        ParseErrorKind::MissingTerminator,
        ParseErrorKind::ParseError,
    ];

    #[test]
    fn every_kind_round_trips_through_its_wire_string() {
        for kind in ALL_KINDS {
            assert_eq!(ParseErrorKind::from_str(kind.as_str()), *kind);
        }
    }

    #[test]
    fn unknown_wire_string_falls_back_to_parse_error() {
        assert_eq!(ParseErrorKind::from_str("totally_unknown"), ParseErrorKind::ParseError);
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(ParseErrorKind::MissingName.to_string(), "missing_name");
    }
}
