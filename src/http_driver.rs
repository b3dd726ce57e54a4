// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The HTTP-driver variant of the test-case engine (spec §4.4 "HTTP-driver
//! variant"): exercises a third-party parser behind a `/parse` endpoint
//! instead of calling [`crate::parser`] in-process.
//!
//! Transliterated from the Starlette example's `test_conformance.py`:
//! `server_url`'s startup-health poll and `compare_part`'s content-type-
//! conditional comparison. Building and tearing down the server process
//! itself is the caller's responsibility (spec §1 lists the HTTP driver's
//! server as an external collaborator); this module only drives requests
//! against an already-running one.

use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::error::DriverError;
use crate::model::ExpectedPart;
use crate::testcase::{load, TestReport};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(100);
const HEALTH_POLL_ATTEMPTS: u32 = 50;

/// Poll `{base_url}/health` until it answers 200, up to ~5 seconds
/// (`HEALTH_POLL_ATTEMPTS` * `HEALTH_POLL_INTERVAL`).
pub fn wait_for_health(client: &Client, base_url: &str) -> Result<(), DriverError> {
    let url = format!("{}/health", base_url);
    for _ in 0..HEALTH_POLL_ATTEMPTS {
        if let Ok(response) = client.get(&url).timeout(Duration::from_secs(1)).send() {
            if response.status().is_success() {
                return Ok(());
            }
        }
        thread::sleep(HEALTH_POLL_INTERVAL);
    }
    Err(DriverError::StartupTimeout)
}

/// Run one test case against a live `/parse` endpoint and compare its
/// response to the declared expectation.
///
/// Expected-invalid cases whose actual result is valid are reported as
/// skipped, not failed — a lenient third-party parser is permitted to be
/// more permissive than the corpus demands.
pub fn run_test_over_http(
    client: &Client,
    base_url: &str,
    test_dir: &Path,
) -> Result<TestReport, DriverError> {
    let test_id = test_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string();

    let case = match load(test_dir) {
        Ok(case) => case,
        Err(err) => {
            return Ok(TestReport {
                test_id,
                passed: false,
                skipped: false,
                skip_reason: None,
                errors: vec![err.to_string()],
                actual: None,
                expected: None,
            })
        }
    };

    let url = format!("{}/parse", base_url);
    let mut request = client.post(&url).timeout(REQUEST_TIMEOUT).body(case.body.clone());
    for (key, value) in &case.headers {
        if let Some(value) = value.as_str() {
            request = request.header(key.as_str(), value);
        }
    }

    let response = request.send().map_err(|source| DriverError::Request {
        url: url.clone(),
        source,
    })?;
    let actual: Value = response
        .json()
        .map_err(|source| DriverError::InvalidResponse { source })?;

    let expected = &case.meta.expected;
    let mut errors = Vec::new();
    let mut skipped = false;
    let mut skip_reason = None;

    let actual_valid = actual.get("valid").and_then(Value::as_bool).unwrap_or(false);

    if expected.valid {
        if !actual_valid {
            errors.push(format!(
                "Expected valid parsing for {}, but got: {}",
                test_id, actual
            ));
        } else {
            let empty = Vec::new();
            let actual_parts = actual
                .get("parts")
                .and_then(Value::as_array)
                .unwrap_or(&empty);

            if actual_parts.len() != expected.parts.len() {
                errors.push(format!(
                    "Part count mismatch for {}: got {}, expected {}",
                    test_id,
                    actual_parts.len(),
                    expected.parts.len()
                ));
            } else {
                for (i, (actual_part, expected_part)) in
                    actual_parts.iter().zip(expected.parts.iter()).enumerate()
                {
                    let mismatches = compare_part_json(actual_part, expected_part);
                    if !mismatches.is_empty() {
                        errors.push(format!("Part {}: {}", i, mismatches.join("; ")));
                    }
                }
            }
        }
    } else if actual_valid {
        skipped = true;
        skip_reason = Some(format!(
            "Server parsed malformed input {} successfully (lenient parsing)",
            test_id
        ));
    }

    Ok(TestReport {
        test_id,
        passed: errors.is_empty(),
        skipped,
        skip_reason,
        errors,
        actual: Some(actual),
        expected: Some(serde_json::to_value(expected).unwrap_or(Value::Null)),
    })
}

/// Compare one JSON part from an HTTP response to a declared expectation
/// (spec §4.4, matching the driver's conditional `content_type` rule).
fn compare_part_json(actual: &Value, expected: &ExpectedPart) -> Vec<String> {
    let mut mismatches = Vec::new();

    let actual_name = actual.get("name").and_then(Value::as_str);
    if actual_name != expected.name.as_deref() {
        mismatches.push(format!(
            "name mismatch: got {:?}, expected {:?}",
            actual_name, expected.name
        ));
    }

    let actual_filename = actual.get("filename").and_then(Value::as_str);
    if actual_filename != expected.filename.as_deref() {
        mismatches.push(format!(
            "filename mismatch: got {:?}, expected {:?}",
            actual_filename, expected.filename
        ));
    }

    let actual_ct = actual.get("content_type").and_then(Value::as_str);
    if expected.content_type.is_some() && actual_ct != expected.content_type.as_deref() {
        mismatches.push(format!(
            "content_type mismatch: got {:?}, expected {:?}",
            actual_ct, expected.content_type
        ));
    }

    if let Some(expected_text) = &expected.body_text {
        let actual_text = actual.get("body_text").and_then(Value::as_str);
        if actual_text != Some(expected_text.as_str()) {
            mismatches.push(format!(
                "body_text mismatch: got {:?}, expected {:?}",
                actual_text, expected_text
            ));
        }
    } else if let Some(expected_b64) = &expected.body_base64 {
        // A server that happened to decode the body as UTF-8 may return
        // body_text instead of body_base64; re-derive base64 from it.
        let actual_b64 = match actual.get("body_text").and_then(Value::as_str) {
            Some(text) => base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                text.as_bytes(),
            ),
            None => actual
                .get("body_base64")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
        };
        if actual_b64 != *expected_b64 {
            mismatches.push("body_base64 mismatch".to_string());
        }
    }

    if let Some(expected_size) = expected.body_size {
        let actual_size = actual.get("body_size").and_then(Value::as_u64);
        if actual_size != Some(expected_size as u64) {
            mismatches.push(format!(
                "body_size mismatch: got {:?}, expected {}",
                actual_size, expected_size
            ));
        }
    }

    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compare_part_json_ignores_content_type_when_not_declared() {
        let actual = json!({"name": "x", "filename": null, "content_type": "text/plain"});
        let expected = ExpectedPart {
            name: Some("x".to_string()),
            ..Default::default()
        };
        assert!(compare_part_json(&actual, &expected).is_empty());
    }

    #[test]
    fn compare_part_json_checks_body_text() {
        let actual = json!({"name": "x", "body_text": "hello"});
        let expected = ExpectedPart {
            name: Some("x".to_string()),
            body_text: Some("world".to_string()),
            ..Default::default()
        };
        let mismatches = compare_part_json(&actual, &expected);
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].contains("body_text mismatch"));
    }

    #[test]
    fn compare_part_json_accepts_server_decoded_binary_as_text() {
        let actual = json!({"name": "x", "body_text": "hi"});
        let expected = ExpectedPart {
            name: Some("x".to_string()),
            body_base64: Some(base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                b"hi",
            )),
            ..Default::default()
        };
        assert!(compare_part_json(&actual, &expected).is_empty());
    }
}
