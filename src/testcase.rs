// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The test-case execution engine (C5): loads a `(test.json, headers.json,
//! input.raw)` triple, selects strict vs lenient expectation, invokes
//! [`crate::parser`], and compares the result against the declared
//! expectation.
//!
//! Transliterated from `run-reference.py`'s `run_test`/`find_tests`. The
//! content-type comparison rule follows spec §4.4 ("only when expected
//! declares a non-null value"), which matches the Starlette driver's
//! `compare_part` rather than `multipart_utils.py`'s unconditional
//! `compare_parts` — see `DESIGN.md` for the resolution.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::boundary::parse_boundary;
use crate::error::LoadError;
use crate::model::{ExpectedPart, ExpectedResult, Part, ParseResult, TestCase, TestMeta};
use crate::parser::parse;

/// Load a test-case triple from `<suite>/tests/<category>/<id>/`.
pub fn load(test_dir: &Path) -> Result<TestCase, LoadError> {
    let meta: TestMeta = read_json(test_dir, "test.json")?;
    let headers: serde_json::Map<String, serde_json::Value> = read_json(test_dir, "headers.json")?;

    let body_path = test_dir.join("input.raw");
    let body = fs::read(&body_path).map_err(|source| LoadError::Io {
        path: body_path.display().to_string(),
        source,
    })?;

    Ok(TestCase { meta, headers, body })
}

fn read_json<T: serde::de::DeserializeOwned>(
    test_dir: &Path,
    file: &'static str,
) -> Result<T, LoadError> {
    let path = test_dir.join(file);
    if !path.exists() {
        return Err(LoadError::MissingFile {
            dir: test_dir.display().to_string(),
            file,
        });
    }
    let text = fs::read_to_string(&path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn looks_like_test_dir(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 4
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_digit()
        && bytes[3] == b'-'
}

fn sorted_subdirs(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect(),
        Err(_) => Vec::new(),
    };
    entries.sort();
    entries
}

/// Find all test-case directories under `<suite_dir>/tests`, optionally
/// restricted to one category, sorted for deterministic run order.
pub fn discover(suite_dir: &Path, category: Option<&str>) -> Vec<PathBuf> {
    let tests_dir = suite_dir.join("tests");
    let mut result = Vec::new();

    let category_dirs = match category {
        Some(cat) => {
            let dir = tests_dir.join(cat);
            if dir.is_dir() {
                vec![dir]
            } else {
                Vec::new()
            }
        }
        None => sorted_subdirs(&tests_dir),
    };

    for category_dir in category_dirs {
        for test_dir in sorted_subdirs(&category_dir) {
            let name = test_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("");
            if looks_like_test_dir(name) {
                result.push(test_dir);
            }
        }
    }

    result
}

/// One test's outcome, in the shape the `--json` report serializes.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub test_id: String,
    pub passed: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<serde_json::Value>,
}

impl TestReport {
    fn load_error(test_id: String, message: String) -> TestReport {
        TestReport {
            test_id,
            passed: false,
            skipped: false,
            skip_reason: None,
            errors: vec![message],
            actual: None,
            expected: None,
        }
    }

    fn skipped(test_id: String, reason: &str) -> TestReport {
        TestReport {
            test_id,
            passed: true,
            skipped: true,
            skip_reason: Some(reason.to_string()),
            errors: Vec::new(),
            actual: None,
            expected: None,
        }
    }
}

/// Run the reference parser against one test directory (spec §4.4).
pub fn run_test(test_dir: &Path, strict: bool) -> TestReport {
    let test_id = test_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string();

    let case = match load(test_dir) {
        Ok(case) => case,
        Err(err) => return TestReport::load_error(test_id, err.to_string()),
    };

    if case.is_lenient_only() && strict {
        return TestReport::skipped(
            test_id,
            "Lenient test skipped in strict mode (use --lenient)",
        );
    }

    let expected: &ExpectedResult = if !strict {
        case.meta
            .lenient_expected
            .as_ref()
            .unwrap_or(&case.meta.expected)
    } else {
        &case.meta.expected
    };

    let boundary = case.content_type().and_then(parse_boundary).unwrap_or_default();
    let result = parse(&case.body, &boundary, strict);

    let mut errors = Vec::new();

    if expected.valid != result.is_valid() {
        errors.push(format!(
            "Validity mismatch: expected {}, got {}",
            expected.valid,
            result.is_valid()
        ));
        if let ParseResult::Invalid { error_message, .. } = &result {
            errors.push(format!("Parser error: {}", error_message));
        }
    }

    if !expected.valid {
        if let (Some(expected_error), ParseResult::Invalid { error_type, .. }) =
            (&expected.error_type, &result)
        {
            if expected_error != error_type.as_str() {
                errors.push(format!(
                    "Error type mismatch: expected {}, got {}",
                    expected_error,
                    error_type.as_str()
                ));
            }
        }
    } else {
        errors.extend(compare_parts(&expected.parts, result.parts()));
    }

    TestReport {
        test_id,
        passed: errors.is_empty(),
        skipped: false,
        skip_reason: None,
        errors,
        actual: Some(result.to_json()),
        expected: Some(serde_json::to_value(expected).unwrap_or(serde_json::Value::Null)),
    }
}

/// Compare a declared `expected.parts` list against parser output (spec
/// §4.4): part count, then per-part `name`/`filename` unconditionally,
/// `content_type` only when expected declares a non-null value, and one
/// body representation as declared.
pub fn compare_parts(expected: &[ExpectedPart], actual: &[Part]) -> Vec<String> {
    let mut differences = Vec::new();

    if expected.len() != actual.len() {
        differences.push(format!(
            "Part count mismatch: expected {}, got {}",
            expected.len(),
            actual.len()
        ));
        return differences;
    }

    for (i, (exp, act)) in expected.iter().zip(actual.iter()).enumerate() {
        let prefix = format!("Part {}", i);

        if exp.name.as_deref() != Some(act.name.as_str()) {
            differences.push(format!(
                "{}: name mismatch - expected {:?}, got {:?}",
                prefix, exp.name, act.name
            ));
        }

        if exp.filename != act.filename {
            differences.push(format!(
                "{}: filename mismatch - expected {:?}, got {:?}",
                prefix, exp.filename, act.filename
            ));
        }

        if exp.content_type.is_some() && exp.content_type != act.content_type {
            differences.push(format!(
                "{}: content_type mismatch - expected {:?}, got {:?}",
                prefix, exp.content_type, act.content_type
            ));
        }

        if let Some(expected_text) = &exp.body_text {
            let actual_text = act.body_text();
            if Some(expected_text.as_str()) != actual_text.as_deref() {
                differences.push(format!(
                    "{}: body_text mismatch - expected {:?}, got {:?}",
                    prefix, expected_text, actual_text
                ));
            }
        } else if let Some(expected_b64) = &exp.body_base64 {
            let actual_b64 = act.body_base64();
            if *expected_b64 != actual_b64 {
                differences.push(format!("{}: body_base64 mismatch", prefix));
            }
        } else if let Some(expected_sha) = &exp.body_sha256 {
            let actual_sha = act.body_sha256();
            if *expected_sha != actual_sha {
                differences.push(format!(
                    "{}: body_sha256 mismatch - expected {}, got {}",
                    prefix, expected_sha, actual_sha
                ));
            }
        }

        if let Some(expected_size) = exp.body_size {
            if expected_size != act.body_size() {
                differences.push(format!(
                    "{}: body_size mismatch - expected {}, got {}",
                    prefix,
                    expected_size,
                    act.body_size()
                ));
            }
        }
    }

    differences
}

/// Aggregate outcome of a run over many test cases — the `--json` report
/// shape for `run-reference`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<TestReport>,
}

impl RunSummary {
    pub fn from_reports(results: Vec<TestReport>) -> RunSummary {
        let total = results.len();
        let skipped = results.iter().filter(|r| r.skipped).count();
        let passed = results.iter().filter(|r| r.passed && !r.skipped).count();
        let failed = total - passed - skipped;
        RunSummary {
            total,
            passed,
            failed,
            skipped,
            results,
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn part(name: &str, body: &str) -> Part {
        Part {
            name: name.to_string(),
            filename: None,
            filename_star: None,
            content_type: None,
            charset: None,
            headers: crate::headers::HeaderList::default(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn compare_parts_matches_on_name_and_body_text() {
        let expected = vec![ExpectedPart {
            name: Some("x".to_string()),
            filename: None,
            content_type: None,
            body_text: Some("hello".to_string()),
            body_base64: None,
            body_sha256: None,
            body_size: None,
        }];
        let actual = vec![part("x", "hello")];
        assert!(compare_parts(&expected, &actual).is_empty());
    }

    #[test]
    fn compare_parts_reports_name_mismatch() {
        let expected = vec![ExpectedPart {
            name: Some("x".to_string()),
            ..Default::default()
        }];
        let actual = vec![part("y", "")];
        let diffs = compare_parts(&expected, &actual);
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].contains("name mismatch"));
    }

    #[test]
    fn compare_parts_ignores_content_type_when_expected_is_null() {
        let expected = vec![ExpectedPart {
            name: Some("x".to_string()),
            ..Default::default()
        }];
        let mut actual_part = part("x", "");
        actual_part.content_type = Some("text/plain".to_string());
        assert!(compare_parts(&expected, &[actual_part]).is_empty());
    }

    #[test]
    fn compare_parts_checks_content_type_when_expected_declares_it() {
        let expected = vec![ExpectedPart {
            name: Some("x".to_string()),
            content_type: Some("application/json".to_string()),
            ..Default::default()
        }];
        let mut actual_part = part("x", "");
        actual_part.content_type = Some("text/plain".to_string());
        let diffs = compare_parts(&expected, &[actual_part]);
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].contains("content_type mismatch"));
    }

    #[test]
    fn compare_parts_reports_count_mismatch() {
        let diffs = compare_parts(&[ExpectedPart::default(), ExpectedPart::default()], &[]);
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].contains("Part count mismatch"));
    }

    #[test]
    fn looks_like_test_dir_accepts_and_rejects() {
        assert!(looks_like_test_dir("001-single-text-field"));
        assert!(!looks_like_test_dir("notatest"));
        assert!(!looks_like_test_dir("01-too-short"));
    }

    #[test]
    fn run_summary_counts_are_consistent() {
        let reports = vec![
            TestReport {
                test_id: "a".to_string(),
                passed: true,
                skipped: false,
                skip_reason: None,
                errors: vec![],
                actual: None,
                expected: None,
            },
            TestReport::skipped("b".to_string(), "lenient"),
            TestReport::load_error("c".to_string(), "boom".to_string()),
        ];
        let summary = RunSummary::from_reports(reports);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn lenient_tag_detection() {
        let mut tags = HashSet::new();
        tags.insert("lenient".to_string());
        let meta = TestMeta {
            id: "001-x".to_string(),
            category: "basic".to_string(),
            description: String::new(),
            tags,
            expected: ExpectedResult::default(),
            lenient_expected: None,
        };
        let case = TestCase {
            meta,
            headers: serde_json::Map::new(),
            body: vec![],
        };
        assert!(case.is_lenient_only());
    }
}
