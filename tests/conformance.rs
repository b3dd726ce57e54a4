//! Integration tests over a small bundled fixture suite under
//! `tests/fixtures/`, the Rust equivalent of the Starlette example's
//! `test_conformance.py` minus the live server — exercised directly
//! against the in-process engine instead of driving a third-party parser
//! behind a `/parse` endpoint.

use std::path::PathBuf;

use multipart_conformance::testcase::{discover, run_test};
use multipart_conformance::validator::validate_suite;

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[test]
fn fixture_suite_passes_strict_run() {
    let suite = fixture_dir();
    let tests = discover(&suite, None);
    assert!(!tests.is_empty(), "expected at least one fixture test case");

    for test_dir in &tests {
        let report = run_test(test_dir, true);
        assert!(
            report.passed,
            "test {} failed in strict mode: {:?}",
            report.test_id, report.errors
        );
    }
}

#[test]
fn lenient_only_case_is_skipped_in_strict_mode_but_passes_lenient() {
    let suite = fixture_dir();
    let test_dir = suite.join("tests/line-endings/005-lenient-lf-only");

    let strict_report = run_test(&test_dir, true);
    assert!(strict_report.skipped);
    assert!(strict_report.passed);

    let lenient_report = run_test(&test_dir, false);
    assert!(!lenient_report.skipped);
    assert!(lenient_report.passed, "{:?}", lenient_report.errors);
}

#[test]
fn missing_terminator_case_reports_partial_parts() {
    let suite = fixture_dir();
    let test_dir = suite.join("tests/malformed/003-missing-terminator");
    let report = run_test(&test_dir, true);
    assert!(report.passed, "{:?}", report.errors);

    let actual = report.actual.expect("report carries the actual result");
    assert_eq!(actual["valid"], false);
    assert_eq!(actual["error_type"], "missing_terminator");
    assert_eq!(actual["parts"][0]["name"], "x");
}

#[test]
fn discover_can_restrict_to_one_category() {
    let suite = fixture_dir();
    let malformed_only = discover(&suite, Some("malformed"));
    assert_eq!(malformed_only.len(), 2);
    for test_dir in &malformed_only {
        assert!(test_dir.to_string_lossy().contains("malformed"));
    }
}

#[test]
fn fixture_suite_has_no_structural_errors() {
    let suite = fixture_dir();
    let result = validate_suite(&suite);
    assert!(
        result.is_valid(),
        "fixture suite has validator errors: {:?}",
        result.errors
    );
    assert!(result.tests_checked >= 5);
}
