// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The suite validator (C6): walks the corpus and enforces structural and
//! cross-file invariants — ID format, category/directory agreement,
//! boundary consistency, schema compliance.
//!
//! Transliterated from `validate-suite.py`'s `validate_suite`/
//! `validate_test_directory`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Serialize;
use walkdir::WalkDir;

use crate::boundary::parse_boundary;
use crate::schema;

/// Categories the corpus is expected to contain (spec §4.5). A missing
/// category is a warning, not an error.
pub const CATEGORIES: &[&str] = &[
    "basic",
    "filenames",
    "boundaries",
    "line-endings",
    "content-types",
    "edge-cases",
    "malformed",
    "browser-variations",
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub tests_checked: usize,
}

impl ValidationResult {
    fn add_error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(format!("{}: {}", path, message.into()));
    }

    fn add_warning(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(format!("{}: {}", path, message.into()));
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Tests checked: {}", self.tests_checked),
            format!("Errors: {}", self.errors.len()),
            format!("Warnings: {}", self.warnings.len()),
        ];

        if !self.errors.is_empty() {
            lines.push(String::new());
            lines.push("Errors:".to_string());
            for err in &self.errors {
                lines.push(format!("  - {}", err));
            }
        }

        if !self.warnings.is_empty() {
            lines.push(String::new());
            lines.push("Warnings:".to_string());
            for warn in &self.warnings {
                lines.push(format!("  - {}", warn));
            }
        }

        lines.join("\n")
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "valid": self.is_valid(),
            "tests_checked": self.tests_checked,
            "error_count": self.errors.len(),
            "warning_count": self.warnings.len(),
            "errors": self.errors,
            "warnings": self.warnings,
        })
    }
}

struct Schemas {
    test_case: Option<serde_json::Value>,
    headers: Option<serde_json::Value>,
}

fn load_schemas(schema_dir: &Path) -> Schemas {
    let test_case = fs::read_to_string(schema_dir.join("test-case.schema.json"))
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok());
    let headers = fs::read_to_string(schema_dir.join("headers.schema.json"))
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok());
    Schemas { test_case, headers }
}

fn validate_against_schema(
    data: &serde_json::Value,
    schema: &serde_json::Value,
    path: &str,
    result: &mut ValidationResult,
) {
    if !schema::schema_available() {
        result.add_warning(path, "jsonschema not compiled in, skipping schema validation");
        return;
    }
    if let Err(message) = schema::validate(data, schema) {
        result.add_error(path, format!("Schema validation failed: {}", message));
    }
}

fn sorted_entries(dir: &Path) -> Vec<std::path::PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect()
}

fn looks_like_test_dir(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 4
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_digit()
        && bytes[3] == b'-'
}

fn is_kebab_id(name: &str) -> bool {
    looks_like_test_dir(name)
        && name[4..]
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name[4..].is_empty()
}

fn validate_test_directory(
    test_dir: &Path,
    category: &str,
    schemas: &Schemas,
    result: &mut ValidationResult,
    seen_ids: &mut HashSet<String>,
) {
    let rel_path = test_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string();

    let test_json_path = test_dir.join("test.json");
    let headers_json_path = test_dir.join("headers.json");
    let input_raw_path = test_dir.join("input.raw");

    if !test_json_path.exists() {
        result.add_error(&rel_path, "Missing test.json");
        return;
    }
    if !headers_json_path.exists() {
        result.add_error(&rel_path, "Missing headers.json");
    }
    if !input_raw_path.exists() {
        result.add_error(&rel_path, "Missing input.raw");
    }

    let test_text = match fs::read_to_string(&test_json_path) {
        Ok(text) => text,
        Err(err) => {
            result.add_error(&rel_path, format!("Failed to read test.json: {}", err));
            return;
        }
    };
    let test_data: serde_json::Value = match serde_json::from_str(&test_text) {
        Ok(value) => value,
        Err(err) => {
            result.add_error(&rel_path, format!("Invalid JSON in test.json: {}", err));
            return;
        }
    };

    if let Some(schema) = &schemas.test_case {
        validate_against_schema(
            &test_data,
            schema,
            &format!("{}/test.json", rel_path),
            result,
        );
    }

    let dir_name = test_dir.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let test_id = test_data.get("id").and_then(|v| v.as_str()).unwrap_or("");

    if test_id != dir_name {
        result.add_error(
            &rel_path,
            format!("ID '{}' doesn't match directory name '{}'", test_id, dir_name),
        );
    }

    if seen_ids.contains(test_id) {
        result.add_error(&rel_path, format!("Duplicate test ID: {}", test_id));
    }
    seen_ids.insert(test_id.to_string());

    if !is_kebab_id(test_id) {
        result.add_error(
            &rel_path,
            format!("Invalid ID format: {} (expected NNN-kebab-case)", test_id),
        );
    }

    let test_category = test_data.get("category").and_then(|v| v.as_str()).unwrap_or("");
    if test_category != category {
        result.add_error(
            &rel_path,
            format!(
                "Category '{}' doesn't match parent directory '{}'",
                test_category, category
            ),
        );
    }

    let expected_valid = test_data
        .get("expected")
        .and_then(|e| e.get("valid"))
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    let expected_error_type = test_data
        .get("expected")
        .and_then(|e| e.get("error_type"))
        .and_then(|v| v.as_str());

    let mut headers_data: Option<serde_json::Value> = None;
    if headers_json_path.exists() {
        match fs::read_to_string(&headers_json_path) {
            Ok(text) => match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) => {
                    if let Some(schema) = &schemas.headers {
                        validate_against_schema(
                            &value,
                            schema,
                            &format!("{}/headers.json", rel_path),
                            result,
                        );
                    }

                    let content_type = value
                        .get("content-type")
                        .and_then(|v| v.as_str())
                        .unwrap_or("");
                    let boundary = parse_boundary(content_type);

                    match &boundary {
                        None => {
                            result.add_error(
                                &rel_path,
                                "Cannot extract boundary from Content-Type header",
                            );
                        }
                        Some(boundary) if input_raw_path.exists() && expected_valid => {
                            if let Ok(raw_content) = fs::read(&input_raw_path) {
                                let delimiter = format!("--{}", boundary).into_bytes();
                                if !contains(&raw_content, &delimiter) {
                                    result.add_error(
                                        &rel_path,
                                        format!("Boundary '{}' not found in input.raw", boundary),
                                    );
                                }
                            }
                        }
                        Some(_) => {}
                    }

                    headers_data = Some(value);
                }
                Err(err) => {
                    result.add_error(&rel_path, format!("Invalid JSON in headers.json: {}", err));
                }
            },
            Err(err) => {
                result.add_error(&rel_path, format!("Failed to read headers.json: {}", err));
            }
        }
    }

    if expected_valid || expected_error_type != Some("missing_terminator") {
        if input_raw_path.exists() {
            if let Ok(raw_content) = fs::read(&input_raw_path) {
                let content_type = headers_data
                    .as_ref()
                    .and_then(|h| h.get("content-type"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                if let Some(boundary) = parse_boundary(content_type) {
                    let terminator = format!("--{}--", boundary).into_bytes();
                    if !contains(&raw_content, &terminator) {
                        result.add_warning(
                            &rel_path,
                            "Final boundary terminator (--boundary--) not found",
                        );
                    }
                }
            }
        }
    }

    result.tests_checked += 1;
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Validate an entire corpus rooted at `suite_dir` (spec §4.5).
pub fn validate_suite(suite_dir: &Path) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mut seen_ids: HashSet<String> = HashSet::new();

    let schema_dir = suite_dir.join("schema");
    let schemas = if schema_dir.exists() {
        load_schemas(&schema_dir)
    } else {
        Schemas {
            test_case: None,
            headers: None,
        }
    };

    if schemas.test_case.is_none() && schemas.headers.is_none() {
        result.add_warning("schema/", "No schemas found, skipping schema validation");
    }

    let tests_dir = suite_dir.join("tests");
    if !tests_dir.is_dir() {
        result.add_error("tests/", "Tests directory not found");
        return result;
    }

    for category in CATEGORIES {
        let category_dir = tests_dir.join(category);
        if !category_dir.is_dir() {
            result.add_warning(&format!("tests/{}/", category), "Category directory not found");
            continue;
        }

        for test_dir in sorted_entries(&category_dir) {
            let name = test_dir.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if looks_like_test_dir(name) {
                validate_test_directory(&test_dir, category, &schemas, &mut result, &mut seen_ids);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_kebab_id_accepts_valid_ids() {
        assert!(is_kebab_id("001-single-text-field"));
        assert!(is_kebab_id("042-rfc5987-filename"));
    }

    #[test]
    fn is_kebab_id_rejects_uppercase_and_short_prefix() {
        assert!(!is_kebab_id("001-Has-Upper"));
        assert!(!is_kebab_id("01-too-short"));
        assert!(!is_kebab_id("001-"));
    }

    #[test]
    fn contains_finds_substring() {
        assert!(contains(b"--boundary--\r\n", b"--boundary--"));
        assert!(!contains(b"abc", b"xyz"));
    }

    #[test]
    fn validate_suite_reports_missing_tests_dir() {
        let dir = std::env::temp_dir().join("multipart_conformance_validator_empty_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let result = validate_suite(&dir);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("Tests directory not found")));
        let _ = fs::remove_dir_all(&dir);
    }
}
