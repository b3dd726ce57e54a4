// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! CLI for running the reference parser against the conformance test suite.
//!
//! Transliterated from `run-reference.py`'s `main`/`find_tests`.

use std::path::PathBuf;

use clap::Parser;
use multipart_conformance::testcase::{discover, run_test, RunSummary};

/// Run reference parser against test suite.
#[derive(Parser, Debug)]
#[command(name = "run-reference", about = "Run reference parser against test suite")]
struct Args {
    /// Run a single test directory
    #[arg(long, short = 't', value_name = "PATH")]
    test: Option<PathBuf>,

    /// Run all tests in a category
    #[arg(long, short = 'c')]
    category: Option<String>,

    /// Run all tests
    #[arg(long, short = 'a')]
    all: bool,

    /// Path to test suite root (default: current directory)
    #[arg(long = "suite-dir", short = 'd', default_value = ".")]
    suite_dir: PathBuf,

    /// Use lenient parsing (accept LF instead of CRLF)
    #[arg(long)]
    lenient: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Show detailed output for each test
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.test.is_none() && args.category.is_none() && !args.all {
        eprintln!("error: one of --test, --category, or --all is required");
        std::process::exit(1);
    }

    let suite_dir = args
        .suite_dir
        .canonicalize()
        .unwrap_or_else(|_| args.suite_dir.clone());
    let strict = !args.lenient;

    let tests: Vec<PathBuf> = if let Some(test) = &args.test {
        let resolved = if test.is_absolute() {
            test.clone()
        } else {
            suite_dir.join(test)
        };
        vec![resolved]
    } else if let Some(category) = &args.category {
        discover(&suite_dir, Some(category))
    } else {
        discover(&suite_dir, None)
    };

    if tests.is_empty() {
        eprintln!("No tests found");
        std::process::exit(1);
    }

    let mut results = Vec::with_capacity(tests.len());
    for test_dir in &tests {
        let result = run_test(test_dir, strict);

        if !args.json {
            if result.skipped {
                if args.verbose {
                    println!(
                        "SKIP: {} ({})",
                        result.test_id,
                        result.skip_reason.as_deref().unwrap_or("skipped")
                    );
                }
            } else if result.passed {
                if args.verbose {
                    println!("PASS: {}", result.test_id);
                }
            } else {
                println!("FAIL: {}", result.test_id);
                for error in &result.errors {
                    println!("      {}", error);
                }
            }
        }

        results.push(result);
    }

    let summary = RunSummary::from_reports(results);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary).unwrap());
    } else {
        let mut line = format!(
            "\nTotal: {}, Passed: {}, Failed: {}",
            summary.total, summary.passed, summary.failed
        );
        if summary.skipped > 0 {
            line.push_str(&format!(", Skipped: {}", summary.skipped));
        }
        println!("{}", line);
    }

    std::process::exit(summary.exit_code());
}
