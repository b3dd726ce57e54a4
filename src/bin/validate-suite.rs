// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! CLI for validating a multipart conformance test suite's structure.
//!
//! Transliterated from `validate-suite.py`'s `main`.

use std::path::PathBuf;

use clap::Parser;
use multipart_conformance::validator::validate_suite;

/// Validate multipart conformance test suite.
#[derive(Parser, Debug)]
#[command(name = "validate-suite", about = "Validate multipart conformance test suite")]
struct Args {
    /// Path to test suite root (default: current directory)
    #[arg(default_value = ".")]
    suite_dir: PathBuf,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Only output errors
    #[arg(long, short = 'q')]
    quiet: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let suite_dir = args
        .suite_dir
        .canonicalize()
        .unwrap_or_else(|_| args.suite_dir.clone());

    if !suite_dir.join("tests").exists() && !suite_dir.join("schema").exists() {
        eprintln!("Error: {} doesn't appear to be a test suite root", suite_dir.display());
        std::process::exit(1);
    }

    let result = validate_suite(&suite_dir);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap());
    } else if !args.quiet || !result.is_valid() {
        println!("{}", result.summary());
    }

    std::process::exit(if result.is_valid() { 0 } else { 1 });
}
