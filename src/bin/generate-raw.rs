// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! CLI for generating raw multipart/form-data files for the test corpus.
//!
//! Transliterated from `generate-raw.py`'s `argparse` surface, with
//! `--field`/`--file`/`--raw-part` repeated per occurrence instead of
//! Python's `nargs="+"` key=value grouping — clap's `value_parser` splits
//! each flag's own `key=value` list instead.

use std::fs;
use std::path::PathBuf;

use base64::Engine;
use clap::Parser;
use multipart_conformance::generator::{LineEnding, MultipartBuilder, PartSpec};

/// Generate raw multipart/form-data files for testing.
#[derive(Parser, Debug)]
#[command(name = "generate-raw", about = "Generate raw multipart/form-data files for testing")]
struct Args {
    /// Boundary string
    #[arg(long, short = 'b')]
    boundary: String,

    /// Add text field (name=X,value=Y[,content-type=Z])
    #[arg(long, value_delimiter = ',')]
    field: Vec<String>,

    /// Add file field (name=X,filename=Y,content=@path|content-base64=Z[,content-type=W])
    #[arg(long, value_delimiter = ',')]
    file: Vec<String>,

    /// Add raw part bytes (base64 encoded)
    #[arg(long = "raw-part")]
    raw_part: Vec<String>,

    /// Line ending style
    #[arg(long = "line-ending", default_value = "crlf")]
    line_ending: String,

    /// Omit final boundary terminator (for malformed tests)
    #[arg(long = "no-terminator")]
    no_terminator: bool,

    /// Content before first boundary
    #[arg(long)]
    preamble: Option<String>,

    /// Content after final boundary
    #[arg(long)]
    epilogue: Option<String>,

    /// Output file path (default: stdout)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Show hex dump instead of writing binary
    #[arg(long)]
    dump: bool,

    /// Also write headers.json file
    #[arg(long = "headers-output")]
    headers_output: Option<PathBuf>,

    /// Validate boundary per RFC 2046
    #[arg(long = "validate-boundary")]
    validate_boundary: bool,
}

/// `--field`/`--file` repeats as a single comma-joined string of
/// `key=value` pairs (clap's `value_delimiter` leaves each pair whole).
fn parse_kv(raw: &[String]) -> std::collections::HashMap<String, String> {
    let mut result = std::collections::HashMap::new();
    for entry in raw {
        if let Some((key, value)) = entry.split_once('=') {
            result.insert(key.to_string(), value.to_string());
        }
    }
    result
}

fn hex_dump(data: &[u8]) -> String {
    const WIDTH: usize = 16;
    let mut lines = Vec::new();
    for (offset, chunk) in data.chunks(WIDTH).enumerate() {
        let hex_part: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii_part: String = chunk
            .iter()
            .map(|&b| if (32..127).contains(&b) { b as char } else { '.' })
            .collect();
        lines.push(format!(
            "{:08x}  {:<width$}  |{}|",
            offset * WIDTH,
            hex_part.join(" "),
            ascii_part,
            width = WIDTH * 3
        ));
    }
    lines.join("\n")
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.validate_boundary {
        if let Err(err) = multipart_conformance::boundary::validate_boundary(&args.boundary) {
            eprintln!("Invalid boundary: {}", err);
            std::process::exit(1);
        }
    }

    let line_ending = match args.line_ending.as_str() {
        "lf" => LineEnding::Lf,
        _ => LineEnding::Crlf,
    };

    let mut builder = MultipartBuilder::new(args.boundary.clone())
        .line_ending(line_ending)
        .include_final_terminator(!args.no_terminator);
    if let Some(preamble) = &args.preamble {
        builder = builder.preamble(preamble.as_bytes().to_vec());
    }
    if let Some(epilogue) = &args.epilogue {
        builder = builder.epilogue(epilogue.as_bytes().to_vec());
    }

    // Each repeated --field/--file is its own comma-joined group.
    for group in regroup(&args.field) {
        let params = parse_kv(&group);
        let name = params.get("name").cloned().unwrap_or_default();
        let value = params.get("value").cloned().unwrap_or_default();
        match params.get("content-type") {
            Some(ct) => builder.add_part(PartSpec::field_with_content_type(name, value, ct.clone())),
            None => builder.add_part(PartSpec::field(name, value)),
        };
    }

    for group in regroup(&args.file) {
        let params = parse_kv(&group);
        let name = params.get("name").cloned().unwrap_or_default();
        let filename = params.get("filename").cloned().unwrap_or_default();
        let content_type = params.get("content-type").cloned();

        let content = if let Some(spec) = params.get("content") {
            if let Some(path) = spec.strip_prefix('@') {
                fs::read(path).unwrap_or_else(|err| {
                    eprintln!("Failed to read {}: {}", path, err);
                    std::process::exit(1);
                })
            } else {
                spec.as_bytes().to_vec()
            }
        } else if let Some(b64) = params.get("content-base64") {
            base64::engine::general_purpose::STANDARD
                .decode(b64)
                .unwrap_or_else(|err| {
                    eprintln!("Invalid base64 content: {}", err);
                    std::process::exit(1);
                })
        } else {
            Vec::new()
        };

        builder.add_part(PartSpec::file(name, filename, content, content_type));
    }

    for raw_b64 in &args.raw_part {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(raw_b64)
            .unwrap_or_else(|err| {
                eprintln!("Invalid base64 raw part: {}", err);
                std::process::exit(1);
            });
        builder.add_part(PartSpec::Raw(bytes));
    }

    let result = builder.build();

    if args.dump {
        println!("{}", hex_dump(&result));
        println!("\nTotal: {} bytes", result.len());
    } else if let Some(output) = &args.output {
        if let Some(parent) = output.parent() {
            let _ = fs::create_dir_all(parent);
        }
        fs::write(output, &result).unwrap_or_else(|err| {
            eprintln!("Failed to write {}: {}", output.display(), err);
            std::process::exit(1);
        });
        println!("Wrote {} bytes to {}", result.len(), output.display());
    } else {
        use std::io::Write;
        std::io::stdout().write_all(&result).unwrap();
    }

    if let Some(headers_output) = &args.headers_output {
        let headers = serde_json::json!({
            "content-type": format!("multipart/form-data; boundary={}", args.boundary),
        });
        if let Some(parent) = headers_output.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let mut text = serde_json::to_string_pretty(&headers).unwrap();
        text.push('\n');
        fs::write(headers_output, text).unwrap_or_else(|err| {
            eprintln!("Failed to write {}: {}", headers_output.display(), err);
            std::process::exit(1);
        });
        println!("Wrote headers to {}", headers_output.display());
    }
}

/// clap's `value_delimiter` flattens every `--field a=1,b=2 --field c=3` into
/// one flat `Vec<String>`; recover per-occurrence groups by splitting on the
/// `name=` marker that always starts a new field/file group.
fn regroup(flat: &[String]) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = Vec::new();
    for entry in flat {
        if entry.starts_with("name=") || groups.is_empty() {
            groups.push(vec![entry.clone()]);
        } else {
            groups.last_mut().unwrap().push(entry.clone());
        }
    }
    groups
}
