// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The reference multipart generator (C4): the dual of [`crate::parser`].
//!
//! Transliterated from `generate-raw.py`'s `MultipartBuilder` class. A
//! `PartSpec` is either a structured field/file description or a raw-bytes
//! escape hatch for crafting deliberately malformed parts.

/// Line-ending style used between structural elements of a generated body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Crlf,
    Lf,
}

impl LineEnding {
    fn bytes(self) -> &'static [u8] {
        match self {
            LineEnding::Crlf => b"\r\n",
            LineEnding::Lf => b"\n",
        }
    }
}

/// One part to emit, in either structured or raw form.
#[derive(Debug, Clone)]
pub enum PartSpec {
    Structured {
        name: String,
        filename: Option<String>,
        filename_star: Option<String>,
        content_type: Option<String>,
        extra_headers: Vec<(String, String)>,
        body: Vec<u8>,
    },
    /// Bytes emitted verbatim between the opening delimiter and the
    /// following line-ending, bypassing header rendering entirely.
    Raw(Vec<u8>),
}

impl PartSpec {
    pub fn field(name: impl Into<String>, value: impl Into<Vec<u8>>) -> PartSpec {
        PartSpec::Structured {
            name: name.into(),
            filename: None,
            filename_star: None,
            content_type: None,
            extra_headers: Vec::new(),
            body: value.into(),
        }
    }

    pub fn field_with_content_type(
        name: impl Into<String>,
        value: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) -> PartSpec {
        PartSpec::Structured {
            name: name.into(),
            filename: None,
            filename_star: None,
            content_type: Some(content_type.into()),
            extra_headers: Vec::new(),
            body: value.into(),
        }
    }

    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<Vec<u8>>,
        content_type: Option<String>,
    ) -> PartSpec {
        PartSpec::Structured {
            name: name.into(),
            filename: Some(filename.into()),
            filename_star: None,
            content_type,
            extra_headers: Vec::new(),
            body: content.into(),
        }
    }
}

/// Declarative description of a complete multipart body (spec §4.3).
#[derive(Debug, Clone)]
pub struct MultipartBuilder {
    boundary: String,
    line_ending: LineEnding,
    include_final_terminator: bool,
    preamble: Option<Vec<u8>>,
    epilogue: Option<Vec<u8>>,
    parts: Vec<PartSpec>,
}

impl MultipartBuilder {
    pub fn new(boundary: impl Into<String>) -> MultipartBuilder {
        MultipartBuilder {
            boundary: boundary.into(),
            line_ending: LineEnding::Crlf,
            include_final_terminator: true,
            preamble: None,
            epilogue: None,
            parts: Vec::new(),
        }
    }

    pub fn line_ending(mut self, line_ending: LineEnding) -> MultipartBuilder {
        self.line_ending = line_ending;
        self
    }

    pub fn include_final_terminator(mut self, include: bool) -> MultipartBuilder {
        self.include_final_terminator = include;
        self
    }

    pub fn preamble(mut self, preamble: impl Into<Vec<u8>>) -> MultipartBuilder {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn epilogue(mut self, epilogue: impl Into<Vec<u8>>) -> MultipartBuilder {
        self.epilogue = Some(epilogue.into());
        self
    }

    pub fn add_part(&mut self, part: PartSpec) -> &mut Self {
        self.parts.push(part);
        self
    }

    fn build_headers(
        name: &str,
        filename: Option<&str>,
        filename_star: Option<&str>,
        content_type: Option<&str>,
        extra_headers: &[(String, String)],
        line_ending: &[u8],
    ) -> Vec<u8> {
        let mut cd = format!(r#"Content-Disposition: form-data; name="{}""#, name);
        if let Some(filename) = filename {
            let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
            cd.push_str(&format!(r#"; filename="{}""#, escaped));
        }
        if let Some(star) = filename_star {
            cd.push_str(&format!("; filename*={}", star));
        }

        let mut lines: Vec<String> = vec![cd];
        if let Some(ct) = content_type {
            lines.push(format!("Content-Type: {}", ct));
        }
        for (key, value) in extra_headers {
            lines.push(format!("{}: {}", key, value));
        }

        let mut block = Vec::new();
        for line in &lines {
            block.extend_from_slice(line.as_bytes());
            block.extend_from_slice(line_ending);
        }
        block.extend_from_slice(line_ending);
        block
    }

    /// Render the described message to bytes (spec §4.3 emission rules).
    pub fn build(&self) -> Vec<u8> {
        let mut result = Vec::new();
        let line_ending = self.line_ending.bytes();

        if let Some(preamble) = &self.preamble {
            result.extend_from_slice(preamble);
        }

        let delimiter = format!("--{}", self.boundary).into_bytes();
        let close_delimiter = format!("--{}--", self.boundary).into_bytes();

        let last_index = self.parts.len().saturating_sub(1);
        for (i, part) in self.parts.iter().enumerate() {
            result.extend_from_slice(&delimiter);
            result.extend_from_slice(line_ending);

            match part {
                PartSpec::Structured {
                    name,
                    filename,
                    filename_star,
                    content_type,
                    extra_headers,
                    body,
                } => {
                    result.extend_from_slice(&Self::build_headers(
                        name,
                        filename.as_deref(),
                        filename_star.as_deref(),
                        content_type.as_deref(),
                        extra_headers,
                        line_ending,
                    ));
                    result.extend_from_slice(body);
                }
                PartSpec::Raw(bytes) => {
                    result.extend_from_slice(bytes);
                }
            }

            if i < last_index || self.include_final_terminator {
                result.extend_from_slice(line_ending);
            }
        }

        if self.include_final_terminator {
            result.extend_from_slice(&close_delimiter);
            result.extend_from_slice(line_ending);
        }

        if let Some(epilogue) = &self.epilogue {
            result.extend_from_slice(epilogue);
        }

        result
    }
}
