// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! JSON schema *application* (schema definitions themselves are out of
//! scope — spec §1). Mirrors `validate-suite.py`'s `HAS_JSONSCHEMA`
//! optional-import pattern as a Cargo feature: with `schema-validation`
//! enabled, [`validate`] actually checks; otherwise it reports itself
//! unavailable and callers fall back to a warning.

/// Whether this build was compiled with schema-validation support.
pub fn schema_available() -> bool {
    cfg!(feature = "schema-validation")
}

#[cfg(feature = "schema-validation")]
pub fn validate(data: &serde_json::Value, schema: &serde_json::Value) -> Result<(), String> {
    let compiled = jsonschema::JSONSchema::compile(schema).map_err(|e| e.to_string())?;
    match compiled.validate(data) {
        Ok(()) => Ok(()),
        Err(errors) => {
            let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
            Err(messages.join("; "))
        }
    }
}

#[cfg(not(feature = "schema-validation"))]
pub fn validate(_data: &serde_json::Value, _schema: &serde_json::Value) -> Result<(), String> {
    Err("jsonschema validation support not compiled in".to_string())
}
