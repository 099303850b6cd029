// SPDX-License-Identifier: MIT OR Apache-2.0
//! Resolves a media URN to the [`MediaSpec`] that describes it.

use cb_cap::{MediaSpec, BUILTIN_SCALAR_MEDIA};
use cb_error::MediaSpecError;
use serde_json::{json, Value};

/// A set of [`MediaSpec`]s plus the synthetic specs for built-in scalar
/// media (`media:str`, `media:int`, ...).
#[derive(Debug, Clone, Default)]
pub struct MediaSpecRegistry {
    specs: Vec<MediaSpec>,
}

impl MediaSpecRegistry {
    /// Build a registry from a caller-supplied list of media specs.
    ///
    /// # Errors
    ///
    /// Returns [`MediaSpecError::DuplicateMediaUrn`] if two specs share a
    /// URN.
    pub fn new(specs: Vec<MediaSpec>) -> Result<Self, MediaSpecError> {
        let mut seen = std::collections::HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.urn.as_str()) {
                return Err(MediaSpecError::DuplicateMediaUrn {
                    urn: spec.urn.clone(),
                });
            }
        }
        Ok(Self { specs })
    }

    /// Resolve `urn` to its [`MediaSpec`], checking local specs first and
    /// falling back to the built-in scalar table.
    ///
    /// # Errors
    ///
    /// Returns [`MediaSpecError::UnresolvableMediaUrn`] if `urn` matches
    /// neither.
    pub fn resolve(&self, urn: &str) -> Result<MediaSpec, MediaSpecError> {
        if let Some(spec) = self.specs.iter().find(|s| s.urn == urn) {
            return Ok(spec.clone());
        }
        if let Some(spec) = builtin_spec(urn) {
            return Ok(spec);
        }
        Err(MediaSpecError::UnresolvableMediaUrn { urn: urn.into() })
    }
}

/// The synthetic [`MediaSpec`] for a built-in scalar media URN, if `urn`
/// names one.
#[must_use]
pub fn builtin_spec(urn: &str) -> Option<MediaSpec> {
    if !BUILTIN_SCALAR_MEDIA.contains(&urn) {
        return None;
    }
    let schema: Option<Value> = match urn {
        "media:str" => Some(json!({"type": "string"})),
        "media:int" => Some(json!({"type": "integer"})),
        "media:num" => Some(json!({"type": "number"})),
        "media:bool" => Some(json!({"type": "boolean"})),
        "media:obj" => Some(json!({"type": "object"})),
        "media:str-array" => Some(json!({"type": "array", "items": {"type": "string"}})),
        "media:void" => Some(json!({"type": "null"})),
        // media:binary carries no JSON Schema: it is opaque bytes.
        _ => None,
    };
    Some(MediaSpec {
        urn: urn.to_string(),
        media_type: builtin_mime(urn).to_string(),
        profile_uri: String::new(),
        title: None,
        description: None,
        schema,
        validation: None,
        metadata: None,
        extensions: vec![],
    })
}

fn builtin_mime(urn: &str) -> &'static str {
    match urn {
        "media:str" => "text/plain",
        "media:int" | "media:num" => "application/x-number",
        "media:bool" => "application/x-boolean",
        "media:obj" => "application/json",
        "media:str-array" => "application/json",
        "media:binary" => "application/octet-stream",
        "media:void" => "application/x-void",
        _ => "application/octet-stream",
    }
}
