// SPDX-License-Identifier: MIT OR Apache-2.0
//! Draft-7 JSON Schema compilation and validation, with a content-addressed
//! compile cache.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use jsonschema::{Draft, Validator};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::resolver::{resolve_refs, SchemaResolver};

/// `true` iff `schema` describes a structured value (`object` or `array`
/// at the top level, directly or via `type: [...]`). Scalars are not
/// schema-validated; only their media URN needs to match.
#[must_use]
pub fn is_structured_schema(schema: &Value) -> bool {
    match schema.get("type") {
        Some(Value::String(t)) => t == "object" || t == "array",
        Some(Value::Array(types)) => types
            .iter()
            .any(|t| t == "object" || t == "array"),
        _ => schema.get("properties").is_some() || schema.get("items").is_some(),
    }
}

fn content_hash(schema: &Value) -> String {
    let bytes = serde_json::to_vec(schema).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    format!("{digest:x}")
}

/// Compiles Draft-7 schemas and validates values against them, caching
/// compiled [`Validator`]s by the sha256 of their fully `$ref`-resolved
/// form so a schema referenced by many caps is compiled once.
pub struct SchemaValidator {
    resolver: Option<Arc<dyn SchemaResolver>>,
    cache: RwLock<HashMap<String, Arc<Validator>>>,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("has_resolver", &self.resolver.is_some())
            .field("cached_schemas", &self.cache.read().map(|c| c.len()).unwrap_or(0))
            .finish()
    }
}

impl SchemaValidator {
    /// Create a validator with no `$ref` resolver; schemas containing
    /// `$ref` will fail to compile.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolver: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a validator that resolves `$ref`s through `resolver`.
    #[must_use]
    pub fn with_resolver(resolver: Arc<dyn SchemaResolver>) -> Self {
        Self {
            resolver: Some(resolver),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Compile `schema`, reusing a cached [`Validator`] when an
    /// identical (post-`$ref`-resolution) schema was compiled before.
    ///
    /// # Errors
    ///
    /// Returns a message on `$ref` resolution failure or on Draft-7
    /// compile failure.
    pub fn compile(&self, schema: &Value) -> Result<Arc<Validator>, String> {
        let resolved = match &self.resolver {
            Some(resolver) => resolve_refs(schema, resolver.as_ref())?,
            None => schema.clone(),
        };
        let key = content_hash(&resolved);

        if let Some(hit) = self.cache.read().expect("cache lock poisoned").get(&key) {
            trace!(key = %key, "schema cache hit");
            return Ok(Arc::clone(hit));
        }

        let compiled = jsonschema::options()
            .with_draft(Draft::Draft7)
            .build(&resolved)
            .map_err(|e| format!("schema failed to compile: {e}"))?;
        let compiled = Arc::new(compiled);

        trace!(key = %key, "schema compiled and cached");
        self.cache
            .write()
            .expect("cache lock poisoned")
            .insert(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Validate `value` against `schema`, returning every violation
    /// message (not just the first).
    ///
    /// Per the structured/scalar split: callers should only invoke this
    /// for arguments/outputs whose declared media is structured
    /// ([`is_structured_schema`]); scalars pass through unvalidated.
    ///
    /// # Errors
    ///
    /// Returns a message if `schema` fails to compile.
    pub fn validate_value(&self, schema: &Value, value: &Value) -> Result<Vec<String>, String> {
        let compiled = self.compile(schema)?;
        let violations: Vec<String> = compiled
            .iter_errors(value)
            .map(|e| e.to_string())
            .collect();
        Ok(violations)
    }

    /// `true` iff `value` satisfies `schema`.
    ///
    /// # Errors
    ///
    /// Returns a message if `schema` fails to compile.
    pub fn is_valid(&self, schema: &Value, value: &Value) -> Result<bool, String> {
        Ok(self.compile(schema)?.is_valid(value))
    }

    /// Number of distinct compiled schemas currently cached.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.read().expect("cache lock poisoned").len()
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}
