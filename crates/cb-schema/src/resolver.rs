// SPDX-License-Identifier: MIT OR Apache-2.0
//! `$ref` resolution via an injected [`SchemaResolver`].

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use serde_json::Value;

/// Resolves a schema `$ref` string to its document.
pub trait SchemaResolver: Send + Sync {
    /// Resolve `reference` to a JSON Schema document.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message on failure (missing file, invalid
    /// JSON, unknown reference scheme).
    fn resolve(&self, reference: &str) -> Result<Value, String>;
}

/// A [`SchemaResolver`] that reads `<base_path>/<reference>.json`.
#[derive(Debug, Clone)]
pub struct FileSchemaResolver {
    base_path: PathBuf,
}

impl FileSchemaResolver {
    /// Create a resolver rooted at `base_path`.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

impl SchemaResolver for FileSchemaResolver {
    fn resolve(&self, reference: &str) -> Result<Value, String> {
        let path = self.base_path.join(format!("{reference}.json"));
        let text = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read schema ref `{reference}`: {e}"))?;
        serde_json::from_str(&text)
            .map_err(|e| format!("invalid JSON in schema ref `{reference}`: {e}"))
    }
}

/// Maximum `$ref` nesting depth before [`resolve_refs`] gives up and
/// reports a cycle.
const MAX_REF_DEPTH: usize = 32;

/// Recursively replace every `{"$ref": "..."}` object in `schema` with the
/// document `resolver` returns for that reference, resolving refs inside
/// the substituted document too.
///
/// # Errors
///
/// Returns a message naming the failing reference, or a cycle/depth-limit
/// message if refs nest more than [`MAX_REF_DEPTH`] deep.
pub fn resolve_refs(schema: &Value, resolver: &dyn SchemaResolver) -> Result<Value, String> {
    let mut seen = HashSet::new();
    resolve_inner(schema, resolver, &mut seen, 0)
}

fn resolve_inner(
    value: &Value,
    resolver: &dyn SchemaResolver,
    seen: &mut HashSet<String>,
    depth: usize,
) -> Result<Value, String> {
    if depth > MAX_REF_DEPTH {
        return Err("schema $ref nesting exceeds the maximum depth".to_string());
    }
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if !seen.insert(reference.clone()) {
                    return Err(format!("cyclic schema $ref: {reference}"));
                }
                let resolved = resolver.resolve(reference)?;
                let out = resolve_inner(&resolved, resolver, seen, depth + 1);
                seen.remove(reference);
                return out;
            }
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k.clone(), resolve_inner(v, resolver, seen, depth)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(resolve_inner(item, resolver, seen, depth)?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StaticResolver;
    impl SchemaResolver for StaticResolver {
        fn resolve(&self, reference: &str) -> Result<Value, String> {
            match reference {
                "address" => Ok(json!({"type": "object", "properties": {"city": {"type": "string"}}})),
                other => Err(format!("no such ref: {other}")),
            }
        }
    }

    #[test]
    fn substitutes_refs() {
        let schema = json!({
            "type": "object",
            "properties": {"home": {"$ref": "address"}}
        });
        let resolved = resolve_refs(&schema, &StaticResolver).unwrap();
        assert_eq!(
            resolved["properties"]["home"]["properties"]["city"]["type"],
            json!("string")
        );
    }

    #[test]
    fn propagates_resolver_errors() {
        let schema = json!({"$ref": "missing"});
        let err = resolve_refs(&schema, &StaticResolver).unwrap_err();
        assert!(err.contains("no such ref"));
    }

    #[test]
    fn file_resolver_reads_ref_from_base_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("address.json"),
            r#"{"type": "object", "properties": {"city": {"type": "string"}}}"#,
        )
        .unwrap();

        let resolver = FileSchemaResolver::new(dir.path());
        let resolved = resolver.resolve("address").unwrap();
        assert_eq!(resolved["properties"]["city"]["type"], json!("string"));
    }

    #[test]
    fn file_resolver_reports_missing_ref() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FileSchemaResolver::new(dir.path());
        let err = resolver.resolve("missing").unwrap_err();
        assert!(err.contains("missing"));
    }

    #[test]
    fn file_resolver_reports_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let resolver = FileSchemaResolver::new(dir.path());
        let err = resolver.resolve("broken").unwrap_err();
        assert!(err.contains("invalid JSON"));
    }

    #[test]
    fn detects_cycles() {
        struct CyclicResolver;
        impl SchemaResolver for CyclicResolver {
            fn resolve(&self, _reference: &str) -> Result<Value, String> {
                Ok(json!({"$ref": "self"}))
            }
        }
        let schema = json!({"$ref": "self"});
        let err = resolve_refs(&schema, &CyclicResolver).unwrap_err();
        assert!(err.contains("cyclic"));
    }
}
