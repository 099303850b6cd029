// SPDX-License-Identifier: MIT OR Apache-2.0
//! `resolveArgumentBinding` and `applyEdgeType`: turning a declared
//! [`ArgumentBinding`] into a concrete value against a run's execution
//! context.

use std::collections::BTreeMap;

use cb_cap::{CapArg, SettingsProvider};
use cb_plan::{ArgumentBinding, EdgeType};
use cb_resolve::ResolvedFile;
use serde_json::Value;

/// Everything a node needs to resolve its argument bindings: the run's
/// input files, prior node outputs, plan metadata, slot values, and an
/// optional settings provider consulted ahead of environment variables.
pub struct ExecContext<'a> {
    /// The run's resolved input files, in resolution order.
    pub input_files: &'a [ResolvedFile],
    /// Outputs of nodes that have already run, keyed by node id.
    pub previous_outputs: &'a BTreeMap<String, Value>,
    /// The plan's free-form metadata.
    pub metadata: &'a BTreeMap<String, Value>,
    /// Caller-supplied slot values, keyed by slot name.
    pub slot_values: &'a BTreeMap<String, Vec<u8>>,
    /// Consulted before environment variables for `FromEnv` bindings.
    pub settings_provider: Option<&'a dyn SettingsProvider>,
}

/// Decode raw bytes into the value downstream nodes observe: a parsed
/// JSON document when the bytes are both UTF-8 and valid JSON, `{text:
/// ...}` when UTF-8 but not JSON, or `null` for non-UTF-8 bytes (their
/// raw form is preserved separately as the node's binary output).
#[must_use]
pub fn bytes_to_value(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => serde_json::from_str(text).unwrap_or_else(|_| serde_json::json!({ "text": text })),
        Err(_) => Value::Null,
    }
}

/// Resolve `binding` to a concrete value using `arg`'s declared
/// requiredness/default and `ctx`'s run state.
///
/// # Errors
///
/// Returns a human-readable message when a required source is absent.
pub fn resolve_argument_binding(
    binding: &ArgumentBinding,
    arg: &CapArg,
    ctx: &ExecContext<'_>,
) -> Result<Value, String> {
    match binding {
        ArgumentBinding::FromInputFile => ctx
            .input_files
            .first()
            .map(|file| Value::String(file.path.display().to_string()))
            .ok_or_else(|| "no input files available for a FromInputFile binding".to_string()),
        ArgumentBinding::FromSlot { name } => match ctx.slot_values.get(name) {
            Some(bytes) => Ok(bytes_to_value(bytes)),
            None if arg.required => Err(format!("missing required slot `{name}`")),
            None => Ok(arg.default_value.clone().unwrap_or(Value::Null)),
        },
        ArgumentBinding::FromNode { node, edge_type } => {
            let source = ctx
                .previous_outputs
                .get(node)
                .ok_or_else(|| format!("node `{node}` has no recorded output"))?;
            apply_edge_type(source, edge_type)
        }
        ArgumentBinding::Literal { value } => Ok(value.clone()),
        ArgumentBinding::FromMetadata { key } => match ctx.metadata.get(key) {
            Some(value) => Ok(value.clone()),
            None if arg.required => Err(format!("missing required metadata key `{key}`")),
            None => Ok(arg.default_value.clone().unwrap_or(Value::Null)),
        },
        ArgumentBinding::FromEnv { name } => {
            let resolved = ctx
                .settings_provider
                .and_then(|provider| provider.get_setting(name))
                .or_else(|| std::env::var(name).ok());
            match resolved {
                Some(value) => Ok(Value::String(value)),
                None if arg.required => {
                    Err(format!("missing required environment variable `{name}`"))
                }
                None => Ok(arg.default_value.clone().unwrap_or(Value::Null)),
            }
        }
        ArgumentBinding::Default => match &arg.default_value {
            Some(value) => Ok(value.clone()),
            None if arg.required => {
                Err(format!("argument `{}` has no declared default", arg.name))
            }
            None => Ok(Value::Null),
        },
    }
}

/// Project `source` according to `edge_type`.
///
/// # Errors
///
/// Returns a human-readable message when the projection does not apply
/// to `source`'s shape (a missing field, a non-object/array traversal,
/// or an out-of-bounds index).
pub fn apply_edge_type(source: &Value, edge_type: &EdgeType) -> Result<Value, String> {
    match edge_type {
        EdgeType::Direct | EdgeType::Iteration | EdgeType::Collection => Ok(source.clone()),
        EdgeType::JsonField { name } => source
            .as_object()
            .ok_or_else(|| format!("cannot extract field `{name}` from a non-object value"))?
            .get(name)
            .cloned()
            .ok_or_else(|| format!("missing field `{name}`")),
        EdgeType::JsonPath { path } => apply_json_path(source, path),
    }
}

fn apply_json_path(value: &Value, path: &str) -> Result<Value, String> {
    let mut current = value.clone();
    for raw_segment in path.split('.') {
        if raw_segment.is_empty() {
            continue;
        }
        let (name, indices) = parse_path_segment(raw_segment)?;
        if let Some(name) = name {
            current = current
                .as_object()
                .ok_or_else(|| format!("cannot traverse non-object at `{name}`"))?
                .get(&name)
                .cloned()
                .ok_or_else(|| format!("missing field `{name}`"))?;
        }
        for index in indices {
            current = current
                .as_array()
                .ok_or_else(|| format!("cannot index non-array at `[{index}]`"))?
                .get(index)
                .cloned()
                .ok_or_else(|| format!("index `{index}` out of bounds"))?;
        }
    }
    Ok(current)
}

fn parse_path_segment(segment: &str) -> Result<(Option<String>, Vec<usize>), String> {
    let (name_part, mut rest) = match segment.find('[') {
        Some(pos) => (&segment[..pos], &segment[pos..]),
        None => (segment, ""),
    };
    let name = (!name_part.is_empty()).then(|| name_part.to_string());

    let mut indices = Vec::new();
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(format!("malformed path segment `{segment}`"));
        }
        let close = rest
            .find(']')
            .ok_or_else(|| format!("unterminated index in `{segment}`"))?;
        let index: usize = rest[1..close]
            .parse()
            .map_err(|_| format!("non-numeric index in `{segment}`"))?;
        indices.push(index);
        rest = &rest[close + 1..];
    }
    Ok((name, indices))
}
