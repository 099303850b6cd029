// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! The plan executor: drives a validated [`cb_plan::Plan`] to completion
//! one node at a time, in topological order, dispatching `Cap` nodes
//! through an injected [`CapExecutor`].
//!
//! Execution is single-threaded and cooperative: suspension occurs only
//! at cap dispatch (`CapExecutor::execute_cap`'s `.await`), matching how
//! `abp_runtime::Pipeline` drives its `PipelineStage`s sequentially.

mod binding;
mod result;

#[cfg(any(test, feature = "testing"))]
pub mod stub;

use std::collections::BTreeMap;
use std::time::Instant;

use cb_cap::{Cap, CapArgument, CapExecutor, SettingsProvider};
use cb_error::PlannerError;
use cb_plan::{Node, Plan};
use cb_resolve::ResolvedFile;
use cb_schema::{is_structured_schema, MediaSpecRegistry, SchemaValidator};
use serde_json::Value;
use tracing::{debug, warn};

pub use binding::{apply_edge_type, bytes_to_value, resolve_argument_binding, ExecContext};
pub use result::{ChainExecutionResult, NodeResult, NodeState};

/// Drives one [`Plan`] run against an injected [`CapExecutor`].
pub struct PlanExecutor {
    executor: Box<dyn CapExecutor>,
    plan: Plan,
    input_files: Vec<ResolvedFile>,
    slot_values: BTreeMap<String, Vec<u8>>,
    settings_provider: Option<Box<dyn SettingsProvider>>,
    schema_validator: SchemaValidator,
}

impl PlanExecutor {
    /// Build an executor for `plan` against `executor`, with the run's
    /// resolved input files and optional slot values/settings provider.
    #[must_use]
    pub fn new(
        executor: Box<dyn CapExecutor>,
        plan: Plan,
        input_files: Vec<ResolvedFile>,
        slot_values: BTreeMap<String, Vec<u8>>,
        settings_provider: Option<Box<dyn SettingsProvider>>,
    ) -> Self {
        Self {
            executor,
            plan,
            input_files,
            slot_values,
            settings_provider,
            schema_validator: SchemaValidator::new(),
        }
    }

    /// Validate the plan, compute its topological order, then run each
    /// node in turn until completion or the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError`] if the plan itself is structurally
    /// invalid or contains a cycle — a static failure distinct from a
    /// runtime node failure, which is instead captured in the returned
    /// [`ChainExecutionResult`].
    pub async fn run(&self) -> Result<ChainExecutionResult, PlannerError> {
        let lookup = |urn: &str| self.executor.get_cap(urn).ok();
        cb_plan::validate(&self.plan, &lookup)?;
        let order = cb_plan::topological_order(&self.plan)?;

        let mut node_outputs: BTreeMap<String, Value> = BTreeMap::new();
        let mut node_results = Vec::with_capacity(order.len());
        let mut outputs: BTreeMap<String, Value> = BTreeMap::new();
        let mut final_output = None;
        let mut success = true;
        let mut failure_message = None;

        for (position, node_id) in order.iter().enumerate() {
            let node = self
                .plan
                .nodes
                .get(node_id)
                .expect("topological_order only yields declared nodes");

            debug!(node = %node_id, "running node");
            let started = Instant::now();
            match self.run_node(node_id, node, &node_outputs).await {
                Ok(value) => {
                    if let Node::Output {
                        output_name,
                        ..
                    } = node
                    {
                        outputs.insert(output_name.clone(), value.clone());
                        final_output = Some(value.clone());
                    }
                    node_outputs.insert(node_id.clone(), value.clone());
                    node_results.push(NodeResult::succeeded(node_id.as_str(), value, started.elapsed()));
                }
                Err(message) => {
                    warn!(node = %node_id, error = %message, "node failed");
                    node_results.push(NodeResult::failed(node_id.as_str(), message.clone(), started.elapsed()));
                    success = false;
                    failure_message = Some(format!("node `{node_id}` failed: {message}"));
                    for skipped_id in &order[position + 1..] {
                        node_results.push(NodeResult::skipped(skipped_id.as_str()));
                    }
                    break;
                }
            }
        }

        Ok(ChainExecutionResult {
            success,
            node_results,
            outputs,
            final_output,
            error: failure_message,
        })
    }

    async fn run_node(
        &self,
        _node_id: &str,
        node: &Node,
        node_outputs: &BTreeMap<String, Value>,
    ) -> Result<Value, String> {
        match node {
            Node::InputSlot { .. } => Ok(self.input_slot_value()),
            Node::Cap {
                cap_urn,
                preferred_cap,
                arg_bindings,
            } => {
                self.run_cap_node(cap_urn, preferred_cap.as_deref(), arg_bindings, node_outputs)
                    .await
            }
            Node::ForEach {
                input_node,
                body_entry,
                body_exit,
            } => {
                let source = node_outputs
                    .get(input_node)
                    .ok_or_else(|| format!("node `{input_node}` has no recorded output"))?;
                let items = match source {
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                };
                Ok(serde_json::json!({
                    "iteration_count": items.len(),
                    "items": items,
                    "body_entry": body_entry,
                    "body_exit": body_exit,
                }))
            }
            Node::Collect { input_nodes } => {
                let mut collected = Vec::new();
                for input in input_nodes {
                    let value = node_outputs
                        .get(input)
                        .ok_or_else(|| format!("node `{input}` has no recorded output"))?;
                    match value {
                        Value::Array(items) => collected.extend(items.clone()),
                        other => collected.push(other.clone()),
                    }
                }
                let count = collected.len();
                Ok(serde_json::json!({ "collected": collected, "count": count }))
            }
            Node::Output { source_node, .. } => node_outputs
                .get(source_node)
                .cloned()
                .ok_or_else(|| format!("node `{source_node}` has no recorded output")),
        }
    }

    fn input_slot_value(&self) -> Value {
        match self.input_files.as_slice() {
            [single] => serde_json::to_value(single).unwrap_or(Value::Null),
            many => serde_json::to_value(many).unwrap_or(Value::Null),
        }
    }

    async fn run_cap_node(
        &self,
        cap_urn: &str,
        preferred_cap: Option<&str>,
        arg_bindings: &BTreeMap<String, cb_plan::ArgumentBinding>,
        node_outputs: &BTreeMap<String, Value>,
    ) -> Result<Value, String> {
        if !self.executor.has_cap(cap_urn) {
            return Err(format!("no cap registered for `{cap_urn}`"));
        }
        let cap = self.executor.get_cap(cap_urn)?;

        let metadata = &self.plan.metadata;
        let ctx = ExecContext {
            input_files: &self.input_files,
            previous_outputs: node_outputs,
            metadata,
            slot_values: &self.slot_values,
            settings_provider: self.settings_provider.as_deref(),
        };

        let mut arguments = Vec::with_capacity(cap.args.len());
        for arg in &cap.args {
            let value = match arg_bindings.get(&arg.name) {
                Some(binding) => resolve_argument_binding(binding, arg, &ctx)?,
                None => match &arg.default_value {
                    Some(default) => default.clone(),
                    None if arg.required => {
                        return Err(format!("no binding for required argument `{}`", arg.name))
                    }
                    None => Value::Null,
                },
            };
            self.validate_argument(&cap, arg, &value)?;
            arguments.push(CapArgument {
                media_urn: arg.media_urn.clone(),
                value,
            });
        }

        let raw = self
            .executor
            .execute_cap(cap_urn, arguments, preferred_cap)
            .await?;
        Ok(bytes_to_value(&raw))
    }

    fn validate_argument(&self, cap: &Cap, arg: &cb_cap::CapArg, value: &Value) -> Result<(), String> {
        let registry = MediaSpecRegistry::new(cap.media_specs.clone())
            .map_err(|e| format!("invalid media specs on cap `{}`: {e}", cap.urn))?;
        let Ok(spec) = registry.resolve(&arg.media_urn) else {
            return Ok(());
        };
        let Some(schema) = &spec.schema else {
            return Ok(());
        };
        if !is_structured_schema(schema) {
            return Ok(());
        }
        let violations = self
            .schema_validator
            .validate_value(schema, value)
            .map_err(|e| format!("schema compilation failed for `{}`: {e}", arg.media_urn))?;
        if violations.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "argument `{}` failed schema validation: {}",
                arg.name,
                violations.join("; ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubCapExecutor;
    use cb_cap::{ArgSource, Cap, CapArg};
    use cb_plan::{ArgumentBinding, Edge, EdgeType};
    use cb_urn::CapUrn;
    use serde_json::json;

    fn echo_cap() -> Cap {
        Cap {
            urn: CapUrn::parse("cap:op=echo;in=media:obj;out=media:obj").unwrap(),
            title: None,
            command: None,
            description: None,
            metadata: BTreeMap::new(),
            media_specs: vec![],
            args: vec![CapArg {
                name: "doc".into(),
                media_urn: "media:obj".into(),
                required: true,
                sources: vec![ArgSource::Stdin],
                description: None,
                validation: None,
                default_value: None,
            }],
            output: None,
            accepts_stdin: true,
            metadata_json: None,
        }
    }

    fn three_node_plan(cap_urn: &str) -> Plan {
        let mut nodes = BTreeMap::new();
        nodes.insert("in".to_string(), Node::InputSlot { slot_name: "in".into() });
        let mut arg_bindings = BTreeMap::new();
        arg_bindings.insert("doc".to_string(), ArgumentBinding::FromSlot { name: "in".into() });
        nodes.insert(
            "c1".to_string(),
            Node::Cap {
                cap_urn: cap_urn.to_string(),
                preferred_cap: None,
                arg_bindings,
            },
        );
        nodes.insert(
            "out".to_string(),
            Node::Output {
                output_name: "out".into(),
                source_node: "c1".into(),
            },
        );
        Plan {
            nodes,
            edges: vec![
                Edge {
                    from: "in".into(),
                    to: "c1".into(),
                    edge_type: EdgeType::Direct,
                },
                Edge {
                    from: "c1".into(),
                    to: "out".into(),
                    edge_type: EdgeType::Direct,
                },
            ],
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn s6_plan_execution_succeeds() {
        let cap = echo_cap();
        let executor = StubCapExecutor::new().with_cap(cap.clone(), br#"{"ok":true}"#.to_vec());
        let plan = three_node_plan(&cap.urn.to_string());

        let mut slot_values = BTreeMap::new();
        slot_values.insert("in".to_string(), b"whatever".to_vec());

        let runner = PlanExecutor::new(Box::new(executor), plan, vec![], slot_values, None);
        let result = runner.run().await.unwrap();

        assert!(result.success);
        assert_eq!(result.node_results.len(), 3);
        assert_eq!(result.final_output, Some(json!({"ok": true})));
        assert_eq!(result.outputs.get("out"), Some(&json!({"ok": true})));
    }

    #[tokio::test]
    async fn runtime_dispatch_failure_fails_node_and_skips_downstream() {
        let cap = echo_cap();
        let executor = StubCapExecutor::new().with_unresponsive_cap(cap.clone());
        let plan = three_node_plan(&cap.urn.to_string());

        let mut slot_values = BTreeMap::new();
        slot_values.insert("in".to_string(), b"whatever".to_vec());

        let runner = PlanExecutor::new(Box::new(executor), plan, vec![], slot_values, None);
        let result = runner.run().await.unwrap();

        assert!(!result.success);
        assert!(result.error.as_ref().unwrap().contains("c1"));
        let out_result = result
            .node_results
            .iter()
            .find(|r| r.node_id == "out")
            .unwrap();
        assert_eq!(out_result.state, NodeState::Skipped);
    }

    #[tokio::test]
    async fn law7_plan_validation_failure_is_returned_before_any_node_runs() {
        let executor = StubCapExecutor::new();
        let mut plan = three_node_plan("cap:op=nonexistent");
        // Dangling edge makes the plan itself invalid.
        plan.edges.push(Edge {
            from: "out".into(),
            to: "missing".into(),
            edge_type: EdgeType::Direct,
        });

        let runner = PlanExecutor::new(Box::new(executor), plan, vec![], BTreeMap::new(), None);
        assert!(matches!(runner.run().await, Err(PlannerError::UnknownNode { .. })));
    }

    #[tokio::test]
    async fn unresolvable_cap_is_a_static_validation_failure() {
        let executor = StubCapExecutor::new();
        let plan = three_node_plan("cap:op=nonexistent");

        let runner = PlanExecutor::new(Box::new(executor), plan, vec![], BTreeMap::new(), None);
        assert!(matches!(runner.run().await, Err(PlannerError::Internal { .. })));
    }
}
