// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-node lifecycle and the aggregate result of one plan run.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node's position in the `Pending → Ready → Running → (Succeeded |
/// Failed)` lifecycle. A failed run's unreached nodes settle in
/// `Skipped`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Not yet considered.
    Pending,
    /// Its dependencies have all succeeded; eligible to run.
    Ready,
    /// Currently dispatching.
    Running,
    /// Completed and produced an output value.
    Succeeded,
    /// Completed with an error.
    Failed,
    /// Never run because an earlier node in the plan failed.
    Skipped,
}

/// The outcome of running a single node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    /// The node's id.
    pub node_id: String,
    /// Final lifecycle state.
    pub state: NodeState,
    /// The node's output value, when it reached `Succeeded`.
    #[serde(default)]
    pub value: Option<Value>,
    /// Wall-clock time spent on this node. Zero for `Skipped` nodes.
    pub duration: Duration,
    /// The error message, when the node reached `Failed`.
    #[serde(default)]
    pub error: Option<String>,
}

impl NodeResult {
    /// Build a `Succeeded` result.
    #[must_use]
    pub fn succeeded(node_id: impl Into<String>, value: Value, duration: Duration) -> Self {
        Self {
            node_id: node_id.into(),
            state: NodeState::Succeeded,
            value: Some(value),
            duration,
            error: None,
        }
    }

    /// Build a `Failed` result.
    #[must_use]
    pub fn failed(node_id: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            node_id: node_id.into(),
            state: NodeState::Failed,
            value: None,
            duration,
            error: Some(error.into()),
        }
    }

    /// Build a `Skipped` result.
    #[must_use]
    pub fn skipped(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            state: NodeState::Skipped,
            value: None,
            duration: Duration::ZERO,
            error: None,
        }
    }
}

/// The structured result of running a [`crate::PlanExecutor`] to
/// completion or first failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainExecutionResult {
    /// `true` iff every node reached `Succeeded`.
    pub success: bool,
    /// One entry per node the run reached, in execution order.
    pub node_results: Vec<NodeResult>,
    /// Named outputs, keyed by each `Output` node's `output_name`.
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
    /// The last `Output` node's value reached, if any.
    #[serde(default)]
    pub final_output: Option<Value>,
    /// An aggregate message naming the failing node, when `success` is
    /// `false`.
    #[serde(default)]
    pub error: Option<String>,
}
