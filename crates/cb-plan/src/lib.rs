// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! The execution-plan DAG: nodes, edges, argument bindings, structural
//! validation, and deterministic topological ordering.
//!
//! A [`Plan`] is built once (typically by a builder this crate treats as
//! an external collaborator) and then frozen; nothing here mutates a
//! `Plan` in place.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use cb_cap::Cap;
use cb_error::PlannerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a downstream node's input is derived from an upstream node's
/// output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeType {
    /// Pass the upstream value through unchanged.
    Direct,
    /// Extract a single object field.
    JsonField {
        /// The field to extract.
        name: String,
    },
    /// Extract a value via a dotted path with optional `[index]`
    /// segments.
    JsonPath {
        /// The dotted path expression.
        path: String,
    },
    /// The value from one iteration of a [`Node::ForEach`] body.
    Iteration,
    /// The flattened, concatenated outputs of a [`Node::Collect`].
    Collection,
}

/// A directed edge between two plan nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id.
    pub from: String,
    /// Destination node id.
    pub to: String,
    /// How the destination derives its input from the source's output.
    pub edge_type: EdgeType,
}

/// Where a [`Node::Cap`]'s argument value is drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgumentBinding {
    /// The single or first resolved input file.
    FromInputFile,
    /// A named entry in the executor's `slotValues`.
    FromSlot {
        /// Slot name.
        name: String,
    },
    /// A prior node's output, projected via `edge_type`.
    FromNode {
        /// The producing node's id.
        node: String,
        /// How to project the producing node's output.
        edge_type: EdgeType,
    },
    /// A fixed JSON value.
    Literal {
        /// The fixed value.
        value: Value,
    },
    /// A key in the plan's `metadata` map.
    FromMetadata {
        /// Metadata key.
        key: String,
    },
    /// An environment variable (consulting a `SettingsProvider` first).
    FromEnv {
        /// Variable name.
        name: String,
    },
    /// The cap's own declared default value.
    Default,
}

/// One node of a [`Plan`]'s execution graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// A named slot bound to one of the run's resolved input files.
    InputSlot {
        /// The slot's name.
        slot_name: String,
    },
    /// Dispatches a cap.
    Cap {
        /// The cap URN pattern this node requests.
        cap_urn: String,
        /// A concrete cap URN to prefer over the best-match result, if
        /// any.
        #[serde(default)]
        preferred_cap: Option<String>,
        /// Bindings for the cap's declared arguments, by name.
        #[serde(default)]
        arg_bindings: BTreeMap<String, ArgumentBinding>,
    },
    /// Iterates over a list-shaped upstream output.
    ForEach {
        /// Node producing the list to iterate over.
        input_node: String,
        /// First node of the loop body.
        body_entry: String,
        /// Last node of the loop body.
        body_exit: String,
    },
    /// Concatenates the outputs of several nodes, flattening one level
    /// of arrays.
    Collect {
        /// Nodes whose outputs are concatenated.
        input_nodes: Vec<String>,
    },
    /// Names a node's output as one of the plan's final results.
    Output {
        /// The output's name.
        output_name: String,
        /// The node whose output is published under `output_name`.
        source_node: String,
    },
}

/// An execution plan: a DAG of nodes connected by edges, plus free-form
/// metadata consulted by `FromMetadata` bindings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Nodes by id.
    pub nodes: BTreeMap<String, Node>,
    /// Edges between nodes.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Free-form plan metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

/// Validate `plan`'s structural invariants.
///
/// `cap_lookup` resolves a [`Node::Cap`]'s cap URN (preferring
/// `preferred_cap` when set) to its [`Cap`] definition — ordinarily
/// backed by a `cb-registry` `Block`, injected so this crate does not
/// depend on the registry crate.
///
/// # Errors
///
/// Returns [`PlannerError::UnknownNode`] for a dangling edge endpoint or
/// node reference, [`PlannerError::CycleDetected`] if the edge graph has
/// a cycle, [`PlannerError::MissingBinding`] for an unfilled required
/// argument, or [`PlannerError::Internal`] for any other structural
/// violation (an unresolvable cap, a duplicate or empty output name).
pub fn validate(plan: &Plan, cap_lookup: &dyn Fn(&str) -> Option<Cap>) -> Result<(), PlannerError> {
    for edge in &plan.edges {
        require_node(plan, &edge.from)?;
        require_node(plan, &edge.to)?;
    }

    check_acyclic(plan)?;

    for (node_id, node) in &plan.nodes {
        match node {
            Node::InputSlot { .. } => {}
            Node::ForEach {
                input_node,
                body_entry,
                body_exit,
            } => {
                require_node(plan, input_node)?;
                require_node(plan, body_entry)?;
                require_node(plan, body_exit)?;
            }
            Node::Collect { input_nodes } => {
                for input in input_nodes {
                    require_node(plan, input)?;
                }
            }
            Node::Output {
                output_name,
                source_node,
            } => {
                if output_name.is_empty() {
                    return Err(PlannerError::Internal {
                        reason: format!("output node `{node_id}` has an empty output name"),
                    });
                }
                require_node(plan, source_node)?;
            }
            Node::Cap {
                cap_urn,
                preferred_cap,
                arg_bindings,
            } => {
                let lookup_urn = preferred_cap.as_deref().unwrap_or(cap_urn);
                let cap = cap_lookup(lookup_urn).ok_or_else(|| PlannerError::Internal {
                    reason: format!("node `{node_id}` references unresolvable cap `{lookup_urn}`"),
                })?;
                for key in arg_bindings.keys() {
                    if cap.arg(key).is_none() {
                        return Err(PlannerError::Internal {
                            reason: format!(
                                "node `{node_id}` binds unknown argument `{key}` for cap `{lookup_urn}`"
                            ),
                        });
                    }
                }
                for arg in &cap.args {
                    let has_binding = arg_bindings.contains_key(&arg.name);
                    let has_default = arg.default_value.is_some();
                    if arg.required && !has_binding && !has_default {
                        return Err(PlannerError::MissingBinding {
                            node: node_id.clone(),
                            arg: arg.name.clone(),
                        });
                    }
                }
            }
        }
    }

    let mut output_names = HashSet::new();
    for node in plan.nodes.values() {
        if let Node::Output { output_name, .. } = node {
            if !output_names.insert(output_name.clone()) {
                return Err(PlannerError::Internal {
                    reason: format!("duplicate output name `{output_name}`"),
                });
            }
        }
    }

    Ok(())
}

fn require_node(plan: &Plan, node_id: &str) -> Result<(), PlannerError> {
    if plan.nodes.contains_key(node_id) {
        Ok(())
    } else {
        Err(PlannerError::UnknownNode {
            node: node_id.to_string(),
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

fn check_acyclic(plan: &Plan) -> Result<(), PlannerError> {
    let mut colors: BTreeMap<&str, Color> = plan
        .nodes
        .keys()
        .map(|k| (k.as_str(), Color::White))
        .collect();
    let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for edge in &plan.edges {
        adjacency
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
    }

    let node_ids: Vec<&str> = plan.nodes.keys().map(String::as_str).collect();
    for start in node_ids {
        if colors.get(start) == Some(&Color::White) {
            visit(start, &mut colors, &adjacency)?;
        }
    }
    Ok(())
}

fn visit<'a>(
    node: &'a str,
    colors: &mut BTreeMap<&'a str, Color>,
    adjacency: &BTreeMap<&'a str, Vec<&'a str>>,
) -> Result<(), PlannerError> {
    match colors.get(node) {
        Some(Color::Black) => return Ok(()),
        Some(Color::Gray) => {
            return Err(PlannerError::CycleDetected {
                node: node.to_string(),
            })
        }
        _ => {}
    }
    colors.insert(node, Color::Gray);
    if let Some(successors) = adjacency.get(node) {
        for successor in successors.clone() {
            visit(successor, colors, adjacency)?;
        }
    }
    colors.insert(node, Color::Black);
    Ok(())
}

/// Compute a deterministic topological order over `plan`'s nodes via
/// Kahn's algorithm: when several nodes are simultaneously ready, the
/// lexicographically lowest node id is scheduled next.
///
/// # Errors
///
/// Returns [`PlannerError::UnknownNode`] for an edge referencing an
/// undeclared node, or [`PlannerError::CycleDetected`] if the edge graph
/// has a cycle (some node never reaches in-degree zero).
pub fn topological_order(plan: &Plan) -> Result<Vec<String>, PlannerError> {
    let mut indegree: BTreeMap<String, usize> =
        plan.nodes.keys().map(|k| (k.clone(), 0)).collect();
    let mut successors: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for edge in &plan.edges {
        require_node(plan, &edge.from)?;
        require_node(plan, &edge.to)?;
        *indegree.entry(edge.to.clone()).or_insert(0) += 1;
        successors
            .entry(edge.from.clone())
            .or_default()
            .push(edge.to.clone());
    }

    let mut ready: BTreeSet<String> = indegree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(id, _)| id.clone())
        .collect();
    let mut order = Vec::with_capacity(plan.nodes.len());

    while let Some(node) = ready.iter().next().cloned() {
        ready.remove(&node);
        if let Some(successors) = successors.get(&node) {
            for successor in successors {
                let degree = indegree.get_mut(successor).expect("declared node");
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(successor.clone());
                }
            }
        }
        order.push(node);
    }

    if order.len() != plan.nodes.len() {
        let stuck = plan
            .nodes
            .keys()
            .find(|id| !order.contains(id))
            .cloned()
            .unwrap_or_default();
        return Err(PlannerError::CycleDetected { node: stuck });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_cap::{ArgSource, CapArg};
    use cb_urn::CapUrn;

    fn input_slot(name: &str) -> Node {
        Node::InputSlot {
            slot_name: name.into(),
        }
    }

    fn cap_node(urn: &str) -> Node {
        Node::Cap {
            cap_urn: urn.into(),
            preferred_cap: None,
            arg_bindings: BTreeMap::new(),
        }
    }

    fn plan_with(nodes: Vec<(&str, Node)>, edges: Vec<Edge>) -> Plan {
        Plan {
            nodes: nodes.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            edges,
            metadata: BTreeMap::new(),
        }
    }

    fn no_caps(_urn: &str) -> Option<Cap> {
        None
    }

    #[test]
    fn validate_rejects_dangling_edge_endpoint() {
        let plan = plan_with(
            vec![("a", input_slot("in"))],
            vec![Edge {
                from: "a".into(),
                to: "missing".into(),
                edge_type: EdgeType::Direct,
            }],
        );
        let err = validate(&plan, &no_caps).unwrap_err();
        assert!(matches!(err, PlannerError::UnknownNode { node } if node == "missing"));
    }

    #[test]
    fn validate_rejects_cycles() {
        let plan = plan_with(
            vec![("a", input_slot("x")), ("b", input_slot("y"))],
            vec![
                Edge {
                    from: "a".into(),
                    to: "b".into(),
                    edge_type: EdgeType::Direct,
                },
                Edge {
                    from: "b".into(),
                    to: "a".into(),
                    edge_type: EdgeType::Direct,
                },
            ],
        );
        assert!(matches!(
            validate(&plan, &no_caps),
            Err(PlannerError::CycleDetected { .. })
        ));
    }

    #[test]
    fn validate_rejects_missing_required_binding() {
        let cap_urn = CapUrn::parse("cap:op=thumb").unwrap();
        let lookup = move |_: &str| {
            Some(Cap {
                urn: cap_urn.clone(),
                title: None,
                command: None,
                description: None,
                metadata: BTreeMap::new(),
                media_specs: vec![],
                args: vec![CapArg {
                    name: "doc".into(),
                    media_urn: "media:binary".into(),
                    required: true,
                    sources: vec![ArgSource::Stdin],
                    description: None,
                    validation: None,
                    default_value: None,
                }],
                output: None,
                accepts_stdin: false,
                metadata_json: None,
            })
        };
        let plan = plan_with(vec![("c", cap_node("cap:op=thumb"))], vec![]);
        let err = validate(&plan, &lookup).unwrap_err();
        assert!(matches!(err, PlannerError::MissingBinding { arg, .. } if arg == "doc"));
    }

    #[test]
    fn validate_rejects_duplicate_output_names() {
        let plan = plan_with(
            vec![
                ("a", input_slot("x")),
                (
                    "o1",
                    Node::Output {
                        output_name: "result".into(),
                        source_node: "a".into(),
                    },
                ),
                (
                    "o2",
                    Node::Output {
                        output_name: "result".into(),
                        source_node: "a".into(),
                    },
                ),
            ],
            vec![],
        );
        assert!(matches!(
            validate(&plan, &no_caps),
            Err(PlannerError::Internal { .. })
        ));
    }

    #[test]
    fn law8_topological_order_is_deterministic() {
        let plan = plan_with(
            vec![("b", input_slot("x")), ("a", input_slot("y")), ("c", input_slot("z"))],
            vec![
                Edge {
                    from: "a".into(),
                    to: "c".into(),
                    edge_type: EdgeType::Direct,
                },
                Edge {
                    from: "b".into(),
                    to: "c".into(),
                    edge_type: EdgeType::Direct,
                },
            ],
        );
        let once = topological_order(&plan).unwrap();
        let twice = topological_order(&plan).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn topological_order_detects_cycles() {
        let plan = plan_with(
            vec![("a", input_slot("x")), ("b", input_slot("y"))],
            vec![
                Edge {
                    from: "a".into(),
                    to: "b".into(),
                    edge_type: EdgeType::Direct,
                },
                Edge {
                    from: "b".into(),
                    to: "a".into(),
                    edge_type: EdgeType::Direct,
                },
            ],
        );
        assert!(matches!(
            topological_order(&plan),
            Err(PlannerError::CycleDetected { .. })
        ));
    }
}
