// SPDX-License-Identifier: MIT OR Apache-2.0
//! Implementations backing each `cb` subcommand, kept separate from
//! argument parsing so they can be exercised directly in tests.

use std::fs;

use anyhow::{bail, Context, Result};
use cb_graph::{Edge as GraphEdge, Graph};
use cb_resolve::{resolve_paths, ResolveOptions};
use cb_urn::TaggedUrn;
use serde::Deserialize;

/// Parse `text` as a [`TaggedUrn`] and print its canonical form, tags, and
/// specificity as JSON. Both `cap:` and `media:` URNs share this shape,
/// so no prefix-specific dispatch is needed.
pub fn describe_urn(text: &str) -> Result<()> {
    let urn = TaggedUrn::parse(text).with_context(|| format!("failed to parse URN `{text}`"))?;
    let report = serde_json::json!({
        "canonical": urn.to_string(),
        "prefix": urn.prefix(),
        "tags": urn.tags(),
        "specificity": urn.specificity(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Resolve `paths` and print the resulting [`cb_resolve::ResolvedInputSet`] as JSON.
pub fn resolve_inputs(paths: &[String], sniff_bytes: usize) -> Result<()> {
    let options = ResolveOptions { sniff_bytes };
    let resolved = resolve_paths(paths, options).context("failed to resolve inputs")?;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

/// The on-disk shape of a `graph-path` edge file: a flat list of
/// cap-derived conversions, the same data a `cb_graph::Graph` is built
/// from, without the live `Box<dyn CapExecutor>` a `cb_registry::Block`
/// would otherwise require just to describe its shape.
#[derive(Debug, Deserialize)]
struct EdgeFile {
    edges: Vec<EdgeRecord>,
}

#[derive(Debug, Deserialize)]
struct EdgeRecord {
    from: String,
    to: String,
    cap: String,
    registry_name: String,
    set_name: String,
    specificity: usize,
}

/// Load a flat edge list from TOML, build a [`Graph`], and print the
/// shortest path between `from` and `to` as JSON (`null` if unreachable).
pub fn graph_path(edges_path: &str, from: &str, to: &str) -> Result<()> {
    let text = fs::read_to_string(edges_path)
        .with_context(|| format!("failed to read edge file `{edges_path}`"))?;
    let file: EdgeFile = toml::from_str(&text)
        .with_context(|| format!("failed to parse edge file `{edges_path}`"))?;

    let mut edges = Vec::with_capacity(file.edges.len());
    for record in file.edges {
        let from_urn = cb_urn::MediaUrn::parse(&record.from)
            .with_context(|| format!("invalid `from` media URN `{}`", record.from))?;
        let to_urn = cb_urn::MediaUrn::parse(&record.to)
            .with_context(|| format!("invalid `to` media URN `{}`", record.to))?;
        let cap_urn = cb_urn::CapUrn::parse(&record.cap)
            .with_context(|| format!("invalid cap URN `{}`", record.cap))?;
        edges.push(GraphEdge {
            from: from_urn,
            to: to_urn,
            cap: cap_urn,
            registry_name: record.registry_name,
            set_name: record.set_name,
            specificity: record.specificity,
        });
    }

    if edges.is_empty() {
        bail!("edge file `{edges_path}` declares no edges");
    }

    let graph = Graph::new(edges);
    let path = graph.find_path(from, to);
    println!("{}", serde_json::to_string_pretty(&path)?);
    Ok(())
}
