// SPDX-License-Identifier: MIT OR Apache-2.0
//! `cb`: small inspection tools over the capability brokerage core crates.
//!
//! Each subcommand is a thin read-only window onto one crate — it exists
//! to let a developer poke at URNs, input resolution, and graph
//! reachability from a shell without writing a Rust program.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const EXIT_RUNTIME_ERROR: u8 = 1;

#[derive(Debug, Parser)]
#[command(name = "cb", version, about = "Capability brokerage inspection tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a URN and print its canonical form, tags, and specificity.
    DescribeUrn {
        /// The URN text, e.g. `cap:op=transcode;in=media:format=mp4`.
        urn: String,
    },
    /// Resolve one or more input paths and print the classified result set.
    ResolveInputs {
        /// Files, directories, or glob patterns to resolve.
        #[arg(required = true)]
        paths: Vec<String>,
        /// Maximum bytes read from each file for structural probes.
        #[arg(long, default_value_t = 65536)]
        sniff_bytes: usize,
    },
    /// Load a flat edge list from TOML and print the shortest path between two media URNs.
    GraphPath {
        /// Path to a TOML file holding a top-level `edges` array: the
        /// graph's cap-derived conversions, not a full block definition
        /// (a `Block`'s live `CapExecutor` handles have no TOML form).
        #[arg(long = "block")]
        edges: String,
        /// Source media URN.
        #[arg(long)]
        from: String,
        /// Destination media URN.
        #[arg(long)]
        to: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::DescribeUrn { urn } => commands::describe_urn(&urn),
        Commands::ResolveInputs { paths, sniff_bytes } => commands::resolve_inputs(&paths, sniff_bytes),
        Commands::GraphPath { edges, from, to } => commands::graph_path(&edges, &from, &to),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}
