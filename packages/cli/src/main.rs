//! `nodesel` — node selection policy command-line interface.
//!
//! Provides three subcommands for working with placement policies:
//!
//! - **`check`** — load a policy file and report whether every placement builds.
//! - **`describe`** — print each placement's filter tree and annotations.
//! - **`select`** — evaluate a placement against a JSON snapshot of nodes.
//!
//! Policy and node files are JSON; pass `-` to read from stdin. Logging goes
//! to stderr and is controlled by `RUST_LOG` (default `nodesel=info`).

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use nodeselection::annotation::ANNOTATION_LOCATION;
use nodeselection::{
    auto_exclude_subnets, select_parallel, NodeFilter, PlacementRules, SelectedNode,
};
use serde::Serialize;

/// nodesel — node selection policy CLI
///
/// Check, describe, and evaluate storage placement policies.
#[derive(Parser)]
#[command(name = "nodesel", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that a placement policy parses and every placement builds.
    ///
    /// Exits 0 if the policy is valid, 1 otherwise.
    Check {
        /// Path to a policy JSON file, or `-` for stdin.
        policy: PathBuf,
    },

    /// Print every placement with its filter tree and annotations.
    Describe {
        /// Path to a policy JSON file, or `-` for stdin.
        policy: PathBuf,

        /// Emit a JSON array instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the nodes eligible for a placement.
    ///
    /// Reads a JSON array of node records and prints the ids of the nodes
    /// that match, one per line, in input order.
    ///
    /// Examples:
    ///   nodesel select --policy policy.json --placement 10 nodes.json
    ///   cat nodes.json | NODESEL_POLICY=policy.json nodesel select --count -
    Select {
        /// Path to a policy JSON file.
        #[arg(long, env = "NODESEL_POLICY", value_name = "FILE")]
        policy: PathBuf,

        /// Placement id to evaluate. Undefined ids other than 0 select nothing.
        #[arg(short = 'p', long, default_value_t = 0, value_name = "ID")]
        placement: u16,

        /// Number of threads to scan with, capped at the available parallelism.
        #[arg(short = 'w', long, default_value_t = 1, value_name = "N")]
        workers: usize,

        /// Print only the number of matching nodes.
        #[arg(long, conflicts_with = "json")]
        count: bool,

        /// Print the matching node records as a JSON array.
        #[arg(long)]
        json: bool,

        /// Path to a JSON array of node records, or `-` for stdin.
        nodes: PathBuf,
    },
}

/// One entry of `describe --json`.
#[derive(Serialize)]
struct PlacementSummary<'a> {
    id: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    filter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    auto_exclude_subnets: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nodesel=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Check { policy } => {
            let rules = load_rules(&policy);
            println!("ok: {} placements", rules.len());
        }

        Command::Describe { policy, json } => {
            let rules = load_rules(&policy);
            let summaries: Vec<PlacementSummary> = rules
                .iter()
                .map(|p| PlacementSummary {
                    id: p.id,
                    name: p.name.as_deref(),
                    filter: p.filter.to_string(),
                    location: p.filter.annotation(ANNOTATION_LOCATION),
                    auto_exclude_subnets: auto_exclude_subnets(&p.filter),
                })
                .collect();

            if json {
                println!("{}", to_json(&summaries));
                return;
            }
            for s in &summaries {
                println!("placement {}", s.id);
                if let Some(name) = s.name {
                    println!("  name:     {name}");
                }
                println!("  filter:   {}", s.filter);
                if let Some(location) = s.location {
                    println!("  location: {location}");
                }
                println!(
                    "  subnets:  {}",
                    if s.auto_exclude_subnets {
                        "one node per network"
                    } else {
                        "not restricted"
                    }
                );
            }
        }

        Command::Select {
            policy,
            placement,
            workers,
            count,
            json,
            nodes,
        } => {
            let rules = load_rules(&policy);
            let nodes = parse_nodes(&read_input(&nodes));
            let filter = rules.filter(placement);

            tracing::info!(
                placement,
                nodes = nodes.len(),
                workers,
                filter = %filter,
                "evaluating placement"
            );
            let selected = select_parallel(&filter, &nodes, workers);
            tracing::info!(placement, selected = selected.len(), "selection done");

            if count {
                println!("{}", selected.len());
            } else if json {
                println!("{}", to_json(&selected));
            } else {
                for node in selected {
                    println!("{}", node.id);
                }
            }
        }
    }
}

/// Read and build a policy, exiting 1 if it is invalid.
fn load_rules(path: &Path) -> PlacementRules {
    let json = read_input(path);
    match PlacementRules::from_json(&json) {
        Ok(rules) => {
            tracing::debug!(path = %path.display(), placements = rules.len(), "policy loaded");
            rules
        }
        Err(e) => {
            eprintln!("error: {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &Path) -> String {
    if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {}", e)));
        buf
    } else {
        fs::read_to_string(path)
            .unwrap_or_else(|e| fatal(&format!("failed to read {}: {}", path.display(), e)))
    }
}

/// Parse a JSON array of node records.
fn parse_nodes(json: &str) -> Vec<SelectedNode> {
    serde_json::from_str(json)
        .unwrap_or_else(|e| fatal(&format!("failed to parse input as node records: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| fatal(&format!("failed to serialise output: {}", e)))
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("nodesel: {}", msg);
    process::exit(2);
}
