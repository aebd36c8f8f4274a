use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use predicate_lineage::lineage::{build, load_records};
use predicate_lineage::{FallbackStrategy, FilterPolicy, ViewConfig, ViewState};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Exact,
    Ancestors,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FallbackArg {
    Force,
    Fail,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON device records: an array, or an object with a `devices` array.
    #[arg(long)]
    records: PathBuf,

    /// JSON view config; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    query: Option<String>,

    #[arg(long)]
    select: Option<String>,

    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    #[arg(long, value_enum)]
    fallback: Option<FallbackArg>,

    #[arg(long)]
    max_nodes: Option<usize>,

    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn view_config(&self) -> Result<ViewConfig> {
        let mut config = match &self.config {
            Some(path) => ViewConfig::load(path)?,
            None => ViewConfig::default(),
        };

        if let Some(policy) = self.policy {
            config.filter = match policy {
                PolicyArg::Exact => FilterPolicy::ExactMatches,
                PolicyArg::Ancestors => FilterPolicy::WithAncestors,
            };
        }
        if let Some(fallback) = self.fallback {
            config.fallback = match fallback {
                FallbackArg::Force => FallbackStrategy::ForceDirected,
                FallbackArg::Fail => FallbackStrategy::Fail,
            };
        }
        if let Some(max_nodes) = self.max_nodes {
            config.layout.max_nodes = max_nodes;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = args.view_config()?;

    let records = load_records(&args.records)?;
    let graph = build(&records)
        .with_context(|| format!("record set {} rejected", args.records.display()))?;

    let mut state = ViewState::new(Arc::new(graph), config).context("initial layout failed")?;
    if let Some(query) = &args.query {
        state
            .set_query(query)
            .with_context(|| format!("layout failed for query {query:?}"))?;
    }
    if let Some(id) = &args.select {
        state.set_selected(Some(id.as_str()));
    }

    let snapshot = state.snapshot();
    info!(
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        matches = snapshot.match_count,
        "writing snapshot"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let written = if args.pretty {
        serde_json::to_writer_pretty(&mut out, &*snapshot)
    } else {
        serde_json::to_writer(&mut out, &*snapshot)
    };
    written.context("failed to write snapshot")?;
    writeln!(out).context("failed to write snapshot")?;

    Ok(())
}
