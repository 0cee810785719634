use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::parse::{TopologySnapshot, parse_snapshot};

pub fn load_snapshot(path: &Path) -> Result<TopologySnapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read topology snapshot {}", path.display()))?;

    let snapshot = parse_snapshot(&raw)
        .with_context(|| format!("failed to parse topology snapshot {}", path.display()))?;

    info!(
        path = %path.display(),
        nodes = snapshot.graph.node_count(),
        edges = snapshot.graph.edge_count(),
        histograms = snapshot.latency.len(),
        "loaded topology snapshot"
    );

    Ok(snapshot)
}
