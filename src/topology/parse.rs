use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::model::{EdgeRecord, LatencyHistogram, NodeRecord, TopologyGraph};

/// One complete input snapshot: the graph plus per-node latency histograms.
#[derive(Clone, Debug, Default)]
pub struct TopologySnapshot {
    pub graph: TopologyGraph,
    pub latency: HashMap<String, LatencyHistogram>,
}

impl TopologySnapshot {
    pub fn from_records(nodes: Vec<NodeRecord>, edges: Vec<EdgeRecord>) -> Self {
        Self {
            graph: TopologyGraph::from_records(nodes, edges),
            latency: HashMap::new(),
        }
    }

    pub fn with_latency(mut self, node_id: impl Into<String>, histogram: LatencyHistogram) -> Self {
        self.latency.insert(node_id.into(), histogram.normalized());
        self
    }
}

/// Deserializes every entry of a JSON array on its own so a single malformed
/// record does not reject the whole snapshot.
fn lenient_entries<T>(value: Option<&Value>, kind: &str) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    if value.is_null() {
        return Ok(Vec::new());
    }

    let entries = value
        .as_array()
        .ok_or_else(|| anyhow!("snapshot field `{kind}` is not an array"))?;

    let mut parsed = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        match T::deserialize(entry) {
            Ok(record) => parsed.push(record),
            Err(error) => warn!(kind, position, %error, "skipping malformed snapshot entry"),
        }
    }
    Ok(parsed)
}

pub(super) fn parse_snapshot(raw: &str) -> Result<TopologySnapshot> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON in topology snapshot")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("topology snapshot must be a JSON object"))?;

    let nodes = lenient_entries::<NodeRecord>(object.get("nodes"), "nodes")?;
    let edges = lenient_entries::<EdgeRecord>(object.get("edges"), "edges")?;

    let mut latency = HashMap::new();
    if let Some(latency_value) = object.get("latency").filter(|value| !value.is_null()) {
        let latency_object = latency_value
            .as_object()
            .ok_or_else(|| anyhow!("snapshot field `latency` is not an object"))?;
        for (node_id, value) in latency_object {
            match LatencyHistogram::deserialize(value) {
                Ok(histogram) => {
                    latency.insert(node_id.clone(), histogram.normalized());
                }
                Err(error) => warn!(node_id = %node_id, %error, "skipping malformed latency histogram"),
            }
        }
    }

    Ok(TopologySnapshot {
        graph: TopologyGraph::from_records(nodes, edges),
        latency,
    })
}

impl FromStr for TopologySnapshot {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        parse_snapshot(raw)
    }
}
