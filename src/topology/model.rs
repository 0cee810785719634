use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, de};
use tracing::{debug, warn};

pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Healthy,
    Warning,
    Critical,
}

impl NodeStatus {
    pub const WARNING_ERROR_RATE: f64 = 1.0;
    pub const CRITICAL_ERROR_RATE: f64 = 5.0;

    /// Derives a status from an error rate on the 0-100 scale.
    pub fn from_error_rate(error_rate: f64) -> Self {
        if error_rate >= Self::CRITICAL_ERROR_RATE {
            Self::Critical
        } else if error_rate >= Self::WARNING_ERROR_RATE {
            Self::Warning
        } else {
            Self::Healthy
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeMetrics {
    pub rps: f64,
    pub p50_latency: f64,
    pub p95_latency: f64,
    pub p99_latency: f64,
    pub error_rate: f64,
    pub mtls_percent: f64,
    pub total_requests: f64,
}

impl NodeMetrics {
    fn sanitized(self) -> Self {
        Self {
            rps: finite_or_zero(self.rps),
            p50_latency: finite_or_zero(self.p50_latency),
            p95_latency: finite_or_zero(self.p95_latency),
            p99_latency: finite_or_zero(self.p99_latency),
            error_rate: finite_or_zero(self.error_rate),
            mtls_percent: finite_or_zero(self.mtls_percent),
            total_requests: finite_or_zero(self.total_requests),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgeMetrics {
    pub rps: f64,
    pub avg_latency: f64,
    pub error_rate: f64,
    pub call_count: f64,
}

impl EdgeMetrics {
    fn sanitized(self) -> Self {
        Self {
            rps: finite_or_zero(self.rps),
            avg_latency: finite_or_zero(self.avg_latency),
            error_rate: finite_or_zero(self.error_rate),
            call_count: finite_or_zero(self.call_count),
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Node as it arrives from a collaborator, before normalization.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub metrics: NodeMetrics,
    #[serde(default)]
    pub status: Option<NodeStatus>,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }
}

/// Edge as it arrives from a collaborator, before normalization.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub metrics: EdgeMetrics,
}

impl EdgeRecord {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub metrics: NodeMetrics,
    pub status: NodeStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub key: String,
    pub source_id: String,
    pub target_id: String,
    pub source: usize,
    pub target: usize,
    pub metrics: EdgeMetrics,
}

impl Edge {
    pub fn touches(&self, index: usize) -> bool {
        self.source == index || self.target == index
    }

    /// The endpoint opposite to `index`, if the edge touches it.
    pub fn other_end(&self, index: usize) -> Option<usize> {
        if self.source == index {
            Some(self.target)
        } else if self.target == index {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Identity of a graph: sorted `(id, namespace)` pairs and sorted
/// `(key, source id, target id)` triples. Metric values never take part in it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphShape {
    pub nodes: Vec<(String, String)>,
    pub edges: Vec<(String, String, String)>,
}

/// Nodes and edges one hop away from a given node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Adjacency {
    pub nodes: HashSet<usize>,
    pub edges: HashSet<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct TopologyGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    index_by_id: HashMap<String, usize>,
    index_by_edge_key: HashMap<String, usize>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl TopologyGraph {
    pub fn from_records(node_records: Vec<NodeRecord>, edge_records: Vec<EdgeRecord>) -> Self {
        let mut nodes = Vec::with_capacity(node_records.len());
        let mut index_by_id = HashMap::with_capacity(node_records.len());

        for record in node_records {
            if index_by_id.contains_key(&record.id) {
                warn!(id = %record.id, "duplicate node id, keeping the first record");
                continue;
            }

            let metrics = record.metrics.sanitized();
            let name = record
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| record.id.clone());
            let namespace = record
                .namespace
                .filter(|namespace| !namespace.is_empty())
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());
            let status = record
                .status
                .unwrap_or_else(|| NodeStatus::from_error_rate(metrics.error_rate));

            index_by_id.insert(record.id.clone(), nodes.len());
            nodes.push(Node {
                id: record.id,
                name,
                namespace,
                metrics,
                status,
            });
        }

        let mut edges = Vec::with_capacity(edge_records.len());
        let mut index_by_edge_key = HashMap::with_capacity(edge_records.len());
        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        let mut dropped = 0usize;

        for record in edge_records {
            let (Some(&source), Some(&target)) = (
                index_by_id.get(&record.source_id),
                index_by_id.get(&record.target_id),
            ) else {
                dropped += 1;
                continue;
            };

            let base_key = record
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("{}>{}", record.source_id, record.target_id));
            let mut key = base_key.clone();
            let mut suffix = 2usize;
            while index_by_edge_key.contains_key(&key) {
                key = format!("{base_key}#{suffix}");
                suffix += 1;
            }

            let edge_index = edges.len();
            index_by_edge_key.insert(key.clone(), edge_index);
            outgoing[source].push(edge_index);
            incoming[target].push(edge_index);
            edges.push(Edge {
                key,
                source_id: record.source_id,
                target_id: record.target_id,
                source,
                target,
                metrics: record.metrics.sanitized(),
            });
        }

        if dropped > 0 {
            debug!(dropped, "dropped edges with dangling node references");
        }

        Self {
            nodes,
            edges,
            index_by_id,
            index_by_edge_key,
            outgoing,
            incoming,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).and_then(|index| self.nodes.get(index))
    }

    /// Outgoing edge indices of a node, in input order.
    pub fn outgoing(&self, index: usize) -> &[usize] {
        self.outgoing.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Incoming edge indices of a node, in input order.
    pub fn incoming(&self, index: usize) -> &[usize] {
        self.incoming.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn shape(&self) -> GraphShape {
        let mut nodes = self
            .nodes
            .iter()
            .map(|node| (node.id.clone(), node.namespace.clone()))
            .collect::<Vec<_>>();
        nodes.sort();
        let mut edges = self
            .edges
            .iter()
            .map(|edge| {
                (
                    edge.key.clone(),
                    edge.source_id.clone(),
                    edge.target_id.clone(),
                )
            })
            .collect::<Vec<_>>();
        edges.sort();

        GraphShape { nodes, edges }
    }

    /// Scans every edge once and collects the edges touching `index` together
    /// with the nodes at their other end. The node itself is only included
    /// when it has a self-loop.
    pub fn one_hop(&self, index: usize) -> Adjacency {
        let mut adjacency = Adjacency::default();
        for (edge_index, edge) in self.edges.iter().enumerate() {
            if let Some(other) = edge.other_end(index) {
                adjacency.edges.insert(edge_index);
                adjacency.nodes.insert(other);
            }
        }
        adjacency
    }

    /// Copies metric values and statuses from `fresh` into matching records,
    /// leaving identities and indices untouched. Returns the number of records
    /// updated.
    pub fn merge_metrics(&mut self, fresh: &TopologyGraph) -> usize {
        let mut updated = 0usize;

        for node in &fresh.nodes {
            if let Some(&index) = self.index_by_id.get(&node.id) {
                let target = &mut self.nodes[index];
                target.metrics = node.metrics;
                target.status = node.status;
                target.name.clone_from(&node.name);
                updated += 1;
            }
        }

        for edge in &fresh.edges {
            if let Some(&index) = self.index_by_edge_key.get(&edge.key) {
                self.edges[index].metrics = edge.metrics;
                updated += 1;
            }
        }

        updated
    }
}

/// Accepts plain numbers as well as strings such as `"+Inf"`, which is how
/// catch-all buckets are written since JSON has no infinity literal.
fn bucket_bound<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Bound {
        Number(f64),
        Text(String),
    }

    match Bound::deserialize(deserializer)? {
        Bound::Number(value) => Ok(value),
        Bound::Text(text) => text.trim().parse::<f64>().map_err(de::Error::custom),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyBucket {
    #[serde(deserialize_with = "bucket_bound")]
    pub upper_bound_ms: f64,
    #[serde(default)]
    pub count: u64,
}

/// Request-duration distribution of a single node.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LatencyHistogram {
    pub buckets: Vec<LatencyBucket>,
    pub p50: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    /// Requests slower than the last finite bound (the `+Inf` bucket).
    #[serde(skip)]
    pub overflow_count: u64,
}

impl LatencyHistogram {
    /// Moves `+Inf` bucket counts into `overflow_count`, drops other
    /// non-finite bounds and sorts the rest by upper bound.
    pub fn normalized(mut self) -> Self {
        self.overflow_count += self
            .buckets
            .iter()
            .filter(|bucket| bucket.upper_bound_ms == f64::INFINITY)
            .map(|bucket| bucket.count)
            .sum::<u64>();
        self.buckets
            .retain(|bucket| bucket.upper_bound_ms.is_finite());
        self.buckets
            .sort_by(|a, b| a.upper_bound_ms.total_cmp(&b.upper_bound_ms));
        self.p50 = self.p50.filter(|value| value.is_finite());
        self.p95 = self.p95.filter(|value| value.is_finite());
        self.p99 = self.p99.filter(|value| value.is_finite());
        self
    }

    /// Request count across all buckets, overflow included.
    pub fn total_count(&self) -> u64 {
        self.buckets.iter().map(|bucket| bucket.count).sum::<u64>() + self.overflow_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, namespace: &str) -> NodeRecord {
        NodeRecord::new(id, namespace)
    }

    #[test]
    fn dangling_edges_are_dropped() {
        let graph = TopologyGraph::from_records(
            vec![node("a", "x"), node("b", "x")],
            vec![
                EdgeRecord::new("a", "b"),
                EdgeRecord::new("a", "ghost"),
                EdgeRecord::new("ghost", "b"),
            ],
        );

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges[0].key, "a>b");
        assert_eq!(graph.outgoing(0), &[0]);
        assert_eq!(graph.incoming(1), &[0]);
    }

    #[test]
    fn multi_edges_stay_distinct() {
        let mut with_id = EdgeRecord::new("a", "b");
        with_id.id = Some("grpc".to_owned());
        let graph = TopologyGraph::from_records(
            vec![node("a", "x"), node("b", "x")],
            vec![EdgeRecord::new("a", "b"), EdgeRecord::new("a", "b"), with_id],
        );

        let keys = graph.edges.iter().map(|edge| edge.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["a>b", "a>b#2", "grpc"]);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let mut record = NodeRecord {
            id: "svc".to_owned(),
            ..Default::default()
        };
        record.metrics.error_rate = 7.5;
        record.metrics.rps = f64::NAN;

        let graph = TopologyGraph::from_records(vec![record], Vec::new());
        let node = &graph.nodes[0];
        assert_eq!(node.name, "svc");
        assert_eq!(node.namespace, DEFAULT_NAMESPACE);
        assert_eq!(node.status, NodeStatus::Critical);
        assert_eq!(node.metrics.rps, 0.0);
    }

    #[test]
    fn duplicate_node_ids_keep_first_record() {
        let graph = TopologyGraph::from_records(vec![node("a", "x"), node("a", "y")], Vec::new());
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.nodes[0].namespace, "x");
    }

    #[test]
    fn one_hop_covers_both_directions_only() {
        let graph = TopologyGraph::from_records(
            vec![node("a", "x"), node("b", "x"), node("c", "x"), node("d", "x")],
            vec![
                EdgeRecord::new("a", "b"),
                EdgeRecord::new("c", "a"),
                EdgeRecord::new("b", "d"),
            ],
        );

        let adjacency = graph.one_hop(0);
        assert_eq!(adjacency.nodes, HashSet::from([1, 2]));
        assert_eq!(adjacency.edges, HashSet::from([0, 1]));
    }

    #[test]
    fn shape_ignores_metrics_and_order() {
        let first = TopologyGraph::from_records(
            vec![node("a", "x"), node("b", "x")],
            vec![EdgeRecord::new("a", "b")],
        );
        let mut busy = node("a", "x");
        busy.metrics.rps = 99.0;
        let second = TopologyGraph::from_records(
            vec![node("b", "x"), busy],
            vec![EdgeRecord::new("a", "b")],
        );

        assert_eq!(first.shape(), second.shape());
    }

    #[test]
    fn merge_metrics_updates_in_place() {
        let mut graph = TopologyGraph::from_records(
            vec![node("a", "x"), node("b", "x")],
            vec![EdgeRecord::new("a", "b")],
        );
        let mut hot = node("b", "x");
        hot.metrics.rps = 42.0;
        hot.metrics.error_rate = 2.0;
        let mut edge = EdgeRecord::new("a", "b");
        edge.metrics.call_count = 10.0;
        let fresh = TopologyGraph::from_records(vec![hot, node("a", "x")], vec![edge]);

        assert_eq!(graph.merge_metrics(&fresh), 3);
        assert_eq!(graph.nodes[1].metrics.rps, 42.0);
        assert_eq!(graph.nodes[1].status, NodeStatus::Warning);
        assert_eq!(graph.edges[0].metrics.call_count, 10.0);
        assert_eq!(graph.index_of("b"), Some(1));
    }

    #[test]
    fn histogram_normalization_keeps_infinite_bucket_as_overflow() {
        let histogram = LatencyHistogram {
            buckets: vec![
                LatencyBucket {
                    upper_bound_ms: f64::INFINITY,
                    count: 3,
                },
                LatencyBucket {
                    upper_bound_ms: 50.0,
                    count: 2,
                },
                LatencyBucket {
                    upper_bound_ms: 10.0,
                    count: 1,
                },
            ],
            ..Default::default()
        }
        .normalized();

        let bounds = histogram
            .buckets
            .iter()
            .map(|bucket| bucket.upper_bound_ms)
            .collect::<Vec<_>>();
        assert_eq!(bounds, vec![10.0, 50.0]);
        assert_eq!(histogram.overflow_count, 3);
        assert_eq!(histogram.total_count(), 6);
    }

    #[test]
    fn shape_tracks_edge_endpoints_and_namespaces() {
        let mut first_edge = EdgeRecord::new("a", "b");
        first_edge.id = Some("e1".to_owned());
        let mut rewired = EdgeRecord::new("b", "c");
        rewired.id = Some("e1".to_owned());
        let nodes = || vec![node("a", "x"), node("b", "x"), node("c", "x")];

        let before = TopologyGraph::from_records(nodes(), vec![first_edge]);
        let after = TopologyGraph::from_records(nodes(), vec![rewired]);
        assert_ne!(before.shape(), after.shape());

        let moved = TopologyGraph::from_records(
            vec![node("a", "x"), node("b", "y"), node("c", "x")],
            Vec::new(),
        );
        let stayed = TopologyGraph::from_records(nodes(), Vec::new());
        assert_ne!(moved.shape(), stayed.shape());
    }
}
