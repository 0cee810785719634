mod collect;
mod model;
mod parse;

pub use collect::load_snapshot;
pub use model::{
    Adjacency, DEFAULT_NAMESPACE, Edge, EdgeMetrics, EdgeRecord, GraphShape, LatencyBucket,
    LatencyHistogram, Node, NodeMetrics, NodeRecord, NodeStatus, TopologyGraph,
};
pub use parse::TopologySnapshot;
