use std::collections::{HashMap, VecDeque};

use crate::topology::TopologyGraph;

/// Layer per node index, produced by [`assign_layers`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerAssignment {
    pub layers: Vec<usize>,
    pub layer_count: usize,
    /// Nodes never released by the topological sort (on or behind a cycle).
    /// They sit on layer 0.
    pub cyclic: Vec<usize>,
}

impl LayerAssignment {
    pub fn layer(&self, index: usize) -> Option<usize> {
        self.layers.get(index).copied()
    }

    /// Node indices per layer, each list in input order.
    pub fn by_layer(&self) -> Vec<Vec<usize>> {
        let mut grouped = vec![Vec::new(); self.layer_count];
        for (index, &layer) in self.layers.iter().enumerate() {
            grouped[layer].push(index);
        }
        grouped
    }

    pub fn by_id<'a>(&self, graph: &'a TopologyGraph) -> HashMap<&'a str, usize> {
        graph
            .nodes
            .iter()
            .zip(self.layers.iter())
            .map(|(node, &layer)| (node.id.as_str(), layer))
            .collect()
    }
}

pub fn assign_layers(graph: &TopologyGraph) -> LayerAssignment {
    let edges = graph
        .edges
        .iter()
        .map(|edge| (edge.source, edge.target))
        .collect::<Vec<_>>();
    layer_indices(graph.node_count(), &edges)
}

/// Longest-path layering over Kahn's algorithm. Edges referencing indices out
/// of range are ignored, and so are self-loops since they cannot order
/// anything.
pub fn layer_indices(node_count: usize, edges: &[(usize, usize)]) -> LayerAssignment {
    let mut indegree = vec![0usize; node_count];
    let mut outgoing = vec![Vec::new(); node_count];

    for &(from, to) in edges {
        if from >= node_count || to >= node_count || from == to {
            continue;
        }
        outgoing[from].push(to);
        indegree[to] += 1;
    }

    let mut layers = vec![0usize; node_count];
    let mut processed = vec![false; node_count];
    let mut queue = (0..node_count)
        .filter(|&index| indegree[index] == 0)
        .collect::<VecDeque<_>>();

    while let Some(node) = queue.pop_front() {
        processed[node] = true;
        let current = layers[node];

        for &next in &outgoing[node] {
            layers[next] = layers[next].max(current + 1);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    let mut cyclic = Vec::new();
    for (index, done) in processed.iter().enumerate() {
        if !done {
            layers[index] = 0;
            cyclic.push(index);
        }
    }

    let layer_count = if node_count == 0 {
        0
    } else {
        layers.iter().copied().max().unwrap_or(0) + 1
    };

    LayerAssignment {
        layers,
        layer_count,
        cyclic,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::topology::{EdgeRecord, NodeRecord};

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> TopologyGraph {
        TopologyGraph::from_records(
            ids.iter().map(|id| NodeRecord::new(*id, "ns")).collect(),
            edges
                .iter()
                .map(|(source, target)| EdgeRecord::new(*source, *target))
                .collect(),
        )
    }

    #[test]
    fn diamond_gets_three_layers() {
        let graph = graph(
            &["A", "B", "C", "D"],
            &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")],
        );
        let layers = assign_layers(&graph);

        assert_eq!(
            layers.by_id(&graph),
            HashMap::from([("A", 0), ("B", 1), ("C", 1), ("D", 2)])
        );
        assert_eq!(layers.layer_count, 3);
        assert!(layers.cyclic.is_empty());
    }

    #[test]
    fn longest_path_wins_over_shortcut() {
        let graph = graph(&["a", "b", "c"], &[("a", "c"), ("a", "b"), ("b", "c")]);
        let layers = assign_layers(&graph);
        assert_eq!(layers.layers, vec![0, 1, 2]);
    }

    #[test]
    fn acyclic_edges_respect_layer_order() {
        let graph = graph(
            &["gw", "auth", "cart", "db", "cache", "log"],
            &[
                ("gw", "auth"),
                ("gw", "cart"),
                ("cart", "db"),
                ("cart", "cache"),
                ("auth", "db"),
                ("cache", "db"),
                ("db", "log"),
            ],
        );
        let layers = assign_layers(&graph);

        for edge in &graph.edges {
            assert!(layers.layers[edge.target] >= layers.layers[edge.source] + 1);
        }
    }

    #[test]
    fn cycle_members_fall_back_to_layer_zero() {
        let graph = graph(
            &["root", "x", "y", "after"],
            &[("root", "x"), ("x", "y"), ("y", "x"), ("y", "after")],
        );
        let layers = assign_layers(&graph);

        assert_eq!(layers.layers, vec![0, 0, 0, 0]);
        assert_eq!(layers.cyclic, vec![1, 2, 3]);
        assert_eq!(layers.layer_count, 1);
    }

    #[test]
    fn self_loop_does_not_block_layering() {
        let graph = graph(&["a", "b"], &[("a", "a"), ("a", "b")]);
        let layers = assign_layers(&graph);
        assert_eq!(layers.layers, vec![0, 1]);
        assert!(layers.cyclic.is_empty());
    }

    #[test]
    fn empty_graph_has_no_layers() {
        let layers = layer_indices(0, &[]);
        assert_eq!(layers.layer_count, 0);
        assert!(layers.by_layer().is_empty());
    }

    #[test]
    fn by_layer_keeps_input_order() {
        let layers = layer_indices(5, &[(4, 0), (4, 2), (4, 1)]);
        assert_eq!(layers.by_layer(), vec![vec![3, 4], vec![0, 1, 2]]);
    }
}
