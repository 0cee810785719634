use std::collections::BTreeMap;

use eframe::egui::{Pos2, Rect, pos2};

use crate::config::LayoutConfig;
use crate::topology::TopologyGraph;

use super::layering::LayerAssignment;

/// Graph-space position per node index. Kept apart from the metric records so
/// drags and metric merges never touch the same data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PositionArena {
    positions: Vec<Pos2>,
}

impl PositionArena {
    pub fn new(positions: Vec<Pos2>) -> Self {
        Self { positions }
    }

    pub fn get(&self, index: usize) -> Option<Pos2> {
        self.positions.get(index).copied()
    }

    pub fn set(&mut self, index: usize, position: Pos2) {
        if let Some(slot) = self.positions.get_mut(index) {
            *slot = position;
        }
    }

    pub fn as_slice(&self) -> &[Pos2] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Horizontal band holding every node of one namespace.
#[derive(Clone, Debug, PartialEq)]
pub struct Lane {
    pub namespace: String,
    pub node_indices: Vec<usize>,
    pub bounds: Rect,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Placement {
    pub positions: PositionArena,
    pub lanes: Vec<Lane>,
}

impl Placement {
    pub fn lane_of(&self, index: usize) -> Option<&Lane> {
        self.lanes
            .iter()
            .find(|lane| lane.node_indices.contains(&index))
    }

    /// Bottom edge of the last lane, or 0 when there are no lanes.
    pub fn content_height(&self) -> f32 {
        self.lanes.last().map_or(0.0, |lane| lane.bounds.max.y)
    }
}

/// X coordinate of a layer: linear interpolation across
/// `[padding_x, container_width - padding_x]`.
fn layer_x(layer: usize, layer_count: usize, container_width: f32, padding_x: f32) -> f32 {
    if layer_count <= 1 {
        return container_width * 0.5;
    }

    let span = (container_width - 2.0 * padding_x).max(0.0);
    padding_x + span * (layer as f32 / (layer_count - 1) as f32)
}

pub fn place_nodes(
    graph: &TopologyGraph,
    layers: &LayerAssignment,
    container_width: f32,
    config: &LayoutConfig,
) -> Placement {
    let mut by_namespace: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, node) in graph.nodes.iter().enumerate() {
        by_namespace
            .entry(node.namespace.as_str())
            .or_default()
            .push(index);
    }

    // Negative spacing would let neighbouring lanes overlap.
    let node_spacing = config.node_spacing.max(0.0);
    let lane_padding = config.lane_padding.max(0.0);
    let lane_gap = config.lane_gap.max(0.0);

    let mut positions = vec![Pos2::ZERO; graph.node_count()];
    let mut lanes = Vec::with_capacity(by_namespace.len());
    let mut lane_top = 0.0_f32;

    for (namespace, node_indices) in by_namespace {
        let mut by_layer: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &index in &node_indices {
            let layer = layers.layer(index).unwrap_or(0);
            by_layer.entry(layer).or_default().push(index);
        }

        let widest = by_layer.values().map(Vec::len).max().unwrap_or(1);
        let lane_height =
            widest.saturating_sub(1) as f32 * node_spacing + 2.0 * lane_padding;
        let center_y = lane_top + lane_height * 0.5;

        for (layer, members) in &by_layer {
            let x = layer_x(*layer, layers.layer_count, container_width, config.padding_x);
            let middle = (members.len() as f32 - 1.0) * 0.5;
            for (slot, &index) in members.iter().enumerate() {
                let y = center_y + (slot as f32 - middle) * node_spacing;
                positions[index] = pos2(x, y);
            }
        }

        let bounds = Rect::from_min_max(
            pos2(0.0, lane_top),
            pos2(container_width.max(0.0), lane_top + lane_height),
        );
        lanes.push(Lane {
            namespace: namespace.to_owned(),
            node_indices,
            bounds,
        });

        lane_top += lane_height + lane_gap;
    }

    Placement {
        positions: PositionArena::new(positions),
        lanes,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout::layering::assign_layers;
    use crate::topology::{EdgeRecord, NodeRecord};

    fn build(nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> (TopologyGraph, Placement) {
        let graph = TopologyGraph::from_records(
            nodes
                .iter()
                .map(|(id, namespace)| NodeRecord::new(*id, *namespace))
                .collect(),
            edges
                .iter()
                .map(|(source, target)| EdgeRecord::new(*source, *target))
                .collect(),
        );
        let layers = assign_layers(&graph);
        let placement = place_nodes(&graph, &layers, 1000.0, &LayoutConfig::default());
        (graph, placement)
    }

    fn assert_partition(graph: &TopologyGraph, placement: &Placement) {
        let mut seen = HashSet::new();
        for lane in &placement.lanes {
            for &index in &lane.node_indices {
                assert!(seen.insert(index), "node {index} placed in two lanes");
                assert_eq!(graph.nodes[index].namespace, lane.namespace);
            }
        }
        assert_eq!(seen.len(), graph.node_count());
    }

    #[test]
    fn lanes_partition_single_namespace() {
        let (graph, placement) = build(&[("a", "x"), ("b", "x"), ("c", "x")], &[("a", "b")]);
        assert_eq!(placement.lanes.len(), 1);
        assert_partition(&graph, &placement);
    }

    #[test]
    fn lanes_partition_distinct_namespaces_in_lexicographic_order() {
        let (graph, placement) = build(
            &[("a", "zeta"), ("b", "alpha"), ("c", "mid"), ("d", "beta")],
            &[],
        );
        let order = placement
            .lanes
            .iter()
            .map(|lane| lane.namespace.as_str())
            .collect::<Vec<_>>();

        assert_eq!(order, vec!["alpha", "beta", "mid", "zeta"]);
        assert_partition(&graph, &placement);
    }

    #[test]
    fn lanes_stack_with_gap_and_never_overlap() {
        let (_, placement) = build(
            &[("a", "x"), ("b", "x"), ("c", "y"), ("d", "z"), ("e", "z")],
            &[("a", "c"), ("a", "d")],
        );
        let config = LayoutConfig::default();

        for pair in placement.lanes.windows(2) {
            let [upper, lower] = pair else { continue };
            assert_eq!(lower.bounds.min.y, upper.bounds.max.y + config.lane_gap);
        }
    }

    #[test]
    fn negative_spacing_still_keeps_lanes_apart() {
        let graph = TopologyGraph::from_records(
            vec![
                NodeRecord::new("a", "x"),
                NodeRecord::new("b", "x"),
                NodeRecord::new("c", "y"),
                NodeRecord::new("d", "y"),
            ],
            Vec::new(),
        );
        let config = LayoutConfig {
            node_spacing: -50.0,
            lane_gap: -200.0,
            ..LayoutConfig::default()
        };
        let placement = place_nodes(&graph, &assign_layers(&graph), 1000.0, &config);

        let [upper, lower] = placement.lanes.as_slice() else {
            panic!("expected two lanes");
        };
        assert!(lower.bounds.min.y >= upper.bounds.max.y);
        for lane in &placement.lanes {
            for &index in &lane.node_indices {
                let position = placement.positions.get(index).unwrap();
                assert!(lane.bounds.contains(position));
            }
        }
    }

    #[test]
    fn layers_are_shared_across_lanes() {
        let (graph, placement) = build(
            &[("a", "x"), ("b", "x"), ("c", "y")],
            &[("a", "b"), ("a", "c")],
        );
        let config = LayoutConfig::default();
        let position = |id: &str| {
            placement
                .positions
                .get(graph.index_of(id).unwrap())
                .unwrap()
        };

        assert_eq!(position("a").x, config.padding_x);
        assert_eq!(position("b").x, 1000.0 - config.padding_x);
        assert_eq!(position("b").x, position("c").x);
    }

    #[test]
    fn layer_members_are_centered_in_lane() {
        let (graph, placement) = build(
            &[("root", "x"), ("l", "x"), ("m", "x"), ("r", "x")],
            &[("root", "l"), ("root", "m"), ("root", "r")],
        );
        let config = LayoutConfig::default();
        let lane = &placement.lanes[0];
        let center = lane.bounds.center().y;
        let y = |id: &str| {
            placement
                .positions
                .get(graph.index_of(id).unwrap())
                .unwrap()
                .y
        };

        assert_eq!(lane.bounds.height(), 2.0 * config.node_spacing + 2.0 * config.lane_padding);
        assert_eq!(y("root"), center);
        assert_eq!(y("m"), center);
        assert_eq!(y("l"), center - config.node_spacing);
        assert_eq!(y("r"), center + config.node_spacing);
    }

    #[test]
    fn single_layer_sits_at_horizontal_center() {
        let (_, placement) = build(&[("a", "x"), ("b", "y")], &[]);
        for position in placement.positions.as_slice() {
            assert_eq!(position.x, 500.0);
        }
    }

    #[test]
    fn empty_graph_has_no_lanes() {
        let (_, placement) = build(&[], &[]);
        assert!(placement.lanes.is_empty());
        assert!(placement.positions.is_empty());
        assert_eq!(placement.content_height(), 0.0);
    }
}
