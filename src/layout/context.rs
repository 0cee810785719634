use std::collections::HashMap;

use eframe::egui::{Pos2, Vec2};
use tracing::{debug, info};

use crate::config::ViewerConfig;
use crate::histogram::{HistogramLayout, layout_histogram};
use crate::interaction::{InteractionController, PointerTarget, SelectionCallback};
use crate::topology::{
    EdgeMetrics, GraphShape, LatencyHistogram, NodeMetrics, NodeStatus, TopologyGraph,
    TopologySnapshot,
};
use crate::viewport::{FitOptions, Viewport};

use super::lanes::{Lane, Placement, PositionArena, place_nodes};
use super::layering::{LayerAssignment, assign_layers};

/// Smallest on-screen node radius used for hit testing, in pixels.
const MIN_HIT_RADIUS: f32 = 6.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotUpdate {
    /// Node/edge identities changed: layers, lanes, positions and viewport
    /// were rebuilt.
    Reset,
    /// Same identities: only metric values were merged in place.
    MetricsMerged,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TooltipPayload {
    Node {
        metrics: NodeMetrics,
        status: NodeStatus,
    },
    Edge(EdgeMetrics),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
    pub title: String,
    pub anchor: Pos2,
    pub payload: TooltipPayload,
}

fn distance_to_segment(point: Pos2, start: Pos2, end: Pos2) -> f32 {
    let segment = end - start;
    let length_sq = segment.length_sq();
    if length_sq <= f32::EPSILON {
        return point.distance(start);
    }

    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    point.distance(start + segment * t)
}

/// Owns everything derived from one graph shape: layers, lanes, node
/// positions, the viewport and the pointer state. Built empty, filled by
/// [`TopologyView::apply_snapshot`], dropped with the host view.
#[derive(Debug)]
pub struct TopologyView {
    config: ViewerConfig,
    graph: TopologyGraph,
    shape: GraphShape,
    layers: LayerAssignment,
    placement: Placement,
    viewport: Viewport,
    interaction: InteractionController,
    latency: HashMap<String, LatencyHistogram>,
    layout_pending: bool,
}

impl TopologyView {
    pub fn new(config: ViewerConfig, container: Vec2) -> Self {
        let interaction = InteractionController::new(config.interaction.click_slop);
        Self {
            config,
            graph: TopologyGraph::default(),
            shape: GraphShape::default(),
            layers: LayerAssignment::default(),
            placement: Placement::default(),
            viewport: Viewport::new(container),
            interaction,
            latency: HashMap::new(),
            layout_pending: false,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    pub fn layers(&self) -> &LayerAssignment {
        &self.layers
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.placement.lanes
    }

    pub fn positions(&self) -> &PositionArena {
        &self.placement.positions
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn latency(&self, node_id: &str) -> Option<&LatencyHistogram> {
        self.latency.get(node_id)
    }

    pub fn set_selection_callback(&mut self, callback: SelectionCallback) {
        self.interaction.set_selection_callback(callback);
    }

    /// Replaces the input snapshot. A changed id-set rebuilds the layout; an
    /// unchanged one only merges metric values.
    pub fn apply_snapshot(&mut self, snapshot: TopologySnapshot) -> SnapshotUpdate {
        let TopologySnapshot { graph, latency } = snapshot;
        self.latency = latency;

        let shape = graph.shape();
        if shape == self.shape {
            let updated = self.graph.merge_metrics(&graph);
            debug!(updated, "merged metric-only snapshot");
            return SnapshotUpdate::MetricsMerged;
        }

        self.graph = graph;
        self.shape = shape;
        self.interaction.reset_for(&self.graph);
        self.layout_pending = true;
        self.relayout_if_sized();
        SnapshotUpdate::Reset
    }

    /// Records a new container size. Placement only runs here when a reset is
    /// still waiting for a usable size; otherwise zoom and origin are kept.
    pub fn resize(&mut self, container: Vec2) {
        if self.viewport.container_size() != container {
            self.viewport.set_container_size(container);
        }
        self.relayout_if_sized();
    }

    fn relayout_if_sized(&mut self) {
        let container = self.viewport.container_size();
        if !self.layout_pending || container.x <= 0.0 || container.y <= 0.0 {
            return;
        }
        self.layout_pending = false;

        self.layers = assign_layers(&self.graph);
        self.placement = place_nodes(&self.graph, &self.layers, container.x, &self.config.layout);
        self.viewport.reset();
        self.fit();

        info!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            layers = self.layers.layer_count,
            lanes = self.placement.lanes.len(),
            cyclic = self.layers.cyclic.len(),
            "rebuilt topology layout"
        );
    }

    pub fn is_layout_pending(&self) -> bool {
        self.layout_pending
    }

    fn fit_options(&self) -> FitOptions {
        FitOptions {
            node_radius: self.config.layout.node_radius,
            margin: self.config.viewport.fit_margin,
            max_zoom: self.config.viewport.fit_max_zoom,
        }
    }

    pub fn fit(&mut self) -> bool {
        let options = self.fit_options();
        self.viewport
            .fit_to_content(self.placement.positions.as_slice(), options)
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.viewport.zoom_by(factor);
    }

    pub fn zoom_at(&mut self, factor: f32, anchor: Pos2) {
        self.viewport.zoom_at(factor, anchor);
    }

    pub fn pan_by(&mut self, delta_screen: Vec2) {
        self.viewport.pan_by(delta_screen);
    }

    /// On-screen node radius at the current zoom.
    pub fn node_radius_on_screen(&self) -> f32 {
        self.config.layout.node_radius * self.viewport.zoom()
    }

    pub fn node_screen_position(&self, index: usize) -> Option<Pos2> {
        self.placement
            .positions
            .get(index)
            .map(|position| self.viewport.graph_to_screen(position))
    }

    pub fn node_at(&self, screen: Pos2) -> Option<usize> {
        let radius = self.node_radius_on_screen().max(MIN_HIT_RADIUS);
        self.placement
            .positions
            .as_slice()
            .iter()
            .enumerate()
            .filter_map(|(index, position)| {
                let distance = self.viewport.graph_to_screen(*position).distance(screen);
                (distance <= radius).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Edges are only hit where no node is.
    pub fn edge_at(&self, screen: Pos2) -> Option<usize> {
        if self.node_at(screen).is_some() {
            return None;
        }

        let tolerance = self.config.interaction.edge_hit_tolerance;
        self.graph
            .edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| edge.source != edge.target)
            .filter_map(|(index, edge)| {
                let start = self.node_screen_position(edge.source)?;
                let end = self.node_screen_position(edge.target)?;
                let distance = distance_to_segment(screen, start, end);
                (distance <= tolerance).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Feeds the pointer position while no button is held. `None` means the
    /// pointer left the canvas.
    pub fn pointer_hover(&mut self, screen: Option<Pos2>) {
        if self.interaction.is_captured() {
            return;
        }

        match screen.and_then(|screen| self.node_at(screen)) {
            Some(node) => self.interaction.pointer_enter(&self.graph, node),
            None => self.interaction.pointer_leave(),
        }
    }

    pub fn pointer_down(&mut self, screen: Pos2) {
        let target = self
            .node_at(screen)
            .map_or(PointerTarget::Background, PointerTarget::Node);
        self.interaction
            .pointer_down(target, screen, &self.viewport, &self.placement.positions);
    }

    pub fn pointer_move(&mut self, screen: Pos2) {
        self.interaction
            .pointer_move(screen, &mut self.viewport, &mut self.placement.positions);
    }

    pub fn pointer_up(&mut self, screen: Pos2) -> Option<PointerTarget> {
        let clicked = self.interaction.pointer_up(
            screen,
            &self.graph,
            &mut self.viewport,
            &mut self.placement.positions,
        );
        self.pointer_hover(Some(screen));
        clicked
    }

    /// Same as clicking the node on the canvas, selection callback included.
    pub fn click_node(&mut self, id: &str) {
        if let Some(index) = self.graph.index_of(id) {
            self.interaction.click(PointerTarget::Node(index), &self.graph);
        }
    }

    pub fn select(&mut self, id: Option<&str>) {
        self.interaction.select(&self.graph, id);
    }

    pub fn tooltip(&self, screen: Option<Pos2>) -> Option<Tooltip> {
        if let Some(index) = self.interaction.hovered() {
            let node = self.graph.nodes.get(index)?;
            return Some(Tooltip {
                title: format!("{} ({})", node.name, node.namespace),
                anchor: self.node_screen_position(index)?,
                payload: TooltipPayload::Node {
                    metrics: node.metrics,
                    status: node.status,
                },
            });
        }

        if self.interaction.is_captured() {
            return None;
        }

        let screen = screen?;
        let edge = self.graph.edges.get(self.edge_at(screen)?)?;
        let source = &self.graph.nodes[edge.source];
        let target = &self.graph.nodes[edge.target];
        Some(Tooltip {
            title: format!("{} → {}", source.name, target.name),
            anchor: screen,
            payload: TooltipPayload::Edge(edge.metrics),
        })
    }

    pub fn selected_histogram(&self) -> Option<HistogramLayout> {
        let id = self.interaction.selected_id()?;
        let histogram = self.latency.get(id)?;
        Some(layout_histogram(
            histogram,
            self.config.histogram.min_bar_fraction,
        ))
    }
}
