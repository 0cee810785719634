use std::collections::HashSet;

use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Shape, Stroke, Ui, vec2};

use topology_viewer::interaction::Emphasis;
use topology_viewer::layout::{Tooltip, TooltipPayload};
use topology_viewer::util::{format_count, format_latency, format_percent, format_rps};

use super::super::ViewModel;
use super::super::render_utils::{
    blend_color, circle_visible, dim_color, draw_background, edge_visible, edge_width,
    status_color,
};
use super::interaction::{to_local, to_screen};

const EDGE_COLOR: Color32 = Color32::from_rgba_premultiplied(94, 104, 116, 200);
const EDGE_ERROR_COLOR: Color32 = Color32::from_rgb(226, 86, 86);
const EMPHASIS_COLOR: Color32 = Color32::from_rgb(241, 146, 94);
const SELECTED_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
const MATCH_COLOR: Color32 = Color32::from_rgb(106, 198, 255);
const DIM_FACTOR: f32 = 0.35;

/// Tint for emphasized items. Selection outranks hover.
fn emphasis_tint(emphasis: Emphasis) -> Option<Color32> {
    if emphasis.selected || emphasis.selection_adjacent {
        Some(SELECTED_COLOR)
    } else if emphasis.hovered || emphasis.hover_adjacent {
        Some(EMPHASIS_COLOR)
    } else {
        None
    }
}

fn emphasized_color(base: Color32, emphasis: Emphasis, dimmed: bool) -> Color32 {
    if let Some(tint) = emphasis_tint(emphasis) {
        blend_color(base, tint, 0.55)
    } else if dimmed {
        dim_color(base, DIM_FACTOR)
    } else {
        base
    }
}

fn tooltip_text(tooltip: &Tooltip) -> String {
    match tooltip.payload {
        TooltipPayload::Node { metrics, status } => format!(
            "{}\nstatus    {}\nrps       {}\np50       {}\np95       {}\np99       {}\nerrors    {}\nmTLS      {}\nrequests  {}",
            tooltip.title,
            status.label(),
            format_rps(metrics.rps),
            format_latency(metrics.p50_latency),
            format_latency(metrics.p95_latency),
            format_latency(metrics.p99_latency),
            format_percent(metrics.error_rate),
            format_percent(metrics.mtls_percent),
            format_count(metrics.total_requests),
        ),
        TooltipPayload::Edge(metrics) => format!(
            "{}\nrps       {}\nlatency   {}\nerrors    {}\ncalls     {}",
            tooltip.title,
            format_rps(metrics.rps),
            format_latency(metrics.avg_latency),
            format_percent(metrics.error_rate),
            format_count(metrics.call_count),
        ),
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.view.resize(rect.size());

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pointer(ui, rect, &response);

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.view.viewport());

        if self.view.graph().is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "The snapshot contains no services.",
                FontId::proportional(16.0),
                Color32::from_gray(170),
            );
            return;
        }

        let matches = self.search_matches();
        self.draw_lanes(&painter, rect);
        self.draw_edges(&painter, rect);
        self.draw_nodes(&painter, rect, &matches);

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer))
            .map(|pointer| to_local(rect, pointer));
        if let Some(tooltip) = self.view.tooltip(pointer) {
            draw_tooltip(&painter, rect, &tooltip);
        }

        if self.view.interaction().is_captured() {
            ui.ctx().request_repaint();
        }
    }

    fn draw_lanes(&self, painter: &Painter, rect: Rect) {
        let viewport = self.view.viewport();
        for (index, lane) in self.view.lanes().iter().enumerate() {
            let min = to_screen(rect, viewport.graph_to_screen(lane.bounds.min));
            let max = to_screen(rect, viewport.graph_to_screen(lane.bounds.max));
            let band = Rect::from_min_max(min, max);
            if !band.intersects(rect) {
                continue;
            }

            let fill = if index % 2 == 0 {
                Color32::from_rgba_unmultiplied(46, 56, 70, 60)
            } else {
                Color32::from_rgba_unmultiplied(36, 44, 56, 60)
            };
            painter.rect_filled(band, 6.0, fill);
            painter.text(
                Pos2::new(band.left().max(rect.left()) + 8.0, band.top() + 6.0),
                Align2::LEFT_TOP,
                lane.namespace.as_str(),
                FontId::proportional(13.0),
                Color32::from_rgba_unmultiplied(170, 182, 198, 200),
            );
        }
    }

    fn draw_edges(&self, painter: &Painter, rect: Rect) {
        let graph = self.view.graph();
        let interaction = self.view.interaction();
        let zoom = self.view.viewport().zoom();
        let radius = self.view.node_radius_on_screen();
        let dimmed = interaction.has_highlight();
        let max_rps = graph
            .edges
            .iter()
            .map(|edge| edge.metrics.rps)
            .fold(0.0_f64, f64::max);

        for (index, edge) in graph.edges.iter().enumerate() {
            let (Some(start), Some(end)) = (
                self.view.node_screen_position(edge.source),
                self.view.node_screen_position(edge.target),
            ) else {
                continue;
            };
            let (start, end) = (to_screen(rect, start), to_screen(rect, end));

            let emphasis = interaction.edge_emphasis(index);
            let base = if edge.metrics.error_rate >= 1.0 {
                blend_color(EDGE_COLOR, EDGE_ERROR_COLOR, 0.7)
            } else {
                EDGE_COLOR
            };
            let color = emphasized_color(base, emphasis, dimmed);
            let mut width = edge_width(edge.metrics.rps, max_rps, zoom);
            if emphasis.selection_adjacent {
                width *= 1.7;
            } else if emphasis.hover_adjacent {
                width *= 1.4;
            }
            let stroke = Stroke::new(width, color);

            if edge.source == edge.target || !edge_visible(rect, start, end, width) {
                continue;
            }

            let direction = (end - start).normalized();
            let tail = start + direction * radius;
            let tip = end - direction * radius;
            if (tip - tail).dot(direction) <= 0.0 {
                continue;
            }

            let head = (6.0 + width * 1.5).min((tip - tail).length() * 0.5);
            let normal = direction.rot90() * head * 0.5;
            let base_center = tip - direction * head;
            painter.line_segment([tail, base_center], stroke);
            painter.add(Shape::convex_polygon(
                vec![tip, base_center + normal, base_center - normal],
                color,
                Stroke::NONE,
            ));
        }
    }

    fn draw_nodes(&self, painter: &Painter, rect: Rect, matches: &HashSet<usize>) {
        let graph = self.view.graph();
        let interaction = self.view.interaction();
        let zoom = self.view.viewport().zoom();
        let radius = self.view.node_radius_on_screen();
        let dimmed = interaction.has_highlight();
        let show_labels = zoom >= 0.5;

        for (index, node) in graph.nodes.iter().enumerate() {
            let Some(position) = self.view.node_screen_position(index) else {
                continue;
            };
            let position = to_screen(rect, position);
            if !circle_visible(rect, position, radius + 24.0) {
                continue;
            }

            let emphasis = interaction.node_emphasis(index);
            let fill = if dimmed && !emphasis.any() {
                dim_color(status_color(node.status), DIM_FACTOR)
            } else {
                status_color(node.status)
            };

            let stroke = if emphasis.selected {
                Stroke::new(3.0, SELECTED_COLOR)
            } else if emphasis.hovered {
                Stroke::new(2.5, Color32::WHITE)
            } else if emphasis.selection_adjacent {
                Stroke::new(2.0, SELECTED_COLOR)
            } else if emphasis.hover_adjacent {
                Stroke::new(1.5, EMPHASIS_COLOR)
            } else {
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(15, 18, 22, 200))
            };

            painter.circle(position, radius, fill, stroke);
            if matches.contains(&index) {
                painter.circle_stroke(position, radius + 4.0, Stroke::new(1.5, MATCH_COLOR));
            }

            if show_labels {
                let text_color = if dimmed && !emphasis.any() {
                    Color32::from_gray(110)
                } else {
                    Color32::from_gray(220)
                };
                painter.text(
                    position + vec2(0.0, radius + 4.0),
                    Align2::CENTER_TOP,
                    node.name.as_str(),
                    FontId::proportional((11.0 * zoom.sqrt()).clamp(9.0, 15.0)),
                    text_color,
                );
            }
        }
    }
}

fn draw_tooltip(painter: &Painter, rect: Rect, tooltip: &Tooltip) {
    let galley = painter.layout_no_wrap(
        tooltip_text(tooltip),
        FontId::monospace(12.0),
        Color32::from_gray(230),
    );

    let padding = vec2(8.0, 6.0);
    let size = galley.size() + padding * 2.0;
    let mut min = to_screen(rect, tooltip.anchor) + vec2(16.0, 16.0);
    if min.x + size.x > rect.right() {
        min.x = (rect.right() - size.x).max(rect.left());
    }
    if min.y + size.y > rect.bottom() {
        min.y = (rect.bottom() - size.y).max(rect.top());
    }

    let frame = Rect::from_min_size(min, size);
    painter.rect_filled(frame, 4.0, Color32::from_rgba_unmultiplied(12, 14, 18, 235));
    painter.galley(frame.min + padding, galley, Color32::from_gray(230));
}
