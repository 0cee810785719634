use eframe::egui::{self, RichText, Ui};

use topology_viewer::util::{format_count, format_latency, format_percent, format_rps};

use super::super::ViewModel;
use super::super::render_utils::status_color;

/// One neighbor row: (node id, display name, edge rps).
type NeighborRow = (String, String, f64);

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let mut navigate_to = None;
        egui::ScrollArea::vertical()
            .id_salt("details_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                navigate_to = self.draw_selected_node(ui);

                ui.separator();
                ui.label(RichText::new("Recent selections").strong());
                if self.recent_selections.is_empty() {
                    ui.label("Nothing selected yet.");
                }
                for id in &self.recent_selections {
                    let Some(node) = self.view.graph().node(id) else {
                        ui.weak(format!("{id} (gone)"));
                        continue;
                    };
                    if ui.link(node.name.as_str()).on_hover_text(id.as_str()).clicked() {
                        navigate_to = Some(id.clone());
                    }
                }
            });

        if let Some(id) = navigate_to {
            self.view.select(Some(&id));
        }
    }

    /// Returns the id of a neighbor the user asked to jump to.
    fn draw_selected_node(&self, ui: &mut Ui) -> Option<String> {
        let Some(index) = self.view.interaction().selected_index() else {
            ui.label("Select a service on the canvas or in the list.");
            return None;
        };
        let graph = self.view.graph();
        let node = graph.nodes.get(index)?;
        let metrics = node.metrics;

        ui.label(RichText::new(node.name.as_str()).strong());
        ui.small(node.id.as_str());
        ui.label(format!("Namespace: {}", node.namespace));
        ui.label(RichText::new(format!("Status: {}", node.status.label())).color(status_color(node.status)));
        if let Some(layer) = self.view.layers().layer(index) {
            ui.label(format!("Layer: {layer}"));
        }
        ui.add_space(4.0);

        egui::Grid::new("node_metrics_grid")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                let rows = [
                    ("Requests/s", format_rps(metrics.rps)),
                    ("p50 latency", format_latency(metrics.p50_latency)),
                    ("p95 latency", format_latency(metrics.p95_latency)),
                    ("p99 latency", format_latency(metrics.p99_latency)),
                    ("Error rate", format_percent(metrics.error_rate)),
                    ("mTLS", format_percent(metrics.mtls_percent)),
                    ("Total requests", format_count(metrics.total_requests)),
                ];
                for (label, value) in rows {
                    ui.label(label);
                    ui.label(value);
                    ui.end_row();
                }
            });

        ui.separator();
        ui.label(RichText::new("Latency distribution").strong());
        match self.view.selected_histogram() {
            Some(layout) => super::histogram::draw_histogram(ui, &layout),
            None => {
                ui.label("No latency histogram for this service.");
            }
        }

        let callers = graph
            .incoming(index)
            .iter()
            .filter_map(|&edge| graph.edges.get(edge))
            .filter_map(|edge| {
                let node = graph.nodes.get(edge.source)?;
                Some((node.id.clone(), node.name.clone(), edge.metrics.rps))
            })
            .collect::<Vec<NeighborRow>>();
        let callees = graph
            .outgoing(index)
            .iter()
            .filter_map(|&edge| graph.edges.get(edge))
            .filter_map(|edge| {
                let node = graph.nodes.get(edge.target)?;
                Some((node.id.clone(), node.name.clone(), edge.metrics.rps))
            })
            .collect::<Vec<NeighborRow>>();

        let mut navigate_to = None;
        for (title, rows) in [("Called by", callers), ("Calls", callees)] {
            ui.separator();
            ui.label(RichText::new(format!("{title} ({})", rows.len())).strong());
            for (id, name, rps) in rows {
                let label = format!("{name}  ({})", format_rps(rps));
                if ui.link(label).on_hover_text(id.as_str()).clicked() {
                    navigate_to = Some(id);
                }
            }
        }

        navigate_to
    }
}
