use std::collections::{BTreeMap, HashSet};

use eframe::egui::{self, Align, Color32, Context, Layout, RichText, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use topology_viewer::layout::SnapshotUpdate;

use super::super::ViewModel;
use super::super::render_utils::status_color;

const ZOOM_STEP_IN: f32 = 1.25;
const ZOOM_STEP_OUT: f32 = 0.8;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl ViewModel {
    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        snapshot_path: &str,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.drain_selections();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui, snapshot_path, reload_requested, is_loading));

        egui::SidePanel::left("services")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| self.draw_node_list(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));

        // Pick up selections made on the canvas during this frame.
        self.drain_selections();
    }

    fn draw_top_bar(
        &mut self,
        ui: &mut Ui,
        snapshot_path: &str,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        ui.horizontal(|ui| {
            ui.heading("topology-viewer");
            ui.separator();
            ui.label(format!("snapshot: {snapshot_path}"));
            ui.label(format!("services: {}", self.view.graph().node_count()));
            ui.label(format!("edges: {}", self.view.graph().edge_count()));
            ui.label(format!("namespaces: {}", self.view.lanes().len()));
            ui.label(format!("layers: {}", self.view.layers().layer_count));

            let cyclic = self.view.layers().cyclic.len();
            if cyclic > 0 {
                ui.label(
                    RichText::new(format!("{cyclic} services on cycles"))
                        .color(Color32::from_rgb(232, 180, 72)),
                )
                .on_hover_text("Services on a dependency cycle are placed in the first layer.");
            }

            ui.separator();
            let reload_button = ui.add_enabled(!is_loading, egui::Button::new("Reload"));
            if reload_button.clicked() {
                *reload_requested = true;
            }
            if ui.button("Fit").clicked() {
                self.view.fit();
            }
            if ui.button("−").on_hover_text("Zoom out").clicked() {
                self.view.zoom_by(ZOOM_STEP_OUT);
            }
            if ui.button("+").on_hover_text("Zoom in").clicked() {
                self.view.zoom_by(ZOOM_STEP_IN);
            }
            ui.label(format!("{:.0}%", self.view.viewport().zoom() * 100.0));

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if let Some(error) = &self.reload_error {
                    ui.label(RichText::new("reload failed").color(Color32::from_rgb(226, 86, 86)))
                        .on_hover_text(error.as_str());
                } else if is_loading {
                    ui.spinner();
                } else {
                    ui.label(match self.last_update {
                        SnapshotUpdate::Reset => "layout rebuilt",
                        SnapshotUpdate::MetricsMerged => "metrics updated",
                    });
                }
            });
        });
    }

    /// Node indices matching the search box, empty when the query is empty.
    pub(in crate::app) fn search_matches(&self) -> HashSet<usize> {
        let query = self.search.trim();
        if query.is_empty() {
            return HashSet::new();
        }

        let matcher = SkimMatcherV2::default();
        self.view
            .graph()
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| fuzzy_match_score(&matcher, &node.name, query).is_some())
            .map(|(index, _)| index)
            .collect()
    }

    fn draw_node_list(&mut self, ui: &mut Ui) {
        ui.heading("Services");
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.label("Filter:");
            ui.text_edit_singleline(&mut self.search);
        });
        ui.add_space(6.0);

        let query = self.search.trim().to_owned();
        let matcher = SkimMatcherV2::default();
        let mut by_namespace: BTreeMap<&str, Vec<(i64, usize)>> = BTreeMap::new();
        for (index, node) in self.view.graph().nodes.iter().enumerate() {
            let score = if query.is_empty() {
                Some(0)
            } else {
                fuzzy_match_score(&matcher, &node.name, &query)
                    .or_else(|| fuzzy_match_score(&matcher, &node.id, &query))
            };
            if let Some(score) = score {
                by_namespace
                    .entry(node.namespace.as_str())
                    .or_default()
                    .push((score, index));
            }
        }

        if by_namespace.is_empty() {
            ui.label("No services match the filter.");
            return;
        }

        let selected = self.view.interaction().selected_index();
        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("service_list_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (namespace, mut entries) in by_namespace {
                    entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
                    egui::CollapsingHeader::new(format!("{namespace} ({})", entries.len()))
                        .default_open(true)
                        .show(ui, |ui| {
                            for (_, index) in entries {
                                let node = &self.view.graph().nodes[index];
                                let label = RichText::new(format!("● {}", node.name))
                                    .color(status_color(node.status));
                                let response = ui
                                    .selectable_label(selected == Some(index), label)
                                    .on_hover_text(node.id.as_str());
                                if response.clicked() {
                                    clicked = Some(node.id.clone());
                                }
                            }
                        });
                }
            });

        if let Some(id) = clicked {
            self.view.click_node(&id);
        }
    }
}
