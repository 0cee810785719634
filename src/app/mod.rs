use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use eframe::egui::{self, Context};
use tracing::{info, warn};

use topology_viewer::config::ViewerConfig;
use topology_viewer::layout::{SnapshotUpdate, TopologyView};
use topology_viewer::topology::{TopologySnapshot, load_snapshot};

mod graph;
mod render_utils;
mod ui;

type LoadResult = Result<TopologySnapshot, String>;

pub struct TopologyApp {
    snapshot_path: PathBuf,
    config: ViewerConfig,
    refresh: Option<Duration>,
    last_load: Instant,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    view: TopologyView,
    search: String,
    selections_rx: Receiver<String>,
    recent_selections: VecDeque<String>,
    last_update: SnapshotUpdate,
    reload_error: Option<String>,
}

impl TopologyApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        snapshot_path: PathBuf,
        config: ViewerConfig,
        refresh: Option<Duration>,
    ) -> Self {
        let state = Self::start_load(snapshot_path.clone());
        Self {
            snapshot_path,
            config,
            refresh,
            last_load: Instant::now(),
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(snapshot_path: PathBuf) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_snapshot(&snapshot_path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(snapshot_path: PathBuf) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(snapshot_path),
        }
    }

    fn refresh_due(&self) -> bool {
        self.refresh
            .is_some_and(|interval| self.last_load.elapsed() >= interval)
    }

    fn request_reload(&mut self) {
        if self.reload_rx.is_none() {
            self.last_load = Instant::now();
            self.reload_rx = Some(Self::spawn_load(self.snapshot_path.clone()));
        }
    }
}

impl eframe::App for TopologyApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let snapshot_label = self.snapshot_path.display().to_string();

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(snapshot)) => {
                        let model = ViewModel::new(self.config.clone(), snapshot);
                        transition = Some(AppState::Ready(Box::new(model)));
                    }
                    Ok(Err(error)) => transition = Some(AppState::Error(error)),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading service topology...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load service topology");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.snapshot_path.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &snapshot_label, &mut reload_requested, is_reloading);

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(snapshot)) => model.apply_snapshot(snapshot),
                        Ok(Err(error)) => {
                            warn!(%error, "snapshot reload failed, keeping the current graph");
                            model.reload_error = Some(error);
                        }
                        Err(TryRecvError::Empty) => self.reload_rx = Some(rx),
                        Err(TryRecvError::Disconnected) => {
                            model.reload_error =
                                Some("Background load worker disconnected".to_owned());
                        }
                    }
                }

                if reload_requested {
                    self.request_reload();
                }
            }
        }

        if matches!(self.state, AppState::Ready(_)) && self.refresh_due() {
            self.request_reload();
        }
        if let Some(interval) = self.refresh {
            ctx.request_repaint_after(interval);
        }
        if self.reload_rx.is_some() {
            ctx.request_repaint();
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.last_load = Instant::now();
            self.state = next_state;
        }
    }
}

impl ViewModel {
    const RECENT_SELECTIONS: usize = 8;

    fn new(config: ViewerConfig, snapshot: TopologySnapshot) -> Self {
        let (tx, selections_rx) = mpsc::channel();
        let mut view = TopologyView::new(config, egui::Vec2::ZERO);
        view.set_selection_callback(Box::new(move |id: &str| {
            let _ = tx.send(id.to_owned());
        }));
        let last_update = view.apply_snapshot(snapshot);

        Self {
            view,
            search: String::new(),
            selections_rx,
            recent_selections: VecDeque::new(),
            last_update,
            reload_error: None,
        }
    }

    fn apply_snapshot(&mut self, snapshot: TopologySnapshot) {
        self.reload_error = None;
        self.last_update = self.view.apply_snapshot(snapshot);
        if self.last_update == SnapshotUpdate::Reset {
            info!("topology shape changed, layout rebuilt");
        }
    }

    fn drain_selections(&mut self) {
        while let Ok(id) = self.selections_rx.try_recv() {
            self.recent_selections.retain(|recent| recent != &id);
            self.recent_selections.push_front(id);
            self.recent_selections.truncate(Self::RECENT_SELECTIONS);
        }
    }
}
