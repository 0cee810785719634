//! Zoom/pan state and the screen <-> graph coordinate transform.
//!
//! Screen points are relative to the top-left corner of the container. The
//! transform is `graph = origin + screen / zoom`, so `origin` is the graph
//! point shown at the container's top-left corner.

use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};
use tracing::debug;

pub const MIN_ZOOM: f32 = 0.2;
pub const MAX_ZOOM: f32 = 4.0;

/// Extra space around content when fitting, on top of the node radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitOptions {
    pub node_radius: f32,
    pub margin: f32,
    pub max_zoom: f32,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            node_radius: 18.0,
            margin: 40.0,
            max_zoom: MAX_ZOOM,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    zoom: f32,
    origin: Pos2,
    container: Vec2,
}

impl Viewport {
    pub fn new(container: Vec2) -> Self {
        Self {
            zoom: 1.0,
            origin: Pos2::ZERO,
            container,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn origin(&self) -> Pos2 {
        self.origin
    }

    pub fn container_size(&self) -> Vec2 {
        self.container
    }

    /// Updates the container size only. Zoom and origin are kept as they are.
    pub fn set_container_size(&mut self, container: Vec2) {
        self.container = container;
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.origin = Pos2::ZERO;
    }

    pub fn screen_to_graph(&self, screen: Pos2) -> Pos2 {
        self.origin + screen.to_vec2() / self.zoom
    }

    pub fn graph_to_screen(&self, graph: Pos2) -> Pos2 {
        ((graph - self.origin) * self.zoom).to_pos2()
    }

    /// Graph-space rectangle currently visible in the container.
    pub fn visible_bounds(&self) -> Rect {
        Rect::from_min_max(self.origin, self.origin + self.container / self.zoom)
    }

    /// Zooms around the container center.
    pub fn zoom_by(&mut self, factor: f32) {
        let center = (self.container * 0.5).to_pos2();
        self.zoom_at(factor, center);
    }

    /// Zooms so that the graph point under `anchor` stays under `anchor`.
    pub fn zoom_at(&mut self, factor: f32, anchor: Pos2) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }

        let anchored = self.screen_to_graph(anchor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.origin = anchored - anchor.to_vec2() / self.zoom;
    }

    /// Moves the view by a screen-space delta, 1:1 at any zoom level.
    pub fn pan_by(&mut self, delta_screen: Vec2) {
        self.origin -= delta_screen / self.zoom;
    }

    /// Fits every position into the container and centers it. Returns `false`
    /// and leaves the viewport untouched when there is nothing to fit.
    pub fn fit_to_content(&mut self, positions: &[Pos2], options: FitOptions) -> bool {
        let Some(first) = positions.first() else {
            return false;
        };
        if self.container.x <= 0.0 || self.container.y <= 0.0 {
            return false;
        }

        let (mut min, mut max) = (*first, *first);
        for position in &positions[1..] {
            min = min.min(*position);
            max = max.max(*position);
        }

        let center = pos2((min.x + max.x) * 0.5, (min.y + max.y) * 0.5);
        let raw_extent = max - min;

        let zoom = if raw_extent.x <= f32::EPSILON && raw_extent.y <= f32::EPSILON {
            1.0
        } else {
            let pad = options.node_radius + options.margin;
            let content = raw_extent + vec2(pad, pad) * 2.0;
            (self.container.x / content.x)
                .min(self.container.y / content.y)
                .min(options.max_zoom)
        };

        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.origin = center - self.container * 0.5 / self.zoom;

        debug!(zoom = self.zoom, origin = ?self.origin, "fitted viewport to content");
        true
    }
}
