use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub interaction: InteractionConfig,
    pub histogram: HistogramConfig,
}

/// Swim-lane geometry, in graph-space pixels.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub padding_x: f32,
    pub lane_padding: f32,
    pub node_spacing: f32,
    pub lane_gap: f32,
    pub node_radius: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding_x: 80.0,
            lane_padding: 40.0,
            node_spacing: 70.0,
            lane_gap: 24.0,
            node_radius: 18.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub fit_margin: f32,
    pub fit_max_zoom: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            fit_margin: 40.0,
            fit_max_zoom: crate::viewport::MAX_ZOOM,
        }
    }
}

/// Pointer tolerances, in screen pixels.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub click_slop: f32,
    pub edge_hit_tolerance: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            click_slop: 4.0,
            edge_hit_tolerance: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    pub min_bar_fraction: f64,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            min_bar_fraction: 0.02,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = serde_json::from_str::<Self>(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;

        info!(path = %path.display(), "loaded viewer config");
        Ok(config)
    }
}
