//! Deterministic layout: longest-path layers on the x axis, one horizontal
//! swim lane per namespace on the y axis.

mod context;
mod lanes;
mod layering;

pub use context::{SnapshotUpdate, Tooltip, TooltipPayload, TopologyView};
pub use lanes::{Lane, Placement, PositionArena, place_nodes};
pub use layering::{LayerAssignment, assign_layers, layer_indices};
