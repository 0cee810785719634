//! Pointer state machine: hover highlight, node drag, background pan and
//! persistent selection.

use std::fmt;

use eframe::egui::{Pos2, Vec2};
use tracing::{debug, trace};

use crate::layout::PositionArena;
use crate::topology::{Adjacency, TopologyGraph};
use crate::viewport::Viewport;

pub type SelectionCallback = Box<dyn FnMut(&str)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerTarget {
    Node(usize),
    Background,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InteractionState {
    Idle,
    HoveringNode { node: usize },
    Dragging { node: usize, offset: Vec2 },
    Panning { last_screen: Pos2, start_origin: Pos2 },
}

/// A node together with its one-hop neighborhood.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Highlight {
    pub node: usize,
    pub adjacency: Adjacency,
}

impl Highlight {
    fn compute(graph: &TopologyGraph, node: usize) -> Self {
        Self {
            node,
            adjacency: graph.one_hop(node),
        }
    }

    pub fn contains_node(&self, index: usize) -> bool {
        self.node == index || self.adjacency.nodes.contains(&index)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Emphasis {
    pub hovered: bool,
    pub hover_adjacent: bool,
    pub selected: bool,
    pub selection_adjacent: bool,
}

impl Emphasis {
    pub fn any(self) -> bool {
        self.hovered || self.hover_adjacent || self.selected || self.selection_adjacent
    }
}

#[derive(Clone, Copy, Debug)]
struct Press {
    target: PointerTarget,
    origin: Pos2,
    travelled: f32,
    last: Pos2,
    /// Graph position of the pressed node, restored when the press ends as a
    /// click.
    node_start: Option<Pos2>,
}

pub struct InteractionController {
    state: InteractionState,
    hover: Option<Highlight>,
    selected: Option<String>,
    selection: Option<Highlight>,
    press: Option<Press>,
    click_slop: f32,
    on_select: Option<SelectionCallback>,
}

impl fmt::Debug for InteractionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionController")
            .field("state", &self.state)
            .field("selected", &self.selected)
            .field("click_slop", &self.click_slop)
            .finish_non_exhaustive()
    }
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl InteractionController {
    pub fn new(click_slop: f32) -> Self {
        Self {
            state: InteractionState::Idle,
            hover: None,
            selected: None,
            selection: None,
            press: None,
            click_slop,
            on_select: None,
        }
    }

    pub fn set_selection_callback(&mut self, callback: SelectionCallback) {
        self.on_select = Some(callback);
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn hovered(&self) -> Option<usize> {
        match self.state {
            InteractionState::HoveringNode { node } => Some(node),
            _ => None,
        }
    }

    pub fn dragging(&self) -> Option<usize> {
        match self.state {
            InteractionState::Dragging { node, .. } => Some(node),
            _ => None,
        }
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.state, InteractionState::Panning { .. })
    }

    /// True while a drag or pan owns the pointer.
    pub fn is_captured(&self) -> bool {
        matches!(
            self.state,
            InteractionState::Dragging { .. } | InteractionState::Panning { .. }
        )
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selection.as_ref().map(|highlight| highlight.node)
    }

    pub fn hover_highlight(&self) -> Option<&Highlight> {
        self.hover.as_ref()
    }

    pub fn selection_highlight(&self) -> Option<&Highlight> {
        self.selection.as_ref()
    }

    pub fn pointer_enter(&mut self, graph: &TopologyGraph, node: usize) {
        if node >= graph.node_count() {
            return;
        }
        match self.state {
            InteractionState::Idle => {}
            InteractionState::HoveringNode { node: current } if current != node => {}
            _ => return,
        }

        self.hover = Some(Highlight::compute(graph, node));
        self.state = InteractionState::HoveringNode { node };
        trace!(node, "hover enter");
    }

    pub fn pointer_leave(&mut self) {
        if let InteractionState::HoveringNode { .. } = self.state {
            self.hover = None;
            self.state = InteractionState::Idle;
        }
    }

    pub fn pointer_down(
        &mut self,
        target: PointerTarget,
        screen: Pos2,
        viewport: &Viewport,
        positions: &PositionArena,
    ) {
        if self.is_captured() {
            return;
        }

        self.hover = None;
        let node_start = match target {
            PointerTarget::Node(node) => positions.get(node),
            PointerTarget::Background => None,
        };
        self.state = match target {
            PointerTarget::Node(node) => match positions.get(node) {
                Some(position) => InteractionState::Dragging {
                    node,
                    offset: viewport.screen_to_graph(screen) - position,
                },
                None => InteractionState::Idle,
            },
            PointerTarget::Background => InteractionState::Panning {
                last_screen: screen,
                start_origin: viewport.origin(),
            },
        };

        if self.state == InteractionState::Idle {
            return;
        }
        self.press = Some(Press {
            target,
            origin: screen,
            travelled: 0.0,
            last: screen,
            node_start,
        });
    }

    pub fn pointer_move(
        &mut self,
        screen: Pos2,
        viewport: &mut Viewport,
        positions: &mut PositionArena,
    ) {
        if let Some(press) = self.press.as_mut() {
            press.travelled += press.last.distance(screen);
            press.last = screen;
        }

        match &mut self.state {
            InteractionState::Dragging { node, offset } => {
                positions.set(*node, viewport.screen_to_graph(screen) - *offset);
            }
            InteractionState::Panning { last_screen, .. } => {
                viewport.pan_by(screen - *last_screen);
                *last_screen = screen;
            }
            InteractionState::Idle | InteractionState::HoveringNode { .. } => {}
        }
    }

    /// Ends a drag or pan. When the pointer barely moved since it was pressed
    /// the gesture counts as a click, which is applied and returned.
    pub fn pointer_up(
        &mut self,
        screen: Pos2,
        graph: &TopologyGraph,
        viewport: &mut Viewport,
        positions: &mut PositionArena,
    ) -> Option<PointerTarget> {
        let press = self.press.take()?;
        if self.is_captured() {
            self.pointer_move(screen, viewport, positions);
        }
        self.state = InteractionState::Idle;

        let moved = press.travelled.max(press.origin.distance(screen));
        if moved < self.click_slop {
            if let (PointerTarget::Node(node), Some(start)) = (press.target, press.node_start) {
                positions.set(node, start);
            }
            self.click(press.target, graph);
            Some(press.target)
        } else {
            None
        }
    }

    /// Toggles the selection on node clicks and clears it on background
    /// clicks. Only node clicks reach the selection callback.
    pub fn click(&mut self, target: PointerTarget, graph: &TopologyGraph) {
        match target {
            PointerTarget::Node(node) => {
                let Some(id) = graph.nodes.get(node).map(|node| node.id.clone()) else {
                    return;
                };

                if self.selected.as_deref() == Some(id.as_str()) {
                    self.clear_selection();
                } else {
                    self.selection = Some(Highlight::compute(graph, node));
                    self.selected = Some(id.clone());
                    debug!(node = %id, "node selected");
                }

                if let Some(callback) = self.on_select.as_mut() {
                    callback(&id);
                }
            }
            PointerTarget::Background => self.clear_selection(),
        }
    }

    /// Selects a node without going through the pointer (side lists, deep
    /// links). Does not fire the selection callback.
    pub fn select(&mut self, graph: &TopologyGraph, id: Option<&str>) {
        match id.and_then(|id| graph.index_of(id)) {
            Some(node) => {
                self.selection = Some(Highlight::compute(graph, node));
                self.selected = Some(graph.nodes[node].id.clone());
            }
            None => self.clear_selection(),
        }
    }

    fn clear_selection(&mut self) {
        if self.selected.take().is_some() {
            debug!("selection cleared");
        }
        self.selection = None;
    }

    /// Re-binds state to a freshly built graph. Transient pointer state is
    /// dropped; the selection survives when its id still exists.
    pub fn reset_for(&mut self, graph: &TopologyGraph) {
        self.state = InteractionState::Idle;
        self.hover = None;
        self.press = None;
        let selected = self.selected.take();
        self.select(graph, selected.as_deref());
    }

    pub fn node_emphasis(&self, index: usize) -> Emphasis {
        let hovered = self.hover.as_ref();
        let selected = self.selection.as_ref();
        Emphasis {
            hovered: hovered.is_some_and(|highlight| highlight.node == index),
            hover_adjacent: hovered.is_some_and(|highlight| highlight.adjacency.nodes.contains(&index)),
            selected: selected.is_some_and(|highlight| highlight.node == index),
            selection_adjacent: selected
                .is_some_and(|highlight| highlight.adjacency.nodes.contains(&index)),
        }
    }

    /// An edge is emphasized when one of its endpoints is the hovered or
    /// selected node.
    pub fn edge_emphasis(&self, edge_index: usize) -> Emphasis {
        let hover_edge = self
            .hover
            .as_ref()
            .is_some_and(|highlight| highlight.adjacency.edges.contains(&edge_index));
        let selection_edge = self
            .selection
            .as_ref()
            .is_some_and(|highlight| highlight.adjacency.edges.contains(&edge_index));
        Emphasis {
            hovered: false,
            hover_adjacent: hover_edge,
            selected: false,
            selection_adjacent: selection_edge,
        }
    }

    /// Whether any hover or selection highlight is active, in which case
    /// everything not emphasized is drawn dimmed.
    pub fn has_highlight(&self) -> bool {
        self.hover.is_some() || self.selection.is_some()
    }
}
