use eframe::egui::{self, Pos2, Rect, Ui};

use super::super::ViewModel;

/// Canvas-local coordinates: the controller expects points relative to the
/// container's top-left corner.
pub(super) fn to_local(rect: Rect, pointer: Pos2) -> Pos2 {
    (pointer - rect.min).to_pos2()
}

pub(super) fn to_screen(rect: Rect, local: Pos2) -> Pos2 {
    rect.min + local.to_vec2()
}

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.view.zoom_at(zoom_factor, to_local(rect, pointer));
    }

    /// Feeds raw primary-button events to the controller. Presses only start
    /// a gesture over the canvas; a captured gesture keeps tracking the
    /// pointer even when it leaves the canvas.
    pub(in crate::app) fn handle_graph_pointer(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        let (pressed, released, down, latest) = ui.input(|input| {
            (
                input.pointer.primary_pressed(),
                input.pointer.primary_released(),
                input.pointer.primary_down(),
                input.pointer.latest_pos(),
            )
        });

        let Some(pointer) = latest else {
            self.view.pointer_hover(None);
            return;
        };
        let local = to_local(rect, pointer);

        if pressed && response.hovered() {
            self.view.pointer_down(local);
        }

        if self.view.interaction().is_captured() {
            self.view.pointer_move(local);
            if released || !down {
                self.view.pointer_up(local);
            }
        } else if response.hovered() {
            self.view.pointer_hover(Some(local));
        } else {
            self.view.pointer_hover(None);
        }

        let interaction = self.view.interaction();
        let cursor = if interaction.is_captured() {
            Some(egui::CursorIcon::Grabbing)
        } else if interaction.hovered().is_some() {
            Some(egui::CursorIcon::PointingHand)
        } else {
            None
        };
        if let Some(cursor) = cursor {
            ui.output_mut(|output| {
                output.cursor_icon = cursor;
            });
        }
    }
}
