use eframe::egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, vec2};

use topology_viewer::histogram::{HistogramLayout, Percentile};
use topology_viewer::util::format_latency;

const PLOT_HEIGHT: f32 = 120.0;
const AXIS_HEIGHT: f32 = 18.0;
const BAR_COLOR: Color32 = Color32::from_rgb(96, 156, 222);
const BAR_HOVER_COLOR: Color32 = Color32::from_rgb(146, 196, 250);

fn marker_color(percentile: Percentile) -> Color32 {
    match percentile {
        Percentile::P50 => Color32::from_rgb(84, 186, 124),
        Percentile::P95 => Color32::from_rgb(232, 180, 72),
        Percentile::P99 => Color32::from_rgb(226, 86, 86),
    }
}

/// Paints a log-scale histogram. Hovering a bar shows its bucket range and
/// count underneath.
pub(super) fn draw_histogram(ui: &mut Ui, layout: &HistogramLayout) {
    let width = ui.available_width().max(120.0);
    let (rect, response) =
        ui.allocate_exact_size(vec2(width, PLOT_HEIGHT + AXIS_HEIGHT), Sense::hover());
    let painter = ui.painter_at(rect);
    let plot = Rect::from_min_size(rect.min, vec2(rect.width(), PLOT_HEIGHT));

    let x_at = |position: f64| plot.left() + (position as f32 / 100.0) * plot.width();

    painter.rect_filled(plot, 2.0, Color32::from_rgb(24, 28, 35));

    let hovered = response
        .hover_pos()
        .filter(|pointer| plot.contains(*pointer))
        .and_then(|pointer| {
            let position = ((pointer.x - plot.left()) / plot.width() * 100.0) as f64;
            layout.bucket_at(position)
        });

    for bar in &layout.bars {
        if bar.height <= 0.0 {
            continue;
        }
        let top = plot.bottom() - bar.height as f32 * PLOT_HEIGHT;
        let bar_rect = Rect::from_min_max(
            Pos2::new(x_at(bar.start) + 0.5, top),
            Pos2::new((x_at(bar.end) - 0.5).max(x_at(bar.start) + 1.0), plot.bottom()),
        );
        let color = if hovered.is_some_and(|hovered| hovered == bar) {
            BAR_HOVER_COLOR
        } else {
            BAR_COLOR
        };
        painter.rect_filled(bar_rect, 0.0, color);
    }

    for tick in &layout.ticks {
        let x = x_at(tick.position);
        painter.line_segment(
            [Pos2::new(x, plot.bottom()), Pos2::new(x, plot.bottom() + 4.0)],
            Stroke::new(1.0, Color32::from_gray(140)),
        );
        painter.text(
            Pos2::new(x, plot.bottom() + 4.0),
            Align2::CENTER_TOP,
            tick.label.as_str(),
            FontId::proportional(10.0),
            Color32::from_gray(160),
        );
    }

    for marker in &layout.markers {
        let x = x_at(marker.position);
        let color = marker_color(marker.percentile);
        painter.line_segment(
            [Pos2::new(x, plot.top()), Pos2::new(x, plot.bottom())],
            Stroke::new(1.5, color),
        );
        painter.text(
            Pos2::new(x + 3.0, plot.top() + 2.0),
            Align2::LEFT_TOP,
            marker.percentile.label(),
            FontId::proportional(10.0),
            color,
        );
    }

    let mut lower = layout.axis.lo;
    let readout = layout.bars.iter().find_map(|bar| {
        let range = (lower, bar.upper_bound_ms);
        lower = bar.upper_bound_ms;
        hovered
            .is_some_and(|hovered| hovered == bar)
            .then(|| {
                format!(
                    "{} to {}: {} requests",
                    format_latency(range.0),
                    format_latency(range.1),
                    bar.count
                )
            })
    });
    match readout {
        Some(readout) => ui.label(readout),
        None => ui.weak(format!("{} requests", layout.total_count)),
    };
    if layout.overflow_count > 0 {
        let last = layout.bars.last().map_or(layout.axis.hi, |bar| bar.upper_bound_ms);
        ui.weak(format!(
            "{} requests above {}",
            layout.overflow_count,
            format_latency(last)
        ));
    }

    for marker in &layout.markers {
        let suffix = if marker.estimated { " (estimated)" } else { "" };
        ui.label(format!(
            "{}: {}{suffix}",
            marker.percentile.label(),
            format_latency(marker.value_ms)
        ));
    }
}
