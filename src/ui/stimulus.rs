use egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2, pos2};

use illusion::config::DisplayConfig;
use illusion::experiment::stimulus::line_segments;
use illusion::experiment::variables::StimulusParams;

pub fn draw_fixation(painter: &Painter, center: Pos2, size: f32) {
    let rect = Rect::from_center_size(center, Vec2::splat(size));
    painter.rect_filled(rect, 0.0, Color32::BLACK);
}

/// Radial lines for `frame`, centered on `rect`, plus the fixation point.
pub fn draw_stimulus(
    painter: &Painter,
    rect: Rect,
    params: &StimulusParams,
    frame: u64,
    display: &DisplayConfig,
) {
    let center = rect.center();
    let stroke = Stroke::new(display.line_width, Color32::BLACK);
    for (inner, outer) in line_segments(params, display.n_lines, frame, [center.x, center.y]) {
        painter.line_segment([pos2(inner[0], inner[1]), pos2(outer[0], outer[1])], stroke);
    }
    draw_fixation(painter, center, display.fixation_size);
}
