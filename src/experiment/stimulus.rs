//! Radial-line stimulus geometry.
//!
//! `n_lines` segments sit on a circle around the fixation point. Each segment
//! starts on the circle and leans `line_angle` degrees away from the radius.
//! The circle breathes: it grows for the first half of the animation period
//! and shrinks back for the second half.

use crate::experiment::variables::StimulusParams;

pub type Point = [f32; 2];

/// Polar to rectangular, angle in degrees.
pub fn pol_to_rect(r: f32, theta_deg: f32) -> Point {
    let theta = theta_deg.to_radians();
    [r * theta.cos(), r * theta.sin()]
}

/// Frame index reached after `elapsed_sec` of play.
pub fn frame_index(elapsed_sec: f64, fps: f32) -> u64 {
    if !elapsed_sec.is_finite() || elapsed_sec <= 0.0 || fps <= 0.0 {
        return 0;
    }
    (elapsed_sec * fps as f64).floor() as u64
}

/// Radius displacement at `frame`.
///
/// The circle moves `line_length / period` pixels per frame, outward until
/// `frame % period` reaches `ceil(period / 2)` and inward afterwards.
pub fn radius_offset(frame: u64, line_length: u32, period: u32) -> f32 {
    if period == 0 {
        return 0.0;
    }
    let period = period as u64;
    let half = period.div_ceil(2);
    let phase = frame % period;
    let steps = if phase <= half {
        phase
    } else {
        2 * half - phase
    };
    line_length as f32 / period as f32 * steps as f32
}

pub fn inner_radius(params: &StimulusParams, frame: u64) -> f32 {
    params.stim_radius as f32 + radius_offset(frame, params.line_length, params.stim_period)
}

/// Inner and outer endpoints of every line at `frame`, around `center`.
pub fn line_segments(
    params: &StimulusParams,
    n_lines: usize,
    frame: u64,
    center: Point,
) -> Vec<(Point, Point)> {
    let r = inner_radius(params, frame);
    let len = params.line_length as f32;
    let angle = params.line_angle as f32;
    (0..n_lines)
        .map(|i| {
            let theta = i as f32 / n_lines as f32 * 360.0;
            let [ix, iy] = pol_to_rect(r, theta);
            let inner = [center[0] + ix, center[1] + iy];
            let [ox, oy] = pol_to_rect(len, angle + theta);
            (inner, [inner[0] + ox, inner[1] + oy])
        })
        .collect()
}
