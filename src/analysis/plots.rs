//! PNG figures for rating summaries.

use std::error::Error;
use std::path::Path;

use plotters::prelude::*;
use tracing::warn;

use crate::analysis::summary::{BlockSummary, Surface};
use crate::analysis::units::DisplayUnits;
use crate::analysis::violin::violin_profile;
use crate::experiment::variables::Variable;

const VIOLIN_POINTS: usize = 100;
const VIOLIN_HALF_WIDTH: f64 = 0.4;

/// Light pink through red to black.
pub fn custom_reds(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let stops = [(255.0, 170.0, 170.0), (204.0, 0.0, 0.0), (0.0, 0.0, 0.0)];
    let (a, b, u) = if t < 0.5 {
        (stops[0], stops[1], t / 0.5)
    } else {
        (stops[1], stops[2], (t - 0.5) / 0.5)
    };
    let lerp = |x: f64, y: f64| (x + (y - x) * u).round() as u8;
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

fn padded_range(values: &[f64]) -> (f64, f64) {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.08).max(1e-3);
    (lo - pad, hi + pad)
}

/// One error-bar panel per block, two panels per row.
pub fn render_block_panels(
    out_path: &Path,
    blocks: &[BlockSummary],
    units: &DisplayUnits,
    y_max: f64,
) -> Result<(), Box<dyn Error>> {
    let rows = blocks.len().div_ceil(2).max(1);
    let root = BitMapBackend::new(out_path, (1000, 400 * rows as u32)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((rows, 2));

    for (block, area) in blocks.iter().zip(panels.iter()) {
        let xs: Vec<f64> = block
            .levels
            .iter()
            .map(|&l| units.convert(block.variable, l))
            .collect();
        let (x_min, x_max) = padded_range(&xs);

        let mut chart = ChartBuilder::on(area)
            .caption(
                format!("Effect of {} on illusion strength", block.variable.title()),
                ("sans-serif", 20),
            )
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_min..x_max, 0.0f64..y_max)?;

        chart
            .configure_mesh()
            .x_desc(units.axis_label(block.variable))
            .y_desc("Illusion strength")
            .draw()?;

        let points: Vec<(f64, f64)> = xs.iter().copied().zip(block.means.iter().copied()).collect();
        chart.draw_series(LineSeries::new(points, &BLACK))?;
        chart.draw_series(xs.iter().zip(block.means.iter().zip(&block.errors)).map(
            |(&x, (&m, &e))| ErrorBar::new_vertical(x, m - e, m, m + e, BLACK.filled(), 10),
        ))?;
    }

    root.present()?;
    Ok(())
}

/// Ratings per level for one variable.
pub struct ViolinPanel {
    pub variable: Variable,
    pub groups: Vec<(u32, Vec<f64>)>,
}

/// One violin panel per variable, side by side.
pub fn render_violins(
    out_path: &Path,
    title: &str,
    panels: &[ViolinPanel],
    units: &DisplayUnits,
    y_max: f64,
) -> Result<(), Box<dyn Error>> {
    let cols = panels.len().max(1);
    let root = BitMapBackend::new(out_path, (460 * cols as u32, 480)).into_drawing_area();
    root.fill(&WHITE)?;
    let (header, body) = root.split_vertically(40);
    header.titled(title, ("sans-serif", 24))?;
    let areas = body.split_evenly((1, cols));

    for (panel, area) in panels.iter().zip(areas.iter()) {
        let k = panel.groups.len();
        let labels: Vec<String> = panel
            .groups
            .iter()
            .map(|(l, _)| format!("{:.2}", units.convert(panel.variable, *l)))
            .collect();
        let label_of = |x: &f64| -> String {
            let i = x.round();
            if (x - i).abs() > 1e-6 || i < 0.0 {
                return String::new();
            }
            labels.get(i as usize).cloned().unwrap_or_default()
        };

        let mut chart = ChartBuilder::on(area)
            .caption(
                format!("illusion strength vs. {}", panel.variable.title()),
                ("sans-serif", 18),
            )
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(-0.5f64..(k as f64 - 0.5).max(0.5), 0.0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(k.max(1) * 2 + 1)
            .x_label_formatter(&label_of)
            .x_desc(units.axis_label(panel.variable))
            .y_desc("Average strength")
            .draw()?;

        for (i, (_, ratings)) in panel.groups.iter().enumerate() {
            let Some(profile) = violin_profile(ratings, VIOLIN_POINTS) else {
                continue;
            };
            let cx = i as f64;
            let mut outline: Vec<(f64, f64)> = profile
                .ys
                .iter()
                .zip(&profile.widths)
                .map(|(&y, &w)| (cx + w * VIOLIN_HALF_WIDTH, y))
                .collect();
            outline.extend(
                profile
                    .ys
                    .iter()
                    .zip(&profile.widths)
                    .rev()
                    .map(|(&y, &w)| (cx - w * VIOLIN_HALF_WIDTH, y)),
            );
            chart.draw_series(std::iter::once(Polygon::new(
                outline,
                RGBColor(204, 0, 0).mix(0.35).filled(),
            )))?;
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(cx, profile.min), (cx, profile.max)],
                BLACK,
            )))?;
            chart.draw_series(std::iter::once(PathElement::new(
                vec![
                    (cx - VIOLIN_HALF_WIDTH / 2.0, profile.median),
                    (cx + VIOLIN_HALF_WIDTH / 2.0, profile.median),
                ],
                BLACK.stroke_width(2),
            )))?;
            chart.draw_series(std::iter::once(Circle::new(
                (cx, profile.mean),
                4,
                BLACK.filled(),
            )))?;
        }
    }

    root.present()?;
    Ok(())
}

/// Mean rating surface over two variables. Empty cells are drawn at zero.
pub fn render_surface(
    out_path: &Path,
    surface: &Surface,
    units: &DisplayUnits,
    y_max: f64,
) -> Result<(), Box<dyn Error>> {
    let xs: Vec<f64> = surface
        .x_levels
        .iter()
        .map(|&l| units.convert(surface.x, l))
        .collect();
    let zs: Vec<f64> = surface
        .y_levels
        .iter()
        .map(|&l| units.convert(surface.y, l))
        .collect();
    let missing = surface.x_levels.len() * surface.y_levels.len() - surface.filled_cells();
    if missing > 0 {
        warn!("{missing} surface cells have no ratings; drawing them at 0");
    }

    let (x_min, x_max) = padded_range(&xs);
    let (z_min, z_max) = padded_range(&zs);

    let root = BitMapBackend::new(out_path, (1000, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "Average strength: {} (x) vs. {} (z)",
                units.axis_label(surface.x),
                units.axis_label(surface.y)
            ),
            ("sans-serif", 22),
        )
        .margin(20)
        .build_cartesian_3d(x_min..x_max, 0.0f64..y_max, z_min..z_max)?;

    chart.with_projection(|mut pb| {
        pb.yaw = 2.36;
        pb.pitch = 0.45;
        pb.scale = 0.85;
        pb.into_matrix()
    });

    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.1))
        .max_light_lines(3)
        .draw()?;

    let lookup = |x: f64, z: f64| -> f64 {
        let i = xs.iter().position(|v| (v - x).abs() < 1e-9);
        let j = zs.iter().position(|v| (v - z).abs() < 1e-9);
        match (i, j) {
            (Some(i), Some(j)) => surface.cells[i][j].unwrap_or(0.0),
            _ => 0.0,
        }
    };
    let color = |y: &f64| custom_reds(y / y_max).filled();

    chart.draw_series(
        SurfaceSeries::xoz(xs.iter().copied(), zs.iter().copied(), lookup).style_func(&color),
    )?;

    root.present()?;
    Ok(())
}
