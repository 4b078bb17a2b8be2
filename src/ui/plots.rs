use egui_plot::{Line, Plot, PlotPoints, Points};

/// Mean rating per level, drawn as a line with markers.
pub fn level_plot(ui: &mut egui::Ui, title: &str, x_label: &str, points: &[[f64; 2]], y_max: f64) {
    let line = Line::new("mean", PlotPoints::from(points.to_vec()));
    let markers = Points::new("levels", PlotPoints::from(points.to_vec())).radius(4.0);
    let x_unit = x_label.to_string();

    ui.vertical(|ui| {
        ui.label(title);

        Plot::new(title)
            .height(180.0)
            .width(320.0)
            .allow_scroll(false)
            .allow_drag(false)
            .allow_zoom(false)
            .include_y(0.0)
            .include_y(y_max)
            .x_axis_formatter(move |mark, _| format!("{:.0} {x_unit}", mark.value))
            .y_axis_formatter(|mark, _| format!("{:.0}", mark.value))
            .show(ui, |plot_ui| {
                plot_ui.line(line);
                plot_ui.points(markers);
            });
    });
}
