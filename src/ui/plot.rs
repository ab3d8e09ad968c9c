use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Legend, Plot};

use crate::color::series_palette;
use crate::data::chart::BarChartData;

// ---------------------------------------------------------------------------
// Bar chart of the first numeric columns
// ---------------------------------------------------------------------------

/// Render grouped bars, one group per row, one colour per series.
pub fn bar_chart(ui: &mut Ui, id: impl std::hash::Hash, chart: Option<&BarChartData>) {
    let Some(chart) = chart else {
        ui.label("No numeric columns to chart.");
        return;
    };
    if chart.categories() == 0 {
        ui.label("No rows to chart.");
        return;
    }

    let n_series = chart.series.len();
    let width = 0.8 / n_series as f64;
    let colors = series_palette(n_series);

    Plot::new(id)
        .legend(Legend::default())
        .height(220.0)
        .x_axis_label("Row")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(false)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (s, (series, color)) in chart.series.iter().zip(colors).enumerate() {
                // Centre the group of bars on the row index.
                let offset = (s as f64 - (n_series as f64 - 1.0) / 2.0) * width;
                let bars: Vec<Bar> = series
                    .values
                    .iter()
                    .enumerate()
                    .filter_map(|(row, v)| v.map(|v| Bar::new(row as f64 + offset, v).width(width)))
                    .collect();

                plot_ui.bar_chart(BarChart::new(bars).name(&series.name).color(color));
            }
        });
}
