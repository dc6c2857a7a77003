use chrono::DateTime;
use eframe::egui::Ui;
use egui_plot::{Legend, Line, Plot, PlotPoints, Polygon};

use series_viewer::data::assemble::AxisValue;

use crate::color::HIGHLIGHT_FILL;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Series plot (central panel)
// ---------------------------------------------------------------------------

/// Label for an x position holding seconds since the Unix epoch.
fn format_timestamp(secs: f64) -> String {
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
        .map(|dt| dt.naive_utc().format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Render the line chart in the central panel.
pub fn series_plot(ui: &mut Ui, state: &AppState) {
    let message = |ui: &mut Ui, text: &str| {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(text);
        });
    };

    let Some(output) = &state.output else {
        message(ui, "Open a file to plot it  (File → Open…)");
        return;
    };
    let plot = match &output.plot {
        Ok(plot) => plot,
        Err(e) => {
            message(ui, &e.to_string());
            return;
        }
    };

    let time_axis = plot.x_column.is_some();
    let (y_min, y_max) = plot
        .rows
        .iter()
        .flat_map(|r| r.y.iter().copied())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
            (lo.min(y), hi.max(y))
        });
    let pad = ((y_max - y_min) * 0.05).max(1e-9);

    let mut chart = Plot::new("series_plot")
        .legend(Legend::default())
        .x_axis_label(plot.x_column.as_deref().unwrap_or("row"))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);
    if time_axis {
        chart = chart
            .x_axis_formatter(|mark, _range| format_timestamp(mark.value))
            .label_formatter(|name, point| {
                let x = format_timestamp(point.x);
                if name.is_empty() {
                    format!("{x}\n{:.3}", point.y)
                } else {
                    format!("{name}\n{x}\n{:.3}", point.y)
                }
            });
    }

    chart.show(ui, |plot_ui| {
        // Bands first so the series are drawn on top of them.
        if time_axis {
            for band in &output.highlights {
                let x0 = AxisValue::Time(band.start).as_f64();
                let x1 = AxisValue::Time(band.end).as_f64();
                let corners = vec![
                    [x0, y_min - pad],
                    [x1, y_min - pad],
                    [x1, y_max + pad],
                    [x0, y_max + pad],
                ];
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(corners))
                        .fill_color(HIGHLIGHT_FILL)
                        .name("highlight"),
                );
            }
        }

        for (i, col) in plot.y_columns.iter().enumerate() {
            let points = PlotPoints::from(plot.points(i));
            let line = Line::new(points)
                .name(col)
                .color(state.colors.color_for(col))
                .width(1.5);
            plot_ui.line(line);
        }
    });
}
