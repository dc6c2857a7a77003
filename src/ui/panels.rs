use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use series_viewer::data::assemble::PlotRequest;

use crate::state::{AppState, WindowDraft};

const ROW_INDEX: &str = "(row number)";

// ---------------------------------------------------------------------------
// Left side panel – column selection and time windows
// ---------------------------------------------------------------------------

/// Render the left selection panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Columns");
    ui.separator();

    // Clone what we need so we can mutate state inside the closures.
    let (temporal, numeric) = match &state.classified {
        Some(c) => (c.classification.temporal(), c.classification.numeric()),
        None => {
            ui.label("No plottable data loaded.");
            type_summary(ui, state);
            return;
        }
    };
    let all_columns = state
        .original
        .as_ref()
        .map(|t| t.column_names())
        .unwrap_or_default();

    let mut changed = false;
    let mut toggled: Option<String> = None;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- X-axis selector ----
            ui.strong("X-axis (time)");
            let current = state.x_column.clone().unwrap_or_else(|| ROW_INDEX.to_string());
            egui::ComboBox::from_id_salt("x_axis")
                .selected_text(current)
                .show_ui(ui, |ui: &mut Ui| {
                    if ui.selectable_label(state.x_column.is_none(), ROW_INDEX).clicked() {
                        state.x_column = None;
                        changed = true;
                    }
                    for col in &temporal {
                        let selected = state.x_column.as_deref() == Some(col.as_str());
                        if ui.selectable_label(selected, col).clicked() {
                            state.x_column = Some(col.clone());
                            changed = true;
                        }
                    }
                });
            if temporal.is_empty() {
                ui.label(RichText::new("No time column detected.").italics());
            }
            ui.separator();

            // ---- Y-axis columns ----
            ui.strong("Y-axis");
            for col in &numeric {
                let mut checked = state.y_columns.contains(col);
                let text = RichText::new(col).color(state.colors.color_for(col));
                if ui.checkbox(&mut checked, text).changed() {
                    toggled = Some(col.clone());
                }
            }
            ui.separator();

            changed |= window_editor(ui, "Time filter", "filter", &mut state.filter, &all_columns);
            ui.separator();
            changed |= window_editor(ui, "Highlight", "highlight", &mut state.highlight, &all_columns);
            ui.separator();

            type_summary(ui, state);
        });

    if let Some(col) = toggled {
        state.toggle_y_column(&col);
    } else if changed {
        state.rerender();
    }
}

/// Column picker plus `hh:mm` bounds for a filter or highlight window.
fn window_editor(
    ui: &mut Ui,
    title: &str,
    id: &str,
    draft: &mut WindowDraft,
    columns: &[String],
) -> bool {
    let mut changed = false;
    ui.strong(title);
    changed |= ui.checkbox(&mut draft.enabled, "Enabled").changed();

    ui.add_enabled_ui(draft.enabled, |ui: &mut Ui| {
        let current = draft.column.clone().unwrap_or_default();
        egui::ComboBox::from_id_salt(format!("{id}_column"))
            .selected_text(current)
            .show_ui(ui, |ui: &mut Ui| {
                for col in columns {
                    let selected = draft.column.as_deref() == Some(col.as_str());
                    if ui.selectable_label(selected, col).clicked() {
                        draft.column = Some(col.clone());
                        changed = true;
                    }
                }
            });
        ui.horizontal(|ui: &mut Ui| {
            ui.label("From");
            changed |= time_input(ui, &mut draft.start);
        });
        ui.horizontal(|ui: &mut Ui| {
            ui.label("To");
            changed |= time_input(ui, &mut draft.end);
        });
    });
    changed
}

fn time_input(ui: &mut Ui, hm: &mut (u32, u32)) -> bool {
    let h = ui
        .add(egui::DragValue::new(&mut hm.0).range(0..=23).suffix(" h"))
        .changed();
    let m = ui
        .add(egui::DragValue::new(&mut hm.1).range(0..=59).suffix(" min"))
        .changed();
    h || m
}

/// Loaded column types next to their classification.
fn type_summary(ui: &mut Ui, state: &AppState) {
    let Some(table) = &state.original else {
        return;
    };
    egui::CollapsingHeader::new(RichText::new("Column types").strong())
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("column_types").striped(true).show(ui, |ui: &mut Ui| {
                for col in table.columns() {
                    let class = state
                        .classified
                        .as_ref()
                        .and_then(|c| c.classification.class_of(&col.name))
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    ui.label(&col.name);
                    ui.label(col.dtype().to_string());
                    ui.label(class);
                    ui.end_row();
                }
            });
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let plot = state.output.as_ref().and_then(|o| o.plot.as_ref().ok());
            if ui
                .add_enabled(plot.is_some(), egui::Button::new("Export chart data…"))
                .clicked()
            {
                if let Some(plot) = plot {
                    export_dialog(plot, &mut state.status_message);
                }
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(name), Some(table)) = (&state.file_name, &state.original) {
            let delimiter = table
                .source
                .delimiter
                .map(|d| format!(", delimiter {:?}", d as char))
                .unwrap_or_default();
            ui.label(format!(
                "{name}: {} rows ({}{delimiter})",
                table.len(),
                table.source.encoding
            ));
        }

        if let Some(out) = &state.output {
            if state.filter.enabled {
                ui.separator();
                ui.label(format!("{} rows after filter", out.filtered_rows));
            }
            for notice in &out.notices {
                ui.separator();
                ui.label(RichText::new(notice).color(Color32::YELLOW));
            }
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open table")
        .add_filter("Supported files", &["csv", "tsv", "txt", "xlsx", "xlsm"])
        .add_filter("CSV", &["csv", "tsv", "txt"])
        .add_filter("Excel", &["xlsx", "xlsm"])
        .pick_file();

    if let Some(path) = file {
        match series_viewer::data::loader::load_file(&path, &state.config) {
            Ok(table) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                state.set_table(name, table);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

fn export_dialog(plot: &PlotRequest, status: &mut Option<String>) {
    let file = rfd::FileDialog::new()
        .set_title("Export chart data")
        .add_filter("JSON", &["json"])
        .set_file_name("chart.json")
        .save_file();

    if let Some(path) = file {
        match export_plot(&path, plot) {
            Ok(()) => {
                log::info!("Exported {} rows to {}", plot.len(), path.display());
                *status = None;
            }
            Err(e) => {
                log::error!("Export failed: {e:#}");
                *status = Some(format!("Error: {e:#}"));
            }
        }
    }
}

fn export_plot(path: &Path, plot: &PlotRequest) -> Result<()> {
    let json = serde_json::to_string_pretty(plot).context("serializing chart data")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}
