use eframe::egui::{self, ScrollArea, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use series_viewer::data::model::CellValue;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Bottom panel – first rows of the loaded table
// ---------------------------------------------------------------------------

fn cell_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Render the preview of the table as loaded (before any filtering).
pub fn preview_panel(ui: &mut Ui, state: &AppState) {
    let Some(table) = &state.original else {
        return;
    };
    let head = table.head(state.config.preview_rows);
    let columns = head.columns();

    egui::CollapsingHeader::new(format!("Data preview ({} of {} rows)", head.len(), table.len()))
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
                TableBuilder::new(ui)
                    .striped(true)
                    .columns(TableColumn::auto().at_least(60.0), columns.len())
                    .header(20.0, |mut header| {
                        for col in columns {
                            header.col(|ui| {
                                ui.strong(&col.name);
                            });
                        }
                    })
                    .body(|mut body| {
                        for row in 0..head.len() {
                            body.row(18.0, |mut cells| {
                                for col in columns {
                                    cells.col(|ui| {
                                        ui.label(cell_text(&col.cells[row]));
                                    });
                                }
                            });
                        }
                    });
            });
        });
}
