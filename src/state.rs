use series_viewer::config::ParseConfig;
use series_viewer::data::classify::{classify_table, ClassifiedTable};
use series_viewer::data::model::Table;
use series_viewer::data::pipeline::{render, RenderOutput, Selections, WindowSelection};

use crate::color::SeriesColors;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Editable time window in the side panel; only applied when `enabled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDraft {
    pub enabled: bool,
    pub column: Option<String>,
    pub start: (u32, u32),
    pub end: (u32, u32),
}

impl Default for WindowDraft {
    fn default() -> Self {
        Self {
            enabled: false,
            column: None,
            start: (8, 0),
            end: (17, 0),
        }
    }
}

impl WindowDraft {
    fn to_selection(&self) -> Option<WindowSelection> {
        if !self.enabled {
            return None;
        }
        Some(WindowSelection {
            column: self.column.clone()?,
            start: self.start,
            end: self.end,
        })
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: ParseConfig,

    /// File name of the loaded table.
    pub file_name: Option<String>,

    /// Table as loaded, kept for the preview and type summary.
    pub original: Option<Table>,

    /// Classified copy used for plotting (None if nothing is plottable).
    pub classified: Option<ClassifiedTable>,

    /// Chosen x-axis column (None = row index).
    pub x_column: Option<String>,

    /// Chosen y-axis columns.
    pub y_columns: Vec<String>,

    pub filter: WindowDraft,
    pub highlight: WindowDraft,

    /// Output of the last render pass.
    pub output: Option<RenderOutput>,

    pub colors: SeriesColors,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: ParseConfig) -> Self {
        Self {
            config,
            file_name: None,
            original: None,
            classified: None,
            x_column: None,
            y_columns: Vec::new(),
            filter: WindowDraft::default(),
            highlight: WindowDraft::default(),
            output: None,
            colors: SeriesColors::default(),
            status_message: None,
        }
    }

    /// Ingest a newly loaded table: classify it and reset selections.
    pub fn set_table(&mut self, file_name: String, table: Table) {
        self.file_name = Some(file_name);
        self.x_column = None;
        self.y_columns.clear();
        self.output = None;
        self.status_message = None;

        match classify_table(&table, &self.config) {
            Ok(classified) => {
                let temporal = classified.classification.temporal();
                let numeric = classified.classification.numeric();
                log::info!("Time columns {temporal:?}, numeric columns {numeric:?}");

                // Default x-axis: first time column (if any).
                self.x_column = temporal.first().cloned();
                self.filter.column = temporal.first().cloned();
                self.highlight.column = temporal.first().cloned();
                self.colors = SeriesColors::new(&numeric);
                self.classified = Some(classified);
            }
            Err(e) => {
                log::error!("Cannot plot file: {e}");
                self.status_message = Some(format!("Error: {e}"));
                self.classified = None;
            }
        }
        self.original = Some(table);
        self.rerender();
    }

    pub fn selections(&self) -> Selections {
        Selections {
            x_column: self.x_column.clone(),
            y_columns: self.y_columns.clone(),
            filter: self.filter.to_selection(),
            highlight: self.highlight.to_selection(),
        }
    }

    /// Recompute the plot after any selection change.
    pub fn rerender(&mut self) {
        self.output = self
            .classified
            .as_ref()
            .map(|c| render(c, &self.selections()));
    }

    /// Toggle a y-axis column, keeping the table's column order.
    pub fn toggle_y_column(&mut self, column: &str) {
        if self.y_columns.iter().any(|c| c == column) {
            self.y_columns.retain(|c| c != column);
        } else if let Some(classified) = &self.classified {
            let wanted: Vec<String> = classified
                .classification
                .numeric()
                .into_iter()
                .filter(|c| c == column || self.y_columns.contains(c))
                .collect();
            self.y_columns = wanted;
        }
        self.rerender();
    }
}
