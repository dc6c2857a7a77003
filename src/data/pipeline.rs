use super::assemble::{assemble, PlotRequest};
use super::classify::ClassifiedTable;
use super::error::{AssemblyError, FilterError};
use super::window::{apply_mask, filter_mask, highlight_intervals, HighlightInterval, TimeWindow};

/// A time-of-day window bound to the column it applies to. The window itself
/// is kept unvalidated so a rejected one can be reported per render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSelection {
    pub column: String,
    /// `(hour, minute)` of the start.
    pub start: (u32, u32),
    /// `(hour, minute)` of the end.
    pub end: (u32, u32),
}

impl WindowSelection {
    fn window(&self) -> Result<TimeWindow, FilterError> {
        TimeWindow::from_hm(self.start, self.end)
    }
}

/// Everything the user has chosen, as plain values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selections {
    pub x_column: Option<String>,
    pub y_columns: Vec<String>,
    pub filter: Option<WindowSelection>,
    pub highlight: Option<WindowSelection>,
}

/// Result of one render pass.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub plot: Result<PlotRequest, AssemblyError>,
    pub highlights: Vec<HighlightInterval>,
    /// Rows left after the time filter (all rows when no filter applies).
    pub filtered_rows: usize,
    /// Non-fatal messages for the user.
    pub notices: Vec<String>,
}

/// Run filter, highlight and assembly for one interaction.
///
/// A rejected filter leaves the data unfiltered; a rejected highlight draws
/// nothing. Both are reported in `notices`. The classified table is never
/// modified.
pub fn render(classified: &ClassifiedTable, selections: &Selections) -> RenderOutput {
    let mut notices = Vec::new();
    if !classified.has_time_axis() {
        notices.push("No time column detected; plotting against row number.".to_string());
    }

    let filtered = selections.filter.as_ref().and_then(|f| {
        let result = f
            .window()
            .and_then(|w| filter_mask(&classified.table, &f.column, &w));
        match result {
            Ok(mask) => Some(apply_mask(&classified.table, &mask)),
            Err(e) => {
                log::warn!("Time filter ignored: {e}");
                notices.push(format!("Time filter ignored: {e}"));
                None
            }
        }
    });
    let table = filtered.as_ref().unwrap_or(&classified.table);

    let highlights = match &selections.highlight {
        Some(h) => match h
            .window()
            .and_then(|w| highlight_intervals(table, &h.column, &w))
        {
            Ok(intervals) => intervals,
            Err(e) => {
                log::warn!("Highlight ignored: {e}");
                notices.push(format!("Highlight ignored: {e}"));
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let plot = assemble(
        table,
        &classified.classification,
        selections.x_column.as_deref(),
        &selections.y_columns,
    );

    RenderOutput {
        plot,
        highlights,
        filtered_rows: table.len(),
        notices,
    }
}
