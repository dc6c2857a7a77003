use eframe::egui;

use series_viewer::config::ParseConfig;

use crate::state::AppState;
use crate::ui::{panels, plot, preview};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SeriesViewerApp {
    pub state: AppState,
}

impl SeriesViewerApp {
    pub fn new(config: ParseConfig) -> Self {
        Self {
            state: AppState::new(config),
        }
    }
}

impl eframe::App for SeriesViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: column selection and time windows ----
        egui::SidePanel::left("selection_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Bottom panel: data preview ----
        egui::TopBottomPanel::bottom("preview_panel")
            .resizable(true)
            .show(ctx, |ui| {
                preview::preview_panel(ui, &self.state);
            });

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::series_plot(ui, &self.state);
        });
    }
}
