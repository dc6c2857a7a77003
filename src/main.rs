mod app;
mod color;
mod state;
mod ui;

use app::SeriesViewerApp;
use eframe::egui;
use series_viewer::config::ParseConfig;

fn main() -> eframe::Result {
    env_logger::init();

    let config = ParseConfig::from_env();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Series Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(SeriesViewerApp::new(config)))),
    )
}
