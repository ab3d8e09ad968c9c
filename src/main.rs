mod app;
mod color;
mod data;
mod pipeline;
mod settings;
mod state;
mod ui;

use std::path::Path;

use app::DataSweeperApp;
use eframe::egui;
use settings::{Settings, SETTINGS_FILE};

fn main() -> eframe::Result {
    env_logger::init();

    let settings = Settings::load_or_default(Path::new(SETTINGS_FILE));
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(settings.window_size)
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Data Sweeper",
        options,
        Box::new(|_cc| Ok(Box::new(DataSweeperApp::new(settings)))),
    )
}
