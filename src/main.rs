use eframe::egui;
use log::info;

mod annotations;
mod app;
mod canvas;
mod pipeline;
mod session;
mod settings;
mod style;
mod text;

use app::RetouchApp;
use settings::AppSettings;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings: AppSettings = AppSettings::load();
    info!("starting retouch ({}x{})", settings.window_width, settings.window_height);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([settings.window_width, settings.window_height])
            .with_min_inner_size([480.0, 360.0])
            .with_title("Retouch"),
        ..Default::default()
    };

    eframe::run_native(
        "Retouch",
        options,
        Box::new(move |cc| Ok(Box::new(RetouchApp::new(cc, settings)))),
    )
}
