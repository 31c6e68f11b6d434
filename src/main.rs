#![deny(missing_docs)]
#![deny(warnings)]

//! Entry point for the webpdrop drop-to-convert utility.
#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]
use eframe::egui;
use webpdrop::config;
use webpdrop::logging;
use webpdrop::ui::{DropApp, WINDOW_SIZE};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let settings = match config::load_or_default() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!("Falling back to default settings: {err}");
            config::AppSettings::default()
        }
    };

    let viewport = egui::ViewportBuilder::default()
        .with_title("webpdrop")
        .with_inner_size(WINDOW_SIZE)
        .with_resizable(false)
        .with_maximize_button(false)
        .with_always_on_top()
        .with_drag_and_drop(true);
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "webpdrop",
        native_options,
        Box::new(move |_cc| Ok(Box::new(DropApp::new(settings)))),
    )?;
    Ok(())
}
