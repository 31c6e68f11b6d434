//! The floating drop window.
//!
//! A small borderless, always-on-top square: drag anywhere to move it, drop
//! image files or folders on it to start a conversion batch, right-click for
//! the exit menu. One batch runs at a time; the end-of-batch summary is shown
//! as a status line.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;

use eframe::egui;

use crate::config::AppSettings;
use crate::convert::{self, ConversionFinished, ConvertMessage};
use crate::progress::OwnerBounds;

/// Fixed outer size of the drop window.
pub const WINDOW_SIZE: egui::Vec2 = egui::Vec2::new(180.0, 180.0);

/// Tone used when rendering the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusTone {
    Info,
    Error,
}

struct RunningJob {
    handle: JoinHandle<()>,
    messages: Receiver<ConvertMessage>,
}

/// The always-on-top square the user drops image files onto.
pub struct DropApp {
    settings: AppSettings,
    job: Option<RunningJob>,
    status: Option<(String, StatusTone)>,
}

impl DropApp {
    /// Create the app with the loaded settings.
    pub fn new(settings: AppSettings) -> Self {
        Self {
            settings,
            job: None,
            status: None,
        }
    }

    fn poll_job(&mut self) {
        let Some(job) = &self.job else {
            return;
        };
        match job.messages.try_recv() {
            Ok(ConvertMessage::Finished(finished)) => {
                self.status = Some(summarize(&finished));
                if let Some(job) = self.job.take() {
                    let _ = job.handle.join();
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.status = Some((
                    "Conversion job stopped unexpectedly".to_string(),
                    StatusTone::Error,
                ));
                self.job = None;
            }
        }
    }

    fn handle_drop(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if dropped.is_empty() {
            return;
        }
        if self.job.is_some() {
            self.status = Some((
                "A conversion is already running".to_string(),
                StatusTone::Error,
            ));
            return;
        }
        let roots: Vec<PathBuf> = dropped.into_iter().filter_map(|file| file.path).collect();
        if roots.is_empty() {
            return;
        }
        let owner = ctx
            .input(|i| i.viewport().outer_rect)
            .map(|rect| OwnerBounds {
                left: rect.left(),
                top: rect.top(),
                width: rect.width(),
                height: rect.height(),
            });
        let (message_tx, message_rx) = mpsc::channel();
        let handle =
            convert::spawn_conversion_job(roots, self.settings.clone(), owner, message_tx);
        self.job = Some(RunningJob {
            handle,
            messages: message_rx,
        });
        self.status = None;
    }
}

impl eframe::App for DropApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_job();
        self.handle_drop(ctx);

        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());
        let converting = self.job.is_some();
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let response = ui.interact(
                    ui.max_rect(),
                    egui::Id::new("drop_zone"),
                    egui::Sense::click_and_drag(),
                );
                if response.drag_started() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
                }
                response.context_menu(|ui| {
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                paint(ui, hovering, converting, self.status.as_ref());
            });

        if converting {
            ctx.request_repaint_after(Duration::from_millis(200));
        }
    }
}

fn paint(
    ui: &mut egui::Ui,
    hovering: bool,
    converting: bool,
    status: Option<&(String, StatusTone)>,
) {
    let rect = ui.max_rect();
    let painter = ui.painter();

    let fill = if hovering {
        egui::Color32::from_rgb(44, 62, 92)
    } else {
        egui::Color32::from_rgb(28, 30, 36)
    };
    let outline = if hovering {
        egui::Color32::from_rgb(90, 150, 250)
    } else {
        egui::Color32::from_rgb(70, 74, 84)
    };
    painter.rect_filled(rect, 12.0, fill);
    painter.rect_stroke(
        rect.shrink(1.0),
        12.0,
        egui::Stroke::new(2.0, outline),
        egui::StrokeKind::Inside,
    );

    painter.text(
        rect.center() - egui::vec2(0.0, 14.0),
        egui::Align2::CENTER_CENTER,
        "webpdrop",
        egui::FontId::proportional(20.0),
        egui::Color32::from_rgb(228, 228, 231),
    );
    let hint = if converting {
        "Converting..."
    } else {
        "Drop images here"
    };
    painter.text(
        rect.center() + egui::vec2(0.0, 12.0),
        egui::Align2::CENTER_CENTER,
        hint,
        egui::FontId::proportional(12.0),
        egui::Color32::from_rgb(150, 153, 163),
    );

    if let Some((text, tone)) = status {
        let color = match tone {
            StatusTone::Info => egui::Color32::from_rgb(134, 196, 140),
            StatusTone::Error => egui::Color32::from_rgb(222, 120, 120),
        };
        painter.text(
            rect.center_bottom() - egui::vec2(0.0, 18.0),
            egui::Align2::CENTER_CENTER,
            text,
            egui::FontId::proportional(10.0),
            color,
        );
    }
}

fn summarize(finished: &ConversionFinished) -> (String, StatusTone) {
    if finished.total == 0 {
        return (
            "No convertible images in the drop".to_string(),
            StatusTone::Error,
        );
    }
    let mut text = format!(
        "Converted {} of {} file(s)",
        finished.converted, finished.total
    );
    if finished.canceled {
        text.push_str(" (canceled)");
    }
    let tone = if finished.errors.is_empty() {
        StatusTone::Info
    } else {
        text.push_str(&format!(", {} failed", finished.errors.len()));
        StatusTone::Error
    };
    (text, tone)
}
