//! The modal progress dialog window, hosted on the dedicated display thread.
//!
//! The dialog holds no state beyond the last values pushed into it. Its
//! event loop runs off the main thread, which winit permits on Windows and
//! on X11/Wayland; on other platforms the loop creation fails and `show`
//! reports the display as gone.

use std::time::Duration;

use eframe::egui;

use super::session::{CloseResponse, DisplayCommand, DisplayFields, DisplaySession, PumpOutcome};

const DIALOG_SIZE: egui::Vec2 = egui::Vec2::new(400.0, 116.0);
const PUMP_INTERVAL: Duration = Duration::from_millis(50);

/// Run the modal dialog until it is closed. Blocks the calling thread for
/// the whole session; the session is dropped (releasing the close
/// acknowledgment) only after the window is torn down.
pub(crate) fn run_modal(session: DisplaySession) {
    let fields = session.snapshot();
    let mut viewport = egui::ViewportBuilder::default()
        .with_title(fields.title.clone())
        .with_inner_size(DIALOG_SIZE)
        .with_resizable(false)
        .with_minimize_button(false)
        .with_maximize_button(false)
        .with_taskbar(false)
        .with_always_on_top();
    if let Some(owner) = session.owner() {
        let (x, y) = owner.centered(DIALOG_SIZE.x, DIALOG_SIZE.y);
        viewport = viewport.with_position([x, y]);
    }
    let options = eframe::NativeOptions {
        viewport,
        centered: session.owner().is_none(),
        // The dialog lives on its own thread; ask winit to permit an event
        // loop off the main thread where the platform supports it.
        event_loop_builder: Some(Box::new(|builder| {
            #[cfg(target_os = "windows")]
            {
                use winit::platform::windows::EventLoopBuilderExtWindows;
                builder.with_any_thread(true);
            }
            #[cfg(target_os = "linux")]
            {
                use winit::platform::wayland::EventLoopBuilderExtWayland;
                use winit::platform::x11::EventLoopBuilderExtX11;
                EventLoopBuilderExtX11::with_any_thread(builder, true);
                EventLoopBuilderExtWayland::with_any_thread(builder, true);
            }
            #[cfg(not(any(target_os = "windows", target_os = "linux")))]
            let _ = &builder;
        })),
        ..Default::default()
    };

    let result = eframe::run_native(
        "webpdrop progress",
        options,
        Box::new(move |_cc| Ok(Box::new(DialogApp::new(session, fields)))),
    );
    if let Err(err) = result {
        tracing::error!("Progress dialog failed: {err}");
    }
}

struct DialogApp {
    session: DisplaySession,
    fields: DisplayFields,
    orphaned: bool,
}

impl DialogApp {
    fn new(session: DisplaySession, fields: DisplayFields) -> Self {
        Self {
            session,
            fields,
            orphaned: false,
        }
    }
}

impl eframe::App for DialogApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // The caller is released on the first activation.
        if ctx.input(|i| i.viewport().focused.unwrap_or(false)) {
            self.session.notify_ready();
        }

        let fields = &mut self.fields;
        match self.session.pump(|command| apply(ctx, fields, command)) {
            PumpOutcome::Idle => {}
            PumpOutcome::CloseRequested => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
            PumpOutcome::Disconnected => {
                // The controller went away without closing; shut down rather
                // than lingering as an unreachable window.
                self.orphaned = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }

        if ctx.input(|i| i.viewport().close_requested())
            && !self.orphaned
            && self.session.close_attempted() == CloseResponse::Veto
        {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(4.0);
            ui.label(&self.fields.message);
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let fraction = fraction(&self.fields);
                ui.add(
                    egui::ProgressBar::new(fraction)
                        .desired_width(ui.available_width() - 90.0)
                        .text(format!("{:.0}%", fraction * 100.0)),
                );
                let canceling = self.session.cancel_requested();
                let label = if canceling { "Canceling..." } else { "Cancel" };
                if ui
                    .add_enabled(!canceling, egui::Button::new(label))
                    .clicked()
                {
                    self.session.request_cancel();
                }
            });
        });

        // Keep pumping commands even without input events.
        ctx.request_repaint_after(PUMP_INTERVAL);
    }
}

fn apply(ctx: &egui::Context, fields: &mut DisplayFields, command: &DisplayCommand) {
    match command {
        DisplayCommand::SetTitle(title) => {
            fields.title = title.clone();
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
        }
        DisplayCommand::SetMinimum(minimum) => fields.minimum = *minimum,
        DisplayCommand::SetMaximum(maximum) => fields.maximum = *maximum,
        DisplayCommand::SetValue(value) => fields.value = *value,
        DisplayCommand::SetMessage(message) => fields.message = message.clone(),
        DisplayCommand::Close => {}
    }
}

/// Completion in `[0.0, 1.0]`; out-of-range values are clamped visually.
fn fraction(fields: &DisplayFields) -> f32 {
    let span = fields.maximum.saturating_sub(fields.minimum);
    if span <= 0 {
        return 0.0;
    }
    (fields.value.saturating_sub(fields.minimum) as f32 / span as f32).clamp(0.0, 1.0)
}
