//! Shared test support: a headless scripted progress display.

use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use webpdrop::progress::{DisplayCommand, DisplaySession, PumpOutcome};

/// User intents a test injects into the display double.
pub enum Intent {
    Cancel,
    AttemptClose,
}

/// Commands observed by the display double, in application order.
pub type CommandLog = Arc<Mutex<Vec<DisplayCommand>>>;

pub fn new_log() -> CommandLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Display loop double: signals readiness immediately, records every applied
/// command, and performs intents injected by the test between pumps.
pub fn scripted_display(
    log: CommandLog,
    intents: Receiver<Intent>,
) -> impl FnOnce(DisplaySession) + Send + 'static {
    move |mut session: DisplaySession| {
        session.notify_ready();
        loop {
            while let Ok(intent) = intents.try_recv() {
                match intent {
                    Intent::Cancel => session.request_cancel(),
                    Intent::AttemptClose => {
                        let _ = session.close_attempted();
                    }
                }
            }
            let outcome = session.pump(|command| log.lock().unwrap().push(command.clone()));
            match outcome {
                PumpOutcome::Idle => thread::sleep(Duration::from_millis(2)),
                PumpOutcome::CloseRequested | PumpOutcome::Disconnected => break,
            }
        }
    }
}

/// Poll `condition` until it holds, panicking after a bounded wait.
pub fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        thread::sleep(Duration::from_millis(2));
    }
}
