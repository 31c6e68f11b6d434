//! Hand-off plumbing between the controller and the display context.
//!
//! The display is only ever mutated on its own thread: callers enqueue
//! [`DisplayCommand`]s that the display context applies and acknowledges one
//! at a time. User intents flow the other way through shared flags.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};

/// Field values mirrored to the display.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFields {
    /// Title bar text.
    pub title: String,
    /// Lower bound of the progress range.
    pub minimum: i32,
    /// Upper bound of the progress range.
    pub maximum: i32,
    /// Current progress value.
    pub value: i32,
    /// Message label text.
    pub message: String,
}

impl Default for DisplayFields {
    fn default() -> Self {
        Self {
            title: "Progress".to_string(),
            minimum: 0,
            maximum: 100,
            value: 0,
            message: String::new(),
        }
    }
}

/// Outer bounds of the window the dialog should be centered over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OwnerBounds {
    /// Left edge in screen coordinates.
    pub left: f32,
    /// Top edge in screen coordinates.
    pub top: f32,
    /// Outer width.
    pub width: f32,
    /// Outer height.
    pub height: f32,
}

impl OwnerBounds {
    /// Top-left position that centers a `width` x `height` dialog over the owner.
    pub fn centered(&self, width: f32, height: f32) -> (f32, f32) {
        (
            self.left + (self.width - width) / 2.0,
            self.top + (self.height - height) / 2.0,
        )
    }
}

/// A single unit of work marshaled onto the display context.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayCommand {
    /// Update the title bar text.
    SetTitle(String),
    /// Update the lower bound of the progress range.
    SetMinimum(i32),
    /// Update the upper bound of the progress range.
    SetMaximum(i32),
    /// Update the current progress value.
    SetValue(i32),
    /// Update the message label.
    SetMessage(String),
    /// Tear the display down.
    Close,
}

pub(crate) struct Marshaled {
    pub(crate) command: DisplayCommand,
    pub(crate) done: Sender<()>,
}

/// What the display should do with a user-initiated close attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseResponse {
    /// Keep the display open; the attempt was converted into cancellation.
    Veto,
    /// Let the display close.
    Allow,
}

/// Result of pumping marshaled commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// Nothing left to do right now; keep running.
    Idle,
    /// The controller asked the display to close.
    CloseRequested,
    /// The controller went away; the display should shut down.
    Disconnected,
}

/// State shared between the calling thread and the display context.
pub(crate) struct Shared {
    fields: Mutex<DisplayFields>,
    canceled: AtomicBool,
    closing: AtomicBool,
}

impl Shared {
    pub(crate) fn new(fields: DisplayFields) -> Self {
        Self {
            fields: Mutex::new(fields),
            canceled: AtomicBool::new(false),
            closing: AtomicBool::new(false),
        }
    }

    pub(crate) fn lock_fields(&self) -> MutexGuard<'_, DisplayFields> {
        self.fields.lock().expect("progress fields poisoned")
    }

    pub(crate) fn canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    pub(crate) fn request_cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    pub(crate) fn closing(&self) -> bool {
        self.closing.load(Ordering::Relaxed)
    }

    pub(crate) fn begin_close(&self) {
        self.closing.store(true, Ordering::Relaxed);
    }
}

/// The display context's end of a progress session.
///
/// Owned by the thread hosting the display. Supplies the initial field
/// snapshot, pumps marshaled commands, and translates user intents back into
/// the shared session flags.
pub struct DisplaySession {
    shared: Arc<Shared>,
    commands: Receiver<Marshaled>,
    ready: Option<Sender<()>>,
    close_ack: Option<Sender<()>>,
    owner: Option<OwnerBounds>,
}

impl DisplaySession {
    pub(crate) fn new(
        shared: Arc<Shared>,
        commands: Receiver<Marshaled>,
        ready: Sender<()>,
        owner: Option<OwnerBounds>,
    ) -> Self {
        Self {
            shared,
            commands,
            ready: Some(ready),
            close_ack: None,
            owner,
        }
    }

    /// Current field values, including any set before the display existed.
    pub fn snapshot(&self) -> DisplayFields {
        self.shared.lock_fields().clone()
    }

    /// Bounds of the window the display should center over, if any.
    pub fn owner(&self) -> Option<OwnerBounds> {
        self.owner
    }

    /// Release the caller blocked in `show`. Fires at most once; later calls
    /// are no-ops, so the display can invoke this on every activation event.
    pub fn notify_ready(&mut self) {
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(());
        }
    }

    /// Record the user's cancel intent. The flag never resets within a session.
    pub fn request_cancel(&self) {
        self.shared.request_cancel();
    }

    /// Whether cancellation has been requested.
    pub fn cancel_requested(&self) -> bool {
        self.shared.canceled()
    }

    /// React to the user trying to close the display directly.
    ///
    /// Outside a controller-initiated close this behaves exactly like the
    /// cancel control: the close is vetoed and the cancel flag set.
    pub fn close_attempted(&self) -> CloseResponse {
        if self.shared.closing() {
            CloseResponse::Allow
        } else {
            self.shared.request_cancel();
            CloseResponse::Veto
        }
    }

    /// Drain every queued command without blocking, applying and
    /// acknowledging each in order.
    ///
    /// The acknowledgment for [`DisplayCommand::Close`] is withheld until the
    /// session is dropped, which the display does only after releasing its
    /// resources; the controller's `close` stays blocked until then.
    pub fn pump<F>(&mut self, mut apply: F) -> PumpOutcome
    where
        F: FnMut(&DisplayCommand),
    {
        loop {
            match self.commands.try_recv() {
                Ok(marshaled) => {
                    if let Some(outcome) = self.handle(marshaled, &mut apply) {
                        return outcome;
                    }
                }
                Err(TryRecvError::Empty) => return PumpOutcome::Idle,
                Err(TryRecvError::Disconnected) => return PumpOutcome::Disconnected,
            }
        }
    }

    /// Block for the next command, apply and acknowledge it.
    ///
    /// Returns [`PumpOutcome::Idle`] after applying a property push.
    pub fn wait_one<F>(&mut self, mut apply: F) -> PumpOutcome
    where
        F: FnMut(&DisplayCommand),
    {
        match self.commands.recv() {
            Ok(marshaled) => self
                .handle(marshaled, &mut apply)
                .unwrap_or(PumpOutcome::Idle),
            Err(_) => PumpOutcome::Disconnected,
        }
    }

    fn handle<F>(&mut self, marshaled: Marshaled, apply: &mut F) -> Option<PumpOutcome>
    where
        F: FnMut(&DisplayCommand),
    {
        if marshaled.command == DisplayCommand::Close {
            self.close_ack = Some(marshaled.done);
            return Some(PumpOutcome::CloseRequested);
        }
        apply(&marshaled.command);
        let _ = marshaled.done.send(());
        None
    }
}

impl Drop for DisplaySession {
    fn drop(&mut self) {
        if let Some(ack) = self.close_ack.take() {
            let _ = ack.send(());
        }
    }
}
