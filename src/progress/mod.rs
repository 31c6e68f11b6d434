//! Modal progress dialog controller and display plumbing.
//!
//! A [`ProgressController`] owns one dialog session: it spawns a dedicated
//! display thread, blocks `show` until the dialog is interactive, pushes
//! property updates onto the display context one at a time, and exposes a
//! monotonic cancellation flag the workflow polls between work items.

mod controller;
mod dialog;
mod session;

pub use controller::{ProgressController, ProgressError};
pub use session::{
    CloseResponse, DisplayCommand, DisplayFields, DisplaySession, OwnerBounds, PumpOutcome,
};
