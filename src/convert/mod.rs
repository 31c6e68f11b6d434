//! File discovery and the batch conversion job.
//!
//! A drop on the main window spawns one job thread. The job discovers the
//! files to convert, drives a full progress dialog session while invoking
//! the converter once per file, and reports a summary back to the UI.

mod discover;
mod runner;

pub use discover::discover_files;
pub use runner::{ConvertError, convert_file};

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use crate::config::AppSettings;
use crate::progress::{OwnerBounds, ProgressController, ProgressError};

/// Messages sent from a conversion job back to the UI thread.
pub enum ConvertMessage {
    /// The batch finished (successfully, with failures, or canceled).
    Finished(ConversionFinished),
}

/// End-of-batch summary reported to the drop window.
#[derive(Debug, Clone, Default)]
pub struct ConversionFinished {
    /// Number of files discovered for conversion.
    pub total: usize,
    /// Files converted successfully.
    pub converted: usize,
    /// Whether the user canceled the batch.
    pub canceled: bool,
    /// Per-file and lifecycle errors, in occurrence order.
    pub errors: Vec<String>,
}

/// Result of driving the per-file loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOutcome {
    /// Files converted successfully.
    pub converted: usize,
    /// Whether the loop stopped because the user canceled.
    pub canceled: bool,
}

/// Spawn the conversion job for one drop selection.
pub fn spawn_conversion_job(
    roots: Vec<PathBuf>,
    settings: AppSettings,
    owner: Option<OwnerBounds>,
    messages: Sender<ConvertMessage>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let finished = run_conversion_job(roots, &settings, owner);
        let _ = messages.send(ConvertMessage::Finished(finished));
    })
}

/// Run a full conversion batch behind a modal progress dialog.
fn run_conversion_job(
    roots: Vec<PathBuf>,
    settings: &AppSettings,
    owner: Option<OwnerBounds>,
) -> ConversionFinished {
    let mut errors = Vec::new();
    let files = discover_files(&roots, settings, &mut errors);
    tracing::info!("Discovered {} file(s) to convert", files.len());
    if files.is_empty() {
        return ConversionFinished {
            total: 0,
            converted: 0,
            canceled: false,
            errors,
        };
    }

    let mut controller = ProgressController::new();
    let outcome = match start_session(&mut controller, owner) {
        Ok(()) => convert_files(
            &controller,
            &files,
            |path| convert_file(settings, path),
            &mut errors,
        ),
        Err(err) => Err(err),
    };
    let outcome = match outcome {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            tracing::error!("Progress dialog session failed: {err}");
            errors.push(err.to_string());
            None
        }
    };

    match controller.close() {
        Ok(()) | Err(ProgressError::NotRunning) => {}
        Err(err) => tracing::warn!("Closing the progress dialog failed: {err}"),
    }
    if let Err(err) = controller.dispose() {
        tracing::warn!("Progress dialog teardown failed: {err}");
    }

    ConversionFinished {
        total: files.len(),
        converted: outcome.map(|o| o.converted).unwrap_or(0),
        canceled: outcome.map(|o| o.canceled).unwrap_or(false),
        errors,
    }
}

fn start_session(
    controller: &mut ProgressController,
    owner: Option<OwnerBounds>,
) -> Result<(), ProgressError> {
    controller.set_title("webpdrop")?;
    controller.set_minimum(0)?;
    controller.set_maximum(100)?;
    controller.set_value(0)?;
    controller.show(owner)
}

/// Convert `files` one at a time against an already-shown controller,
/// updating the dialog between items and polling for cancellation.
///
/// Per-file failures are logged, recorded in `errors`, and skipped; only
/// controller lifecycle errors abort the loop.
pub fn convert_files<C>(
    controller: &ProgressController,
    files: &[PathBuf],
    mut convert: C,
    errors: &mut Vec<String>,
) -> Result<ConvertOutcome, ProgressError>
where
    C: FnMut(&Path) -> Result<(), ConvertError>,
{
    let minimum = controller.minimum();
    let maximum = controller.maximum();
    let mut converted = 0usize;
    for (index, path) in files.iter().enumerate() {
        if controller.canceled() {
            return Ok(ConvertOutcome {
                converted,
                canceled: true,
            });
        }
        controller.set_message(format!("Converting {}", path.display()))?;
        match convert(path) {
            Ok(()) => converted += 1,
            Err(err) => {
                tracing::warn!("{err}");
                errors.push(err.to_string());
            }
        }
        controller.set_value(progress_value(minimum, maximum, index + 1, files.len()))?;
    }
    Ok(ConvertOutcome {
        converted,
        canceled: controller.canceled(),
    })
}

/// Progress value after `done` of `total` items, scaled into the range.
fn progress_value(minimum: i32, maximum: i32, done: usize, total: usize) -> i32 {
    if total == 0 || maximum <= minimum {
        return minimum;
    }
    let span = i64::from(maximum) - i64::from(minimum);
    let scaled = span * done as i64 / total as i64;
    (i64::from(minimum) + scaled) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_value_scales_into_range() {
        assert_eq!(progress_value(0, 100, 0, 4), 0);
        assert_eq!(progress_value(0, 100, 1, 4), 25);
        assert_eq!(progress_value(0, 100, 4, 4), 100);
        // Non-divisible counts still land exactly on the maximum.
        assert_eq!(progress_value(0, 100, 7, 7), 100);
        assert_eq!(progress_value(10, 20, 1, 2), 15);
    }

    #[test]
    fn progress_value_handles_degenerate_ranges() {
        assert_eq!(progress_value(0, 100, 1, 0), 0);
        assert_eq!(progress_value(50, 50, 1, 2), 50);
        assert_eq!(progress_value(50, 10, 1, 2), 50);
    }
}
