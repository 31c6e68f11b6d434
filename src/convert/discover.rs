//! Expansion of a drop selection into the list of files to convert.

use std::path::{Path, PathBuf};

use crate::config::AppSettings;

/// Recursively expand `roots` into every file with an accepted extension.
///
/// Directories are walked depth-first in name order so batches are stable;
/// each file under a dropped path is visited exactly once. Unreadable
/// directories are recorded in `errors` and skipped.
pub fn discover_files(
    roots: &[PathBuf],
    settings: &AppSettings,
    errors: &mut Vec<String>,
) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        visit(root, settings, &mut files, errors);
    }
    files
}

fn visit(path: &Path, settings: &AppSettings, files: &mut Vec<PathBuf>, errors: &mut Vec<String>) {
    if path.is_dir() {
        let entries = match std::fs::read_dir(path) {
            Ok(entries) => entries,
            Err(err) => {
                errors.push(format!("{}: {err}", path.display()));
                return;
            }
        };
        let mut children: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        children.sort();
        for child in children {
            visit(&child, settings, files, errors);
        }
    } else if settings.accepts(path) {
        files.push(path.to_path_buf());
    }
}
