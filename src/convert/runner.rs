//! Invocation of the external converter process.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::config::AppSettings;

/// Errors from a single conversion attempt.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The converter executable could not be started.
    #[error("Failed to start converter {converter}: {source}")]
    Spawn {
        converter: PathBuf,
        source: std::io::Error,
    },
    /// The converter ran but reported failure.
    #[error("Converter failed for {path}: {status}")]
    Failed {
        path: PathBuf,
        status: std::process::ExitStatus,
    },
}

/// Convert one file by running the configured converter on it, waiting for
/// the process to exit.
pub fn convert_file(settings: &AppSettings, path: &Path) -> Result<(), ConvertError> {
    let converter = settings.converter_path();
    let mut command = Command::new(&converter);
    command.args(&settings.converter_args).arg(path);
    hide_console(&mut command);
    let status = command.status().map_err(|source| ConvertError::Spawn {
        converter: converter.clone(),
        source,
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(ConvertError::Failed {
            path: path.to_path_buf(),
            status,
        })
    }
}

#[cfg(windows)]
fn hide_console(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console(_command: &mut Command) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_converter_is_a_spawn_error() {
        let mut settings = AppSettings::default();
        settings.converter_command = if cfg!(windows) {
            "C:\\definitely\\not\\here.exe".to_string()
        } else {
            "/definitely/not/here".to_string()
        };
        let result = convert_file(&settings, Path::new("photo.png"));
        assert!(matches!(result, Err(ConvertError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_a_failure() {
        let mut settings = AppSettings::default();
        settings.converter_command = "/bin/false".to_string();
        let result = convert_file(&settings, Path::new("photo.png"));
        assert!(matches!(result, Err(ConvertError::Failed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_succeeds() {
        let mut settings = AppSettings::default();
        settings.converter_command = "/bin/true".to_string();
        convert_file(&settings, Path::new("photo.png")).unwrap();
    }
}
