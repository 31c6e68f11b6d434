//! Settings file loading and saving.
//!
//! Settings live in a TOML file inside the `.webpdrop` app directory. A
//! missing file yields defaults, which are written back so users have a
//! template to edit.
//!
//! Config keys (TOML): `converter_command`, `converter_args`, `extensions`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The app directory could not be resolved or created.
    #[error(transparent)]
    AppDir(#[from] app_dirs::AppDirError),
    /// Failed to read the settings file.
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The settings file is not valid TOML.
    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to serialize settings for writing.
    #[error("Failed to serialize settings: {0}")]
    Serialize(toml::ser::Error),
    /// Failed to write the settings file.
    #[error("Failed to write settings file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// User-editable application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Converter executable, resolved next to the app binary when relative.
    #[serde(default = "default_converter_command")]
    pub converter_command: String,
    /// Extra arguments passed to the converter before the file path.
    #[serde(default)]
    pub converter_args: Vec<String>,
    /// Image file extensions accepted for conversion (without dots).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            converter_command: default_converter_command(),
            converter_args: Vec::new(),
            extensions: default_extensions(),
        }
    }
}

fn default_converter_command() -> String {
    "webpconv".to_string()
}

fn default_extensions() -> Vec<String> {
    ["bmp", "jpg", "jpeg", "png", "gif"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl AppSettings {
    /// Lowercase the extension list and strip any leading dots.
    fn normalized(mut self) -> Self {
        for ext in &mut self.extensions {
            *ext = ext.trim_start_matches('.').to_ascii_lowercase();
        }
        self
    }

    /// Whether `path` has an extension in the accepted set (case-insensitive).
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|accepted| *accepted == ext))
    }

    /// Resolve the converter executable path.
    ///
    /// Relative commands are looked up next to the running executable, the
    /// way the converter ships alongside the app; absolute paths are used
    /// as-is.
    pub fn converter_path(&self) -> PathBuf {
        let command = Path::new(&self.converter_command);
        if command.is_absolute() {
            return command.to_path_buf();
        }
        let file_name = if command.extension().is_some() {
            self.converter_command.clone()
        } else {
            format!("{}{}", self.converter_command, std::env::consts::EXE_SUFFIX)
        };
        match std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir()?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load settings from disk, writing defaults back when the file is missing.
pub fn load_or_default() -> Result<AppSettings, ConfigError> {
    let path = config_path()?;
    if path.exists() {
        load_from(&path)
    } else {
        let settings = AppSettings::default();
        save_to_path(&settings, &path)?;
        Ok(settings)
    }
}

/// Load settings from a specific path.
pub fn load_from(path: &Path) -> Result<AppSettings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<AppSettings>(&text)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
        .map(AppSettings::normalized)
}

/// Save settings to a specific path, creating parent directories as needed.
pub fn save_to_path(settings: &AppSettings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string_pretty(settings).map_err(ConfigError::Serialize)?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn accepts_filters_by_extension_case_insensitively() {
        let settings = AppSettings::default();
        assert!(settings.accepts(Path::new("photo.JPG")));
        assert!(settings.accepts(Path::new("anim.gif")));
        assert!(!settings.accepts(Path::new("notes.txt")));
        assert!(!settings.accepts(Path::new("no_extension")));
    }

    #[test]
    fn loads_partial_file_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "converter_command = \"cwebp\"\n").unwrap();

        let settings = load_from(&path).unwrap();
        assert_eq!(settings.converter_command, "cwebp");
        assert_eq!(settings.extensions, AppSettings::default().extensions);
    }

    #[test]
    fn normalizes_extension_spelling() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "extensions = [\".PNG\", \"Jpg\"]\n").unwrap();

        let settings = load_from(&path).unwrap();
        assert_eq!(settings.extensions, vec!["png", "jpg"]);
        assert!(settings.accepts(Path::new("a.png")));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut settings = AppSettings::default();
        settings.converter_args = vec!["-quiet".to_string()];

        save_to_path(&settings, &path).unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.converter_args, vec!["-quiet"]);
    }

    #[test]
    fn rejects_malformed_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "extensions = 12").unwrap();
        assert!(matches!(
            load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn absolute_converter_command_is_used_verbatim() {
        let mut settings = AppSettings::default();
        let absolute = if cfg!(windows) {
            "C:\\tools\\cwebp.exe"
        } else {
            "/usr/bin/cwebp"
        };
        settings.converter_command = absolute.to_string();
        assert_eq!(settings.converter_path(), PathBuf::from(absolute));
    }
}
