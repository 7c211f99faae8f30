//! Select tool settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::selection::pick::SelectFilterPolicy;

const SETTINGS_FILE: &str = "select_tool.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// User preferences of the select tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectToolSettings {
    /// Alpha of the selection box fill (0 - 255)
    pub selection_box_background_opacity: u8,
    pub selection_box_stippled: bool,
    /// Confirm a drawn box as soon as the drag ends
    pub auto_select_box: bool,
    /// Clicking an object's center selects it
    pub select_by_center_handles: bool,
    /// Only the center selects; edges are ignored
    pub only_select_by_center_handles: bool,
    pub keep_visgroups_when_cloning: bool,
}

impl Default for SelectToolSettings {
    fn default() -> Self {
        Self {
            selection_box_background_opacity: 64,
            selection_box_stippled: false,
            auto_select_box: false,
            select_by_center_handles: true,
            only_select_by_center_handles: false,
            keep_visgroups_when_cloning: true,
        }
    }
}

impl SelectToolSettings {
    /// Which part of an object a 2D click must hit
    pub fn filter_policy(&self) -> SelectFilterPolicy {
        if self.only_select_by_center_handles {
            SelectFilterPolicy::CenterHandlesOnly
        } else if !self.select_by_center_handles {
            SelectFilterPolicy::EdgesOnly
        } else {
            SelectFilterPolicy::CenterOrEdges
        }
    }

    fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "editor-tools", "editor-tools")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Load settings from the config dir, or return default if unavailable
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Falling back to default select tool settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save settings to the config dir
    pub fn save(&self) -> Result<(), SettingsError> {
        match Self::config_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_policy() {
        let mut s = SelectToolSettings::default();
        assert_eq!(s.filter_policy(), SelectFilterPolicy::CenterOrEdges);
        s.select_by_center_handles = false;
        assert_eq!(s.filter_policy(), SelectFilterPolicy::EdgesOnly);
        s.only_select_by_center_handles = true;
        assert_eq!(s.filter_policy(), SelectFilterPolicy::CenterHandlesOnly);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let settings = SelectToolSettings {
            auto_select_box: true,
            selection_box_background_opacity: 128,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(SelectToolSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"selection_box_stippled": true}"#).unwrap();
        let s = SelectToolSettings::load_from(&path).unwrap();
        assert!(s.selection_box_stippled);
        assert!(s.keep_visgroups_when_cloning);
    }

    #[test]
    fn test_retired_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"show_3d_widgets": true, "auto_select_box": true}"#).unwrap();
        let s = SelectToolSettings::load_from(&path).unwrap();
        assert!(s.auto_select_box);

        let saved = serde_json::to_value(&s).unwrap();
        assert!(saved.get("show_3d_widgets").is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SelectToolSettings::load_from(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
