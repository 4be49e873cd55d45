use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::fusion::FusionConfig;
use crate::scoring::ScoringConfig;

/// User-tunable thresholds for both halves of the engine, persisted as one
/// JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TuningSettings {
    pub fusion: FusionConfig,
    pub scoring: ScoringConfig,
}

impl TuningSettings {
    pub fn validate(&self) -> Result<()> {
        self.fusion.validate()?;
        self.scoring.validate()
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TuningSettings>,
}

impl SettingsStore {
    /// Loads settings from disk, falling back to defaults when the file is
    /// absent or unreadable. Invalid threshold values are fatal: a session
    /// must not start against a broken configuration.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            TuningSettings::default()
        };

        data.validate()
            .with_context(|| format!("invalid settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn tuning(&self) -> TuningSettings {
        self.data.read().unwrap().clone()
    }

    pub fn update_tuning(&self, settings: TuningSettings) -> Result<()> {
        settings.validate()?;
        {
            let mut guard = self.data.write().unwrap();
            *guard = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &TuningSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

impl SettingsStore {
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: TuningSettings = serde_json::from_str(&contents)?;
        data.validate()?;
        let mut guard = self.data.write().unwrap();
        *guard = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let tuning = store.tuning();
        assert_eq!(tuning.fusion.smoothing_window, 10);
        assert_eq!(tuning.scoring.empty_score, 0);
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut tuning = store.tuning();
        tuning.fusion.head_angle_limit = 30.0;
        store.update_tuning(tuning).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.tuning().fusion.head_angle_limit, 30.0);
    }

    #[test]
    fn invalid_update_is_rejected() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        let mut tuning = store.tuning();
        tuning.fusion.detection_buffer_len = 0;
        assert!(store.update_tuning(tuning).is_err());
    }
}
