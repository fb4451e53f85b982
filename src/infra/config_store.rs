// ============================================================
// Layer 6 — Config Store
// ============================================================
// Saves and restores a ModelSpec as pretty-printed JSON.
//
// `probe` and `inspect` rebuild an encoder from this file alone,
// so it holds every architectural hyperparameter.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::model_spec::ModelSpec;

/// A JSON file holding one ModelSpec.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `spec`, creating parent directories as needed.
    pub fn save(&self, spec: &ModelSpec) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(spec)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Cannot write config to '{}'", self.path.display()))?;

        tracing::debug!("Saved model spec to '{}'", self.path.display());
        Ok(())
    }

    /// Read and validate the stored spec.
    pub fn load(&self) -> Result<ModelSpec> {
        let json = fs::read_to_string(&self.path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Run 'init-config' first.",
                self.path.display()
            )
        })?;

        let spec: ModelSpec = serde_json::from_str(&json)
            .with_context(|| format!("Malformed model spec in '{}'", self.path.display()))?;
        spec.validate()
            .with_context(|| format!("Invalid model spec in '{}'", self.path.display()))?;

        Ok(spec)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::model_spec::Arch;

    #[test]
    fn test_save_then_load() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested/model.json"));
        let spec  = ModelSpec { arch: Arch::Sc, num_layer_dec: 3, ..ModelSpec::default() };

        store.save(&spec).unwrap();
        assert_eq!(store.load().unwrap(), spec);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("absent.json"));
        let err   = store.load().unwrap_err();
        assert!(format!("{err:#}").contains("init-config"));
    }

    #[test]
    fn test_invalid_spec_is_rejected_on_load() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("model.json"));
        store.save(&ModelSpec { num_head: 7, ..ModelSpec::default() }).unwrap();
        assert!(store.load().is_err());
    }
}
