use crate::error::{TrellisError, TrellisResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Order in which redo picks among undone changesets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedoOrder {
    /// Most recently undone first (stack).
    Lifo,
    /// Oldest undone first (queue).
    Fifo,
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Additions are flushed to the graph store in groups of this size.
    pub addition_batch_size: usize,
    /// Drop the redo log when a new changeset commits.
    pub clear_redo_on_commit: bool,
    pub redo_order: RedoOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            addition_batch_size: 5_000,
            clear_redo_on_commit: true,
            redo_order: RedoOrder::Lifo,
        }
    }
}

impl EngineConfig {
    /// Larger flushes for loading whole ontologies in one changeset.
    pub fn bulk_load() -> Self {
        Self {
            addition_batch_size: 50_000,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> TrellisResult<()> {
        if self.addition_batch_size == 0 {
            return Err(TrellisError::Config(
                "addition_batch_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Parse TOML; missing keys fall back to defaults.
    pub fn from_toml_str(contents: &str) -> TrellisResult<Self> {
        let config: EngineConfig =
            toml::from_str(contents).map_err(|e| TrellisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> TrellisResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TrellisError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = EngineConfig::default();
        assert_eq!(c.addition_batch_size, 5_000);
        assert!(c.clear_redo_on_commit);
        assert_eq!(c.redo_order, RedoOrder::Lifo);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn bulk_load_config() {
        let c = EngineConfig::bulk_load();
        assert!(c.addition_batch_size > EngineConfig::default().addition_batch_size);
        assert!(c.clear_redo_on_commit);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = EngineConfig::from_toml_str("redo_order = \"fifo\"\n").unwrap();
        assert_eq!(c.redo_order, RedoOrder::Fifo);
        assert_eq!(c.addition_batch_size, 5_000);
    }

    #[test]
    fn zero_batch_rejected() {
        let err = EngineConfig::from_toml_str("addition_batch_size = 0").unwrap_err();
        assert!(matches!(err, TrellisError::Config(_)));
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let c = EngineConfig::load("/nonexistent/trellis.toml").unwrap();
        assert_eq!(c, EngineConfig::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trellis.toml");
        std::fs::write(&path, "addition_batch_size = 2\nclear_redo_on_commit = false\n").unwrap();
        let c = EngineConfig::load(&path).unwrap();
        assert_eq!(c.addition_batch_size, 2);
        assert!(!c.clear_redo_on_commit);
    }
}
