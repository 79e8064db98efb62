use std::path::{Path, PathBuf};

use anyhow::Context;
use prl_identity::DEFAULT_SCOPE;
use prl_lineage::{FileStoreConfig, IdMode, SyncMode};
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "prl.toml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub store: StoreConfig,
    pub identity: IdentityConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub id_mode: IdMode,
    pub sync_mode: SyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".prl/lineage.log"),
            id_mode: IdMode::default(),
            sync_mode: SyncMode::default(),
        }
    }
}

impl StoreConfig {
    pub fn file_store_config(&self) -> FileStoreConfig {
        FileStoreConfig {
            id_mode: self.id_mode,
            sync_mode: self.sync_mode,
        }
    }
}

/// Defaults for identity metadata on `anchor`, `append` and `resolve`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub kind: String,
    pub namespace: String,
    pub scope: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            kind: "motif".into(),
            namespace: "default".into(),
            scope: DEFAULT_SCOPE.into(),
        }
    }
}

impl CliConfig {
    /// Load from an explicit path (which must exist), or from
    /// [`DEFAULT_CONFIG_FILE`] if present, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = CliConfig::default();
        assert_eq!(c.store.path, PathBuf::from(".prl/lineage.log"));
        assert_eq!(c.store.id_mode, IdMode::Uuid);
        assert_eq!(c.store.sync_mode, SyncMode::EveryWrite);
        assert_eq!(c.identity.scope, "global");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let c = CliConfig::parse(
            r#"
            [store]
            id_mode = "sequential"

            [identity]
            namespace = "A1.demo"
            "#,
        )
        .unwrap();
        assert_eq!(c.store.id_mode, IdMode::Sequential);
        assert_eq!(c.store.sync_mode, SyncMode::EveryWrite);
        assert_eq!(c.identity.namespace, "A1.demo");
        assert_eq!(c.identity.kind, "motif");
    }

    #[test]
    fn unknown_modes_are_rejected() {
        assert!(CliConfig::parse("[store]\nid_mode = \"random\"\n").is_err());
        assert!(CliConfig::parse("[store]\nsync_mode = \"sometimes\"\n").is_err());
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prl.toml");
        std::fs::write(&path, "[store]\npath = \"custom.log\"\nsync_mode = \"os_default\"\n").unwrap();
        let c = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(c.store.path, PathBuf::from("custom.log"));
        assert_eq!(c.store.sync_mode, SyncMode::OsDefault);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn serializes_back_to_toml() {
        let text = toml::to_string(&CliConfig::default()).unwrap();
        assert_eq!(CliConfig::parse(&text).unwrap(), CliConfig::default());
    }
}
