use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Key the wizard snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "admin-ticket-form";

/// Persisted wizard progress.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WizardSnapshot {
    pub amount: String,
    pub email: String,
    pub phone: String,
    pub step: u8,
    pub generated: bool,
    pub ticket_id: Option<String>,
    pub date_issued: Option<String>,
}

/// JSON file holding string-keyed values.
///
/// Writes go to a sibling temp file first and are renamed into place.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> anyhow::Result<BTreeMap<String, serde_json::Value>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parse state file '{}'", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => {
                Err(e).with_context(|| format!("read state file '{}'", self.path.display()))
            }
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, serde_json::Value>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create state dir '{}'", parent.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(entries).context("serialize state")?;
        std::fs::write(&tmp, bytes)
            .with_context(|| format!("write state file '{}'", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace state file '{}'", self.path.display()))?;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let mut entries = self.read_all()?;
        entries
            .remove(key)
            .map(|v| serde_json::from_value(v).with_context(|| format!("decode state entry '{key}'")))
            .transpose()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let mut entries = self.read_all()?;
        let value = serde_json::to_value(value).with_context(|| format!("encode state entry '{key}'"))?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    /// Remove `key`. Missing keys and missing files are not errors.
    pub fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/wizard/store.rs"]
mod tests;
