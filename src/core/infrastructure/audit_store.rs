//! JSON audit trail of resolved application states.

use crate::core::domain::{error::RebootResult, model::application::ApplicationStates};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

const OUTPUT_SUFFIX: &str = "_apps.json";
const FULL_SNAPSHOT_PREFIX: &str = "runcontrol";

/// Writes state maps into a directory, one file per resolution kind.
#[derive(Debug, Clone)]
pub struct AuditStore {
    dir: PathBuf,
}

impl AuditStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the audit file for a filtered resolution, `<state>_apps.json`.
    pub fn state_path(&self, state: &str) -> PathBuf {
        self.dir.join(format!("{}{}", state, OUTPUT_SUFFIX))
    }

    /// Path of the unfiltered snapshot, `runcontrol_apps.json`.
    pub fn snapshot_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}{}", FULL_SNAPSHOT_PREFIX, OUTPUT_SUFFIX))
    }

    /// Persists the applications filtered for `state`.
    pub async fn write_filtered(&self, state: &str, states: &ApplicationStates) -> RebootResult<PathBuf> {
        let path = self.state_path(state);
        write_json(&path, states).await?;
        info!(path = %path.display(), count = states.len(), "Wrote application states");
        Ok(path)
    }

    /// Persists the unfiltered state of every application.
    pub async fn write_snapshot(&self, states: &ApplicationStates) -> RebootResult<PathBuf> {
        let path = self.snapshot_path();
        write_json(&path, states).await?;
        info!(path = %path.display(), count = states.len(), "Wrote full application snapshot");
        Ok(path)
    }
}

/// Reads a state map previously written by [`AuditStore`] or supplied by the operator.
pub async fn load_state_map(path: &Path) -> RebootResult<ApplicationStates> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Serializes with four-space indentation.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> RebootResult<()> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    tokio::fs::write(path, buffer).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_states() -> ApplicationStates {
        [
            ("http://cmsrc-lumi.cms:26000/urn:rcms-fm:fullpath=/lumipro/dip/global/X,group=G,owner=lumipro", "ON"),
            ("http://cmsrc-lumi.cms:26000/urn:rcms-fm:fullpath=/lumipro/central/global/Y,group=G,owner=lumipro", "ON"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[tokio::test]
    async fn test_write_then_load_reproduces_map() {
        let dir = tempdir().unwrap();
        let store = AuditStore::new(dir.path());
        let states = sample_states();

        let path = store.write_filtered("ON", &states).await.unwrap();
        assert_eq!(path, dir.path().join("ON_apps.json"));

        let loaded = load_state_map(&path).await.unwrap();
        assert_eq!(loaded, states);
    }

    #[tokio::test]
    async fn test_snapshot_uses_fixed_name_and_indent() {
        let dir = tempdir().unwrap();
        let store = AuditStore::new(dir.path());

        let path = store.write_snapshot(&sample_states()).await.unwrap();
        assert_eq!(path, dir.path().join("runcontrol_apps.json"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("{\n    \""));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = load_state_map(&dir.path().join("missing.json")).await;
        assert!(matches!(result, Err(crate::core::domain::error::RebootError::Io(_))));
    }
}
