//! Domain models for run control applications.
//!
//! The registry endpoint (`running/<registry>`) returns an object keyed by
//! function manager identifier; the states endpoint returns the same keys
//! mapped to a state string. Both are read-only snapshots of one run.

use crate::core::domain::error::RebootResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the running application registry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApplicationRecord {
    /// Resource URI, sent back to the states endpoint.
    #[serde(rename = "URI")]
    pub uri: String,
    /// Resource group identifier (type varies between deployments).
    #[serde(rename = "resGID", default, skip_serializing_if = "Option::is_none")]
    pub res_gid: Option<serde_json::Value>,
    /// Application version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<serde_json::Value>,
}

/// The full registry, keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ApplicationRegistry(BTreeMap<String, ApplicationRecord>);

impl ApplicationRegistry {
    pub fn new(records: BTreeMap<String, ApplicationRecord>) -> Self {
        Self(records)
    }

    /// The list of URIs that the states endpoint expects as its body.
    pub fn extract_uris(&self) -> Vec<String> {
        self.0.values().map(|record| record.uri.clone()).collect()
    }

    pub fn get(&self, identifier: &str) -> Option<&ApplicationRecord> {
        self.0.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Mapping of application identifier to the state string reported upstream.
///
/// State strings are passed through untouched; only equality against the
/// requested state is ever checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ApplicationStates(BTreeMap<String, String>);

impl ApplicationStates {
    pub fn new(states: BTreeMap<String, String>) -> Self {
        Self(states)
    }

    /// Parses an inline JSON object such as `{"<id>": "ON"}`.
    pub fn from_json_str(raw: &str) -> RebootResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Keeps only the entries whose state equals `state`.
    pub fn filter_by_state(&self, state: &str) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(_, value)| value.as_str() == state)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    /// Identifiers in iteration order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.0.get(identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for ApplicationStates {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
