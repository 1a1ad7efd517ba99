//! Structured parsing of function manager identifiers.
//!
//! The registry names every application with a URN of the form
//! `http://host:port/urn:rcms-fm:fullpath=/a/b/c,group=G,owner=O`.
//! The part after the URN prefix is a list of `key=value` segments
//! separated by commas.

use crate::core::domain::error::ValidationError;

const FULLPATH_KEY: &str = "fullpath";

/// A parsed function manager identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullPath {
    raw: String,
    path: String,
    group: Option<String>,
    owner: Option<String>,
}

impl FullPath {
    /// Parses an identifier, requiring a non-empty `fullpath` segment.
    pub fn parse(identifier: &str) -> Result<Self, ValidationError> {
        let start = identifier.find("fullpath=").ok_or_else(|| {
            ValidationError::Format(format!(
                "Identifier has no '{}=' segment: {}",
                FULLPATH_KEY, identifier
            ))
        })?;

        let mut path = None;
        let mut group = None;
        let mut owner = None;

        for segment in identifier[start..].split(',') {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                ValidationError::Format(format!(
                    "Segment '{}' is not a key=value pair in {}",
                    segment, identifier
                ))
            })?;
            match key.trim() {
                FULLPATH_KEY => path = Some(value.trim().to_string()),
                "group" => group = Some(value.trim().to_string()),
                "owner" => owner = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let path = path.unwrap_or_default();
        if path.is_empty() {
            return Err(ValidationError::Field {
                field: FULLPATH_KEY.to_string(),
                message: format!("Path cannot be empty in {}", identifier),
            });
        }
        if !path.starts_with('/') {
            return Err(ValidationError::Format(format!(
                "Path '{}' must be absolute",
                path
            )));
        }

        Ok(Self {
            raw: identifier.to_string(),
            path,
            group,
            owner,
        })
    }

    /// The clean path segment, e.g. `/lumipro/dip/global/X`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// The identifier as received from the registry.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}
