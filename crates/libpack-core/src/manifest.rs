//! Package manifest (`package.json`) reading.
//!
//! Only the dependency names matter here: in core mode every declared
//! dependency is kept out of the bundle.

use crate::error::Error;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// The subset of `package.json` libpack reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    /// Dependency name -> version range.
    #[serde(default)]
    pub dependencies: BTreeMap<String, serde_json::Value>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str_at(&content, path)
    }

    fn from_str_at(content: &str, path: &Path) -> Result<Self, Error> {
        serde_json::from_str(content).map_err(|source| Error::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Declared dependency names, sorted.
    #[must_use]
    pub fn dependency_names(&self) -> BTreeSet<String> {
        self.dependencies.keys().cloned().collect()
    }
}
