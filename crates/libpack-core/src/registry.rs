//! Package registry.
//!
//! The registry is an immutable, ordered table of buildable packages. It is
//! built once at startup (from the project config and manifests) and handed
//! to the synthesizer and orchestrator; nothing mutates it afterwards.

use crate::error::Error;
use std::collections::BTreeSet;

/// Built-in package table: `(name, entry file under src/)`, in build order.
pub const DEFAULT_PACKAGES: &[(&str, &str)] =
    &[("mermaid", "mermaid.ts"), ("mermaid-mindmap", "registry.ts")];

/// Package used by watch mode when the project config does not name one.
pub const DEFAULT_WATCH_PACKAGE: &str = "mermaid";

/// A buildable unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Logical name, unique within the registry. Also the directory name
    /// under the packages dir and the library name given to the engine.
    pub name: String,
    /// Entry file, relative to the package's `src/` directory.
    pub entry: String,
    /// Declared dependency names (externalized in core mode).
    pub dependencies: BTreeSet<String>,
}

impl PackageDescriptor {
    /// Create a descriptor with no dependencies.
    #[must_use]
    pub fn new(name: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry: entry.into(),
            dependencies: BTreeSet::new(),
        }
    }

    /// Set the declared dependency names.
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }
}

/// Ordered, immutable set of packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRegistry {
    packages: Vec<PackageDescriptor>,
}

impl PackageRegistry {
    /// Create a registry, preserving the given order.
    ///
    /// # Errors
    /// Returns [`Error::DuplicatePackage`] if two descriptors share a name.
    pub fn new(packages: Vec<PackageDescriptor>) -> Result<Self, Error> {
        let mut seen = BTreeSet::new();
        for pkg in &packages {
            if !seen.insert(pkg.name.as_str()) {
                return Err(Error::DuplicatePackage {
                    name: pkg.name.clone(),
                });
            }
        }
        Ok(Self { packages })
    }

    /// The built-in table, with empty dependency sets.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            packages: DEFAULT_PACKAGES
                .iter()
                .map(|(name, entry)| PackageDescriptor::new(*name, *entry))
                .collect(),
        }
    }

    /// Look up a package by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PackageDescriptor> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Look up a package by name, failing with [`Error::UnknownPackage`].
    pub fn require(&self, name: &str) -> Result<&PackageDescriptor, Error> {
        self.get(name).ok_or_else(|| Error::unknown_package(name))
    }

    /// Iterate packages in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PackageDescriptor> {
        self.packages.iter()
    }

    /// Package names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.name.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
