use crate::engine::{CommandEngine, EngineError};
use crate::error::Error;
use crate::manifest::Manifest;
use crate::plugin::GrammarPlugin;
use crate::registry::{PackageDescriptor, PackageRegistry, DEFAULT_PACKAGES, DEFAULT_WATCH_PACKAGE};
use crate::synth::DEFAULT_PACKAGES_DIR;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Project config file name, looked up at the project root.
pub const PROJECT_CONFIG_FILE: &str = "libpack.json";

/// Default workspace manifest, shared by every package.
pub const DEFAULT_MANIFEST: &str = "package.json";

/// Default engine command.
pub const DEFAULT_ENGINE_COMMAND: &[&str] = &["node", ".vite/engine.mjs"];

/// Default module the engine loads the grammar transform from.
pub const DEFAULT_GRAMMAR_MODULE: &str = ".vite/jisonPlugin.js";

/// Runtime configuration for the libpack CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory (the project root).
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// One package entry in `libpack.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageEntry {
    pub name: String,
    /// Entry file under the package's `src/`.
    pub entry: String,
    /// Manifest overriding the project manifest for this package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Program and arguments.
    pub command: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_ENGINE_COMMAND.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarPluginConfig {
    #[serde(default)]
    pub module: Option<String>,
}

impl Default for GrammarPluginConfig {
    fn default() -> Self {
        Self {
            module: Some(DEFAULT_GRAMMAR_MODULE.to_string()),
        }
    }
}

/// Project configuration (`libpack.json`). Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    /// Packages, in build order.
    pub packages: Vec<PackageEntry>,
    /// Package built by watch mode.
    pub default_package: String,
    /// Manifest shared by packages without their own.
    pub manifest: PathBuf,
    pub packages_dir: PathBuf,
    pub engine: EngineConfig,
    pub grammar_plugin: GrammarPluginConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            packages: DEFAULT_PACKAGES
                .iter()
                .map(|(name, entry)| PackageEntry {
                    name: (*name).to_string(),
                    entry: (*entry).to_string(),
                    manifest: None,
                })
                .collect(),
            default_package: DEFAULT_WATCH_PACKAGE.to_string(),
            manifest: PathBuf::from(DEFAULT_MANIFEST),
            packages_dir: PathBuf::from(DEFAULT_PACKAGES_DIR),
            engine: EngineConfig::default(),
            grammar_plugin: GrammarPluginConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Load `libpack.json` from `root`, or the defaults if there is none.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(PROJECT_CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&content).map_err(|source| Error::ConfigParse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the config for errors that would otherwise surface mid-run.
    pub fn validate(&self) -> Result<(), Error> {
        if self.packages.is_empty() {
            return Err(Error::ConfigInvalid("no packages configured".to_string()));
        }
        let mut seen = HashSet::new();
        for pkg in &self.packages {
            if pkg.name.is_empty() {
                return Err(Error::ConfigInvalid("package with empty name".to_string()));
            }
            if !seen.insert(pkg.name.as_str()) {
                return Err(Error::DuplicatePackage {
                    name: pkg.name.clone(),
                });
            }
        }
        if !seen.contains(self.default_package.as_str()) {
            return Err(Error::ConfigInvalid(format!(
                "defaultPackage '{}' is not a configured package",
                self.default_package
            )));
        }
        if self.engine.command.is_empty() {
            return Err(Error::ConfigInvalid("engine command is empty".to_string()));
        }
        Ok(())
    }

    /// Build the package registry, reading each distinct manifest once.
    pub fn registry(&self, root: &Path) -> Result<PackageRegistry, Error> {
        let mut manifests: BTreeMap<PathBuf, BTreeSet<String>> = BTreeMap::new();
        let mut packages = Vec::with_capacity(self.packages.len());

        for entry in &self.packages {
            let path = root.join(entry.manifest.as_ref().unwrap_or(&self.manifest));
            let deps = match manifests.get(&path) {
                Some(deps) => deps.clone(),
                None => {
                    let deps = Manifest::from_path(&path)?.dependency_names();
                    manifests.insert(path, deps.clone());
                    deps
                }
            };
            packages.push(
                PackageDescriptor::new(entry.name.as_str(), entry.entry.as_str())
                    .with_dependencies(deps),
            );
        }

        PackageRegistry::new(packages)
    }

    /// The grammar transform capability.
    #[must_use]
    pub fn grammar_plugin(&self) -> GrammarPlugin {
        match &self.grammar_plugin.module {
            Some(module) => GrammarPlugin::new().with_module(module.as_str()),
            None => GrammarPlugin::new(),
        }
    }

    /// The engine running the configured command in `root`.
    pub fn engine(&self, root: &Path) -> Result<CommandEngine, EngineError> {
        CommandEngine::new(&self.engine.command, root)
    }
}
