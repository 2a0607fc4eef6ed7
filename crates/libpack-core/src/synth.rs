//! Build configuration synthesis.
//!
//! [`ConfigSynthesizer::synthesize`] maps a [`BuildIntent`] to a complete
//! [`BuildConfiguration`]. It is pure: no I/O, no hidden state, and the same
//! intent always yields an equal configuration. The only failure is an
//! intent naming an unregistered package.

use crate::error::Error;
use crate::plugin::{PluginRegistration, SourceTransform};
use crate::registry::{PackageDescriptor, PackageRegistry};
use crate::variant::{BuildIntent, Minify};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Runtime-provided modules that are never bundled.
pub const HOST_MODULES: &[&str] = &["require", "fs", "path"];

/// Extensions the engine always resolves, after any plugin extension.
pub const STANDARD_EXTENSIONS: &[&str] = &[".js", ".ts", ".json"];

/// Glob, relative to the package root, that watch mode rebuilds on.
pub const WATCH_INCLUDE: &str = "src/**";

/// Default directory (under the project root) holding the packages.
pub const DEFAULT_PACKAGES_DIR: &str = "packages";

/// Output module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    Esm,
    Umd,
}

impl ModuleFormat {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Esm => "esm",
            Self::Umd => "umd",
        }
    }
}

/// One emitted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDescriptor {
    /// Logical name (UMD global name).
    pub name: String,
    pub format: ModuleFormat,
    pub sourcemap: bool,
    /// File name template; the engine substitutes `[name]`.
    pub entry_file_names: String,
}

impl OutputDescriptor {
    /// Suffix inserted before the extension of minified artifacts.
    pub const MIN_SUFFIX: &'static str = ".min";

    /// `[name].esm.mjs` or `[name].esm.min.mjs`.
    #[must_use]
    pub fn esm(name: &str, minified: bool) -> Self {
        Self::new(name, ModuleFormat::Esm, format!("[name].esm{}.mjs", min_suffix(minified)))
    }

    /// `[name].js` or `[name].min.js`.
    #[must_use]
    pub fn umd(name: &str, minified: bool) -> Self {
        Self::new(name, ModuleFormat::Umd, format!("[name]{}.js", min_suffix(minified)))
    }

    /// `[name].core.mjs`. Core builds are always fully minified, so the
    /// name carries no minification suffix.
    #[must_use]
    pub fn core(name: &str) -> Self {
        Self::new(name, ModuleFormat::Esm, "[name].core.mjs".to_string())
    }

    fn new(name: &str, format: ModuleFormat, entry_file_names: String) -> Self {
        Self {
            name: name.to_string(),
            format,
            sourcemap: true,
            entry_file_names,
        }
    }

    /// The concrete file name for a library file name.
    #[must_use]
    pub fn file_name(&self, lib_file_name: &str) -> String {
        self.entry_file_names.replace("[name]", lib_file_name)
    }
}

fn min_suffix(minified: bool) -> &'static str {
    if minified {
        OutputDescriptor::MIN_SUFFIX
    } else {
        ""
    }
}

/// Library entry description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryOptions {
    /// Absolute path of the entry source file.
    pub entry: PathBuf,
    /// Library name.
    pub name: String,
    /// Base file name substituted for `[name]`.
    pub file_name: String,
}

/// Module resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveOptions {
    /// Extensions tried during resolution, in order.
    pub extensions: Vec<String>,
}

/// Persistent-watch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchSpec {
    /// Package root the include glob is relative to.
    pub root: PathBuf,
    pub include: String,
}

/// A complete configuration for one engine submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfiguration {
    /// The intent this configuration was synthesized from.
    pub intent: BuildIntent,
    /// Whether the engine may load its own config file. Always false.
    pub config_file: bool,
    /// Whether the engine may clear `out_dir` first. Always false.
    pub empty_out_dir: bool,
    pub out_dir: PathBuf,
    pub library: LibraryOptions,
    pub minify: Minify,
    /// Module ids excluded from the bundle.
    pub external: Vec<String>,
    pub output: Vec<OutputDescriptor>,
    pub resolve: ResolveOptions,
    pub plugins: Vec<PluginRegistration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch: Option<WatchSpec>,
}

impl BuildConfiguration {
    /// Concrete output file names, in descriptor order.
    #[must_use]
    pub fn output_file_names(&self) -> Vec<String> {
        self.output
            .iter()
            .map(|o| o.file_name(&self.library.file_name))
            .collect()
    }
}

/// Maps build intents to configurations.
#[derive(Clone)]
pub struct ConfigSynthesizer {
    root: PathBuf,
    packages_dir: PathBuf,
    registry: Arc<PackageRegistry>,
    transform: Arc<dyn SourceTransform>,
}

impl std::fmt::Debug for ConfigSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSynthesizer")
            .field("root", &self.root)
            .field("packages_dir", &self.packages_dir)
            .field("packages", &self.registry.names())
            .field("transform", &self.transform.name())
            .finish()
    }
}

impl ConfigSynthesizer {
    /// Create a synthesizer rooted at the project directory.
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        registry: Arc<PackageRegistry>,
        transform: Arc<dyn SourceTransform>,
    ) -> Self {
        Self {
            root: root.into(),
            packages_dir: PathBuf::from(DEFAULT_PACKAGES_DIR),
            registry,
            transform,
        }
    }

    /// Set the packages directory (relative to the root, or absolute).
    #[must_use]
    pub fn with_packages_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.packages_dir = dir.into();
        self
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The registry this synthesizer resolves packages against.
    #[must_use]
    pub fn registry(&self) -> &PackageRegistry {
        &self.registry
    }

    /// Root directory of a package.
    #[must_use]
    pub fn package_root(&self, pkg: &PackageDescriptor) -> PathBuf {
        self.root.join(&self.packages_dir).join(&pkg.name)
    }

    /// Synthesize the configuration for an intent.
    ///
    /// # Errors
    /// Returns [`Error::UnknownPackage`] if the intent's package is not
    /// registered.
    pub fn synthesize(&self, intent: &BuildIntent) -> Result<BuildConfiguration, Error> {
        let pkg = self.registry.require(&intent.package)?;
        let package_root = self.package_root(pkg);

        let mut external: Vec<String> = HOST_MODULES.iter().map(|m| (*m).to_string()).collect();

        let output = if intent.core {
            for dep in &pkg.dependencies {
                if !external.contains(dep) {
                    external.push(dep.clone());
                }
            }
            vec![OutputDescriptor::core(&pkg.name)]
        } else {
            let minified = intent.minify.is_enabled();
            vec![
                OutputDescriptor::esm(&pkg.name, minified),
                OutputDescriptor::umd(&pkg.name, minified),
            ]
        };

        let mut extensions = vec![self.transform.extension().to_string()];
        extensions.extend(STANDARD_EXTENSIONS.iter().map(|e| (*e).to_string()));

        let watch = intent.watch.then(|| WatchSpec {
            root: package_root.clone(),
            include: WATCH_INCLUDE.to_string(),
        });

        let config = BuildConfiguration {
            intent: intent.clone(),
            config_file: false,
            empty_out_dir: false,
            out_dir: package_root.join("dist"),
            library: LibraryOptions {
                entry: package_root.join("src").join(&pkg.entry),
                name: pkg.name.clone(),
                file_name: pkg.name.clone(),
            },
            minify: intent.minify,
            external,
            output,
            resolve: ResolveOptions { extensions },
            plugins: vec![self.transform.registration()],
            watch,
        };

        debug!(
            target: "libpack::synth",
            package = %pkg.name,
            intent = %intent.label(),
            outputs = config.output.len(),
            externals = config.external.len(),
            "synthesized build configuration"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::GrammarPlugin;
    use crate::registry::PackageDescriptor;
    use crate::variant::{variant_matrix, Variant};
    use std::collections::BTreeSet;

    fn synthesizer() -> ConfigSynthesizer {
        let registry = PackageRegistry::new(vec![
            PackageDescriptor::new("alpha", "index.ts").with_dependencies(["x", "y"]),
            PackageDescriptor::new("beta", "registry.ts"),
        ])
        .unwrap();
        ConfigSynthesizer::new(
            "/work",
            Arc::new(registry),
            Arc::new(GrammarPlugin::new().with_module(".vite/jisonPlugin.js")),
        )
    }

    fn externals(config: &BuildConfiguration) -> BTreeSet<&str> {
        config.external.iter().map(String::as_str).collect()
    }

    fn host_set() -> BTreeSet<&'static str> {
        HOST_MODULES.iter().copied().collect()
    }

    #[test]
    fn test_paths() {
        let config = synthesizer()
            .synthesize(&Variant::Unminified.intent("alpha"))
            .unwrap();
        assert_eq!(config.out_dir, PathBuf::from("/work/packages/alpha/dist"));
        assert_eq!(
            config.library.entry,
            PathBuf::from("/work/packages/alpha/src/index.ts")
        );
        assert_eq!(config.library.name, "alpha");
        assert_eq!(config.library.file_name, "alpha");
        assert!(!config.config_file);
        assert!(!config.empty_out_dir);
    }

    #[test]
    fn test_unknown_package() {
        let err = synthesizer()
            .synthesize(&Variant::Core.intent("gantt"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownPackage { name } if name == "gantt"));
    }

    #[test]
    fn test_pure() {
        let synth = synthesizer();
        for intent in variant_matrix("alpha") {
            let a = synth.synthesize(&intent).unwrap();
            let b = synth.synthesize(&intent).unwrap();
            assert_eq!(a, b);
            assert_eq!(
                serde_json::to_string(&a).unwrap(),
                serde_json::to_string(&b).unwrap()
            );
        }
    }

    #[test]
    fn test_externals_follow_core_mode() {
        let synth = synthesizer();
        for package in ["alpha", "beta"] {
            for minify in [Minify::None, Minify::Fast, Minify::Full] {
                let plain = synth
                    .synthesize(&BuildIntent::new(package, minify))
                    .unwrap();
                assert_eq!(externals(&plain), host_set());

                let core = synth
                    .synthesize(&BuildIntent::new(package, minify).with_core(true))
                    .unwrap();
                let pkg = synth.registry().get(package).unwrap();
                let mut expected = host_set();
                expected.extend(pkg.dependencies.iter().map(String::as_str));
                assert_eq!(externals(&core), expected);
            }
        }
    }

    #[test]
    fn test_alpha_scenario() {
        let synth = synthesizer();
        let configs: Vec<_> = variant_matrix("alpha")
            .iter()
            .map(|i| synth.synthesize(i).unwrap())
            .collect();
        assert_eq!(configs.len(), 3);

        let core: Vec<_> = configs.iter().filter(|c| c.intent.core).collect();
        assert_eq!(core.len(), 1);
        assert_eq!(
            externals(core[0]),
            ["require", "fs", "path", "x", "y"].into_iter().collect()
        );
        for config in configs.iter().filter(|c| !c.intent.core) {
            assert_eq!(externals(config), host_set());
        }
    }

    #[test]
    fn test_output_descriptors() {
        let synth = synthesizer();
        let [plain, fast, core] =
            variant_matrix("alpha").map(|i| synth.synthesize(&i).unwrap());

        assert_eq!(plain.output.len(), 2);
        assert_eq!(plain.output[0].format, ModuleFormat::Esm);
        assert_eq!(plain.output[1].format, ModuleFormat::Umd);
        assert_eq!(plain.output_file_names(), vec!["alpha.esm.mjs", "alpha.js"]);

        assert_eq!(fast.output_file_names(), vec!["alpha.esm.min.mjs", "alpha.min.js"]);

        assert_eq!(core.output.len(), 1);
        assert_eq!(core.output[0].format, ModuleFormat::Esm);
        assert_eq!(core.output_file_names(), vec!["alpha.core.mjs"]);

        for config in [&plain, &fast, &core] {
            assert!(config.output.iter().all(|o| o.sourcemap && o.name == "alpha"));
        }
    }

    #[test]
    fn test_file_names_pairwise_distinct() {
        let synth = synthesizer();
        let names: Vec<String> = variant_matrix("beta")
            .iter()
            .flat_map(|i| synth.synthesize(i).unwrap().output_file_names())
            .collect();
        let unique: BTreeSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_plugin_registered_everywhere() {
        let synth = synthesizer();
        let mut intents = variant_matrix("beta").to_vec();
        intents.push(BuildIntent::watch_mode("beta"));
        for intent in intents {
            let config = synth.synthesize(&intent).unwrap();
            assert_eq!(config.plugins.len(), 1);
            assert_eq!(config.plugins[0].name, "jison");
            assert_eq!(
                config.resolve.extensions,
                vec![".jison", ".js", ".ts", ".json"]
            );
        }
    }

    #[test]
    fn test_watch_spec() {
        let synth = synthesizer();
        let config = synth
            .synthesize(&BuildIntent::watch_mode("alpha"))
            .unwrap();
        let watch = config.watch.unwrap();
        assert_eq!(watch.root, PathBuf::from("/work/packages/alpha"));
        assert_eq!(watch.include, "src/**");

        let one_shot = synth.synthesize(&Variant::Unminified.intent("alpha")).unwrap();
        assert!(one_shot.watch.is_none());
    }

    #[test]
    fn test_watch_accepted_with_any_modes() {
        let synth = synthesizer();
        let intent = BuildIntent::new("alpha", Minify::Full)
            .with_core(true)
            .with_watch(true);
        let config = synth.synthesize(&intent).unwrap();
        assert!(config.watch.is_some());
        assert_eq!(config.output_file_names(), vec!["alpha.core.mjs"]);
    }

    #[test]
    fn test_packages_dir_override() {
        let config = synthesizer()
            .with_packages_dir("libs")
            .synthesize(&Variant::Core.intent("beta"))
            .unwrap();
        assert_eq!(config.out_dir, PathBuf::from("/work/libs/beta/dist"));
    }

    #[test]
    fn test_serialized_shape() {
        let config = synthesizer()
            .synthesize(&Variant::FastMinified.intent("beta"))
            .unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["configFile"], false);
        assert_eq!(json["emptyOutDir"], false);
        assert_eq!(json["minify"], "fast");
        assert_eq!(json["output"][1]["format"], "umd");
        assert_eq!(json["output"][1]["entryFileNames"], "[name].min.js");
        assert!(json.get("watch").is_none());
    }
}
