pub mod build;
pub mod watch;

use libpack_core::{BundleEngine, Config, ConfigSynthesizer, ProjectConfig};
use miette::{IntoDiagnostic, Result};
use std::sync::Arc;
use tracing::debug;

/// Everything both modes need, loaded once at startup.
pub struct Project {
    pub config: ProjectConfig,
    pub synthesizer: ConfigSynthesizer,
    pub engine: Arc<dyn BundleEngine>,
}

impl Project {
    /// Load `libpack.json`, read the manifests and resolve the engine.
    pub fn load(config: &Config) -> Result<Self> {
        let root = config.cwd.as_path();
        let project = ProjectConfig::load(root).into_diagnostic()?;
        let registry = project.registry(root).into_diagnostic()?;
        let engine = project.engine(root).into_diagnostic()?;
        debug!(
            packages = registry.len(),
            engine = %engine.program().display(),
            "project loaded"
        );

        let synthesizer = ConfigSynthesizer::new(
            root,
            Arc::new(registry),
            Arc::new(project.grammar_plugin()),
        )
        .with_packages_dir(project.packages_dir.clone());

        Ok(Self {
            config: project,
            synthesizer,
            engine: Arc::new(engine),
        })
    }
}
