//! Watch mode: one long-lived build of a single package.

use crate::engine::BundleEngine;
use crate::error::Error;
use crate::orchestrator::{submit, VariantResult};
use crate::synth::{BuildConfiguration, ConfigSynthesizer};
use crate::variant::BuildIntent;
use std::sync::Arc;
use tracing::info;

/// Submits the unminified, non-core watch build of one package and waits
/// for the engine to stop watching.
#[derive(Clone)]
pub struct WatchModeController {
    synthesizer: ConfigSynthesizer,
    engine: Arc<dyn BundleEngine>,
    package: String,
}

impl std::fmt::Debug for WatchModeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchModeController")
            .field("package", &self.package)
            .field("engine", &self.engine.name())
            .finish_non_exhaustive()
    }
}

impl WatchModeController {
    #[must_use]
    pub fn new(
        synthesizer: ConfigSynthesizer,
        engine: Arc<dyn BundleEngine>,
        package: impl Into<String>,
    ) -> Self {
        Self {
            synthesizer,
            engine,
            package: package.into(),
        }
    }

    /// The watched package.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The only intent watch mode ever builds.
    #[must_use]
    pub fn intent(&self) -> BuildIntent {
        BuildIntent::watch_mode(self.package.as_str())
    }

    /// Configuration for [`Self::intent`].
    pub fn configuration(&self) -> Result<BuildConfiguration, Error> {
        self.synthesizer.synthesize(&self.intent())
    }

    /// Submit the watch build once.
    ///
    /// With a watching engine this only returns when the engine exits.
    ///
    /// # Errors
    /// Returns [`Error::UnknownPackage`] before submitting anything if the
    /// package is not registered.
    pub async fn run(&self) -> Result<VariantResult, Error> {
        let config = self.configuration()?;
        if let Some(spec) = &config.watch {
            info!(package = %self.package, root = %spec.root.display(), include = %spec.include, "watching");
        }
        Ok(submit(self.engine.as_ref(), config).await)
    }
}
