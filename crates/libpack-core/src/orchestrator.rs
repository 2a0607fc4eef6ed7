//! One-shot build orchestration.
//!
//! Packages are built strictly one after another. The three variants of a
//! package are submitted to the engine together and all of them are awaited
//! before the next package starts. A failed variant is recorded in the run
//! result and never aborts the batch.

use crate::engine::{BundleEngine, EngineError};
use crate::error::Error;
use crate::synth::{BuildConfiguration, ConfigSynthesizer};
use crate::variant::variant_matrix;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Schema version for serialized run results.
pub const BUILD_RUN_SCHEMA_VERSION: u32 = 1;

/// Error attached to a failed variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildErrorInfo {
    /// Stable error code (see [`crate::codes`]).
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl BuildErrorInfo {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<EngineError> for BuildErrorInfo {
    fn from(err: EngineError) -> Self {
        Self {
            code: err.kind.code().to_string(),
            message: err.message,
            detail: err.detail,
        }
    }
}

/// Outcome of one engine submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantResult {
    pub package: String,
    /// Variant name (`unminified`, `minified`, `core`).
    pub variant: String,
    pub ok: bool,
    pub duration_ms: u64,
    /// Files reported by the engine.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BuildErrorInfo>,
}

impl VariantResult {
    /// Short label, e.g. `mermaid/core`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}/{}", self.package, self.variant)
    }
}

/// Totals for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRunSummary {
    /// Packages built.
    pub packages: u32,
    pub variants_total: u32,
    pub succeeded: u32,
    pub failed: u32,
    /// Wall-clock duration of the whole run.
    pub duration_ms: u64,
}

/// Aggregate result of a one-shot run.
///
/// `ok` is false as soon as any variant failed; callers decide the process
/// exit status from it via [`BuildRunResult::exit_code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRunResult {
    pub schema_version: u32,
    /// Project root.
    pub cwd: String,
    pub ok: bool,
    /// Variant results, per package in submission order.
    pub results: Vec<VariantResult>,
    pub summary: BuildRunSummary,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl BuildRunResult {
    #[must_use]
    pub fn new(cwd: impl Into<String>) -> Self {
        Self {
            schema_version: BUILD_RUN_SCHEMA_VERSION,
            cwd: cwd.into(),
            ok: true,
            results: Vec::new(),
            summary: BuildRunSummary::default(),
            notes: Vec::new(),
        }
    }

    /// Record a variant result.
    pub fn add_result(&mut self, result: VariantResult) {
        self.summary.variants_total += 1;
        if result.ok {
            self.summary.succeeded += 1;
        } else {
            self.ok = false;
            self.summary.failed += 1;
        }
        self.results.push(result);
    }

    /// Fill in the totals that are only known at the end.
    pub fn finalize(&mut self, packages: u32, duration_ms: u64) {
        self.summary.packages = packages;
        self.summary.duration_ms = duration_ms;
        if self.summary.failed > 0 {
            self.notes.push(format!(
                "{} of {} variants failed",
                self.summary.failed, self.summary.variants_total
            ));
        }
    }

    /// Process exit code for this result.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.ok)
    }

    /// Failed variant results.
    pub fn failures(&self) -> impl Iterator<Item = &VariantResult> {
        self.results.iter().filter(|r| !r.ok)
    }
}

/// The configurations of one package, in variant order.
#[derive(Debug, Clone)]
pub struct PackagePlan {
    pub package: String,
    pub configs: Vec<BuildConfiguration>,
}

/// Drives one-shot builds across every registered package.
#[derive(Clone)]
pub struct BuildOrchestrator {
    synthesizer: ConfigSynthesizer,
    engine: Arc<dyn BundleEngine>,
}

impl std::fmt::Debug for BuildOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOrchestrator")
            .field("synthesizer", &self.synthesizer)
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl BuildOrchestrator {
    #[must_use]
    pub fn new(synthesizer: ConfigSynthesizer, engine: Arc<dyn BundleEngine>) -> Self {
        Self {
            synthesizer,
            engine,
        }
    }

    /// Synthesize every configuration of the run, in registry order.
    ///
    /// # Errors
    /// Returns the first synthesis error; nothing has been submitted yet.
    pub fn plan(&self) -> Result<Vec<PackagePlan>, Error> {
        self.synthesizer
            .registry()
            .iter()
            .map(|pkg| {
                let configs = variant_matrix(&pkg.name)
                    .iter()
                    .map(|intent| self.synthesizer.synthesize(intent))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PackagePlan {
                    package: pkg.name.clone(),
                    configs,
                })
            })
            .collect()
    }

    /// Run the full build.
    ///
    /// # Errors
    /// Only configuration errors are returned, before any submission.
    /// Variant failures are reported in the returned result.
    pub async fn run(&self) -> Result<BuildRunResult, Error> {
        let plans = self.plan()?;
        Ok(self.execute(plans).await)
    }

    /// Submit planned configurations.
    pub async fn execute(&self, plans: Vec<PackagePlan>) -> BuildRunResult {
        let start = Instant::now();
        let mut result = BuildRunResult::new(self.synthesizer.root().display().to_string());
        let packages = plans.len() as u32;

        for plan in plans {
            info!(package = %plan.package, variants = plan.configs.len(), "building package");
            let settled = join_all(
                plan.configs
                    .into_iter()
                    .map(|config| submit(self.engine.as_ref(), config)),
            )
            .await;
            for variant in settled {
                result.add_result(variant);
            }
        }

        result.finalize(packages, start.elapsed().as_millis() as u64);
        result
    }
}

/// Submit one configuration and wait for it to settle.
pub(crate) async fn submit(engine: &dyn BundleEngine, config: BuildConfiguration) -> VariantResult {
    let package = config.intent.package.clone();
    let variant = config.intent.variant_name();
    let start = Instant::now();
    let outcome = engine.build(config).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(report) => {
            info!(%package, %variant, duration_ms, files = report.files.len(), "variant built");
            VariantResult {
                package,
                variant,
                ok: true,
                duration_ms,
                files: report.files,
                error: None,
            }
        }
        Err(err) => {
            warn!(%package, %variant, duration_ms, code = err.kind.code(), error = %err.message, "variant failed");
            VariantResult {
                package,
                variant,
                ok: false,
                duration_ms,
                files: Vec::new(),
                error: Some(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;
    use crate::engine::{EngineErrorKind, EngineFuture, EngineReport};
    use crate::plugin::GrammarPlugin;
    use crate::registry::{PackageDescriptor, PackageRegistry};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Engine that records events and fails the listed labels.
    #[derive(Default)]
    struct FakeEngine {
        fail: HashSet<String>,
        events: Mutex<Vec<String>>,
    }

    impl FakeEngine {
        fn failing(labels: &[&str]) -> Self {
            Self {
                fail: labels.iter().map(|l| (*l).to_string()).collect(),
                events: Mutex::new(Vec::new()),
            }
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl BundleEngine for FakeEngine {
        fn name(&self) -> &str {
            "fake"
        }

        fn build(&self, config: BuildConfiguration) -> EngineFuture<'_> {
            Box::pin(async move {
                let label = config.intent.label();
                self.events.lock().unwrap().push(format!("start {label}"));
                tokio::task::yield_now().await;
                self.events.lock().unwrap().push(format!("end {label}"));
                if self.fail.contains(&label) {
                    Err(EngineError::build(format!("{label} failed")).with_detail("stack"))
                } else {
                    Ok(EngineReport::with_files(config.output_file_names()))
                }
            })
        }
    }

    fn synthesizer(names: &[&str]) -> ConfigSynthesizer {
        let registry = PackageRegistry::new(
            names
                .iter()
                .map(|n| PackageDescriptor::new(*n, "index.ts").with_dependencies(["x", "y"]))
                .collect(),
        )
        .unwrap();
        ConfigSynthesizer::new("/work", Arc::new(registry), Arc::new(GrammarPlugin::new()))
    }

    #[test]
    fn test_plan_covers_every_package_and_variant() {
        let engine = Arc::new(FakeEngine::default());
        let orchestrator = BuildOrchestrator::new(synthesizer(&["one", "two"]), engine);
        let plans = orchestrator.plan().unwrap();

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].package, "one");
        assert_eq!(plans[1].package, "two");
        for plan in &plans {
            assert_eq!(plan.configs.len(), 3);
            assert_eq!(plan.configs.iter().filter(|c| c.intent.core).count(), 1);
            assert!(plan.configs.iter().all(|c| !c.intent.watch));
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let engine = Arc::new(FakeEngine::failing(&["one/core"]));
        let orchestrator = BuildOrchestrator::new(synthesizer(&["one", "two"]), engine.clone());
        let result = orchestrator.run().await.unwrap();

        assert!(!result.ok);
        assert_eq!(result.exit_code(), 1);
        assert_eq!(result.summary.packages, 2);
        assert_eq!(result.summary.variants_total, 6);
        assert_eq!(result.summary.succeeded, 5);
        assert_eq!(result.summary.failed, 1);

        let failed: Vec<_> = result.failures().map(VariantResult::label).collect();
        assert_eq!(failed, vec!["one/core"]);
        let error = result.results[2].error.as_ref().unwrap();
        assert_eq!(error.code, codes::BUILD_ENGINE_FAILED);
        assert_eq!(error.detail.as_deref(), Some("stack"));

        let started: Vec<_> = engine
            .events()
            .into_iter()
            .filter(|e| e.starts_with("start two/"))
            .collect();
        assert_eq!(started.len(), 3);
        assert_eq!(result.notes, vec!["1 of 6 variants failed".to_string()]);
    }

    #[tokio::test]
    async fn test_packages_are_sequential_and_variants_concurrent() {
        let engine = Arc::new(FakeEngine::default());
        let orchestrator = BuildOrchestrator::new(synthesizer(&["one", "two"]), engine.clone());
        orchestrator.run().await.unwrap();

        let events = engine.events();
        let position = |e: &str| events.iter().position(|x| x == e).unwrap();

        // All three variants of a package start before any of them ends.
        for pkg in ["one", "two"] {
            let last_start = ["unminified", "minified", "core"]
                .iter()
                .map(|v| position(&format!("start {pkg}/{v}")))
                .max()
                .unwrap();
            let first_end = ["unminified", "minified", "core"]
                .iter()
                .map(|v| position(&format!("end {pkg}/{v}")))
                .min()
                .unwrap();
            assert!(last_start < first_end);
        }

        let last_end_one = ["unminified", "minified", "core"]
            .iter()
            .map(|v| position(&format!("end one/{v}")))
            .max()
            .unwrap();
        let first_start_two = position("start two/unminified");
        assert!(last_end_one < first_start_two);
    }

    #[tokio::test]
    async fn test_results_in_submission_order() {
        let engine = Arc::new(FakeEngine::default());
        let orchestrator = BuildOrchestrator::new(synthesizer(&["one"]), engine);
        let result = orchestrator.run().await.unwrap();

        assert!(result.ok);
        assert_eq!(result.exit_code(), 0);
        let variants: Vec<_> = result.results.iter().map(|r| r.variant.as_str()).collect();
        assert_eq!(variants, vec!["unminified", "minified", "core"]);
        assert_eq!(
            result.results[2].files,
            vec![PathBuf::from("one.core.mjs")]
        );
        assert!(result.notes.is_empty());
    }

    #[tokio::test]
    async fn test_plugin_failure_only_fails_its_variant() {
        struct PluginFailing;
        impl BundleEngine for PluginFailing {
            fn name(&self) -> &str {
                "plugin-failing"
            }
            fn build(&self, config: BuildConfiguration) -> EngineFuture<'_> {
                Box::pin(async move {
                    if config.intent.minify.is_enabled() && !config.intent.core {
                        Err(crate::plugin::PluginError::new("jison", "unexpected token")
                            .with_id("src/parser.jison")
                            .into())
                    } else {
                        Ok(EngineReport::default())
                    }
                })
            }
        }

        let orchestrator =
            BuildOrchestrator::new(synthesizer(&["one", "two"]), Arc::new(PluginFailing));
        let result = orchestrator.run().await.unwrap();
        assert_eq!(result.summary.failed, 2);
        assert_eq!(result.summary.succeeded, 4);
        assert!(result
            .failures()
            .all(|r| r.variant == "minified"
                && r.error.as_ref().unwrap().code == EngineErrorKind::Plugin.code()));
    }

    #[test]
    fn test_result_serializes() {
        let mut result = BuildRunResult::new("/work");
        result.add_result(VariantResult {
            package: "one".to_string(),
            variant: "core".to_string(),
            ok: false,
            duration_ms: 3,
            files: Vec::new(),
            error: Some(BuildErrorInfo::new(codes::BUILD_ENGINE_SPAWN_FAILED, "boom")),
        });
        result.finalize(1, 5);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["ok"], false);
        assert_eq!(json["summary"]["failed"], 1);
        assert_eq!(
            json["results"][0]["error"]["code"],
            codes::BUILD_ENGINE_SPAWN_FAILED
        );
        assert!(json["results"][0]["error"].get("detail").is_none());
    }
}
