#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::return_self_not_must_use)]

pub mod codes;
pub mod config;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod plugin;
pub mod registry;
pub mod synth;
pub mod variant;
pub mod version;
pub mod watch;

pub use config::{Config, ProjectConfig};
pub use engine::{
    BundleEngine, CommandEngine, EngineError, EngineErrorKind, EngineFuture, EngineReport,
};
pub use error::Error;
pub use orchestrator::{
    BuildErrorInfo, BuildOrchestrator, BuildRunResult, BuildRunSummary, PackagePlan, VariantResult,
};
pub use plugin::{GrammarPlugin, PluginError, PluginRegistration, SourceTransform};
pub use registry::{PackageDescriptor, PackageRegistry};
pub use synth::{BuildConfiguration, ConfigSynthesizer, ModuleFormat, OutputDescriptor};
pub use variant::{variant_matrix, BuildIntent, Minify, Variant};
pub use version::VERSION;
pub use watch::WatchModeController;
