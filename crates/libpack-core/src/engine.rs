//! Bundling engine boundary.
//!
//! The engine compiles, tree-shakes and emits; libpack only hands it a
//! [`BuildConfiguration`] and waits for the outcome. [`BundleEngine`] is the
//! seam, and [`CommandEngine`] is the production implementation that drives
//! an external bundler process.
//!
//! ## Process protocol
//!
//! `CommandEngine` spawns the configured command in the project root and
//! writes the configuration as one JSON document to its stdin. The process
//! prints one emitted file path per line on stdout and exits with:
//!
//! - `0` on success
//! - [`PLUGIN_FAILURE_EXIT_CODE`] when a source transform failed
//! - any other non-zero code when the build failed
//!
//! In watch mode the process inherits stdout/stderr and is expected to keep
//! running until it is terminated.

use crate::codes;
use crate::plugin::PluginError;
use crate::synth::BuildConfiguration;
use futures::future::BoxFuture;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Exit code an engine process uses to report a source-transform failure.
pub const PLUGIN_FAILURE_EXIT_CODE: i32 = 2;

/// Number of trailing stderr lines kept as error detail.
const STDERR_TAIL_LINES: usize = 20;

/// Future returned by [`BundleEngine::build`].
pub type EngineFuture<'a> = BoxFuture<'a, Result<EngineReport, EngineError>>;

/// A bundling engine.
///
/// `build` takes the configuration by value: each configuration is consumed
/// by exactly one submission.
pub trait BundleEngine: Send + Sync {
    /// Engine name, for logs.
    fn name(&self) -> &str;

    /// Build one configuration. Resolves once the build reaches a terminal
    /// state; in watch mode that is when the engine stops watching.
    fn build(&self, config: BuildConfiguration) -> EngineFuture<'_>;
}

/// Successful engine outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineReport {
    /// Files the engine emitted.
    pub files: Vec<PathBuf>,
}

impl EngineReport {
    #[must_use]
    pub fn with_files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

/// Kind of engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// The build itself failed.
    Build,
    /// A source transform failed on some file.
    Plugin,
    /// The engine could not be started.
    Spawn,
    /// The engine executable does not exist.
    NotFound,
}

impl EngineErrorKind {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Build => codes::BUILD_ENGINE_FAILED,
            Self::Plugin => codes::BUILD_PLUGIN_FAILED,
            Self::Spawn => codes::BUILD_ENGINE_SPAWN_FAILED,
            Self::NotFound => codes::BUILD_ENGINE_NOT_FOUND,
        }
    }
}

/// Failed engine outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", kind.code())]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
    /// Extra context (e.g. the tail of the engine's stderr).
    pub detail: Option<String>,
}

impl EngineError {
    #[must_use]
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// A failed build.
    #[must_use]
    pub fn build(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Build, message)
    }

    /// Attach detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<PluginError> for EngineError {
    fn from(err: PluginError) -> Self {
        Self::new(EngineErrorKind::Plugin, err.to_string())
    }
}

/// Engine that runs an external bundler process per submission.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    cwd: PathBuf,
}

impl CommandEngine {
    /// Create an engine from a command line (`program arg...`), run in `cwd`.
    ///
    /// Bare program names are looked up on `PATH`; names containing a path
    /// separator are resolved against `cwd`.
    ///
    /// # Errors
    /// Returns a `NotFound` error if the command is empty or the program
    /// cannot be located.
    pub fn new(command: &[String], cwd: &Path) -> Result<Self, EngineError> {
        let Some((program, args)) = command.split_first() else {
            return Err(EngineError::new(
                EngineErrorKind::NotFound,
                "engine command is empty",
            ));
        };

        let program = if program.contains('/') || program.contains('\\') {
            let path = cwd.join(program);
            if !path.exists() {
                return Err(EngineError::new(
                    EngineErrorKind::NotFound,
                    format!("engine not found at {}", path.display()),
                ));
            }
            path
        } else {
            which::which(program).map_err(|e| {
                EngineError::new(
                    EngineErrorKind::NotFound,
                    format!("engine '{program}' not found in PATH: {e}"),
                )
            })?
        };

        Ok(Self {
            program,
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
        })
    }

    /// Resolved program path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn run(&self, config: &BuildConfiguration) -> Result<EngineReport, EngineError> {
        let payload = serde_json::to_vec(config).map_err(|e| {
            EngineError::new(
                EngineErrorKind::Spawn,
                format!("failed to serialize configuration: {e}"),
            )
        })?;
        let watching = config.watch.is_some();
        let label = config.intent.label();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .stdin(Stdio::piped())
            .kill_on_drop(true);
        if watching {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        debug!(target: "libpack::engine", program = %self.program.display(), build = %label, "spawning engine");

        let mut child = cmd.spawn().map_err(|e| {
            EngineError::new(EngineErrorKind::Spawn, format!("failed to spawn engine: {e}"))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await.map_err(|e| {
                EngineError::new(
                    EngineErrorKind::Spawn,
                    format!("failed to write configuration: {e}"),
                )
            })?;
            // Closing stdin signals the end of the document.
            drop(stdin);
        }

        let output = child.wait_with_output().await.map_err(|e| {
            EngineError::new(EngineErrorKind::Spawn, format!("failed to wait for engine: {e}"))
        })?;

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let kind = if exit_code == PLUGIN_FAILURE_EXIT_CODE {
                EngineErrorKind::Plugin
            } else {
                EngineErrorKind::Build
            };
            let mut error = EngineError::new(kind, format!("engine exited with code {exit_code}"));
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                error = error.with_detail(tail_lines(&stderr, STDERR_TAIL_LINES));
            }
            return Err(error);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(EngineReport::with_files(
            stdout.lines().map(str::trim).filter(|l| !l.is_empty()),
        ))
    }
}

impl BundleEngine for CommandEngine {
    fn name(&self) -> &str {
        "command"
    }

    fn build(&self, config: BuildConfiguration) -> EngineFuture<'_> {
        Box::pin(async move { self.run(&config).await })
    }
}

/// Last `n` lines of `text`, joined with newlines.
fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
