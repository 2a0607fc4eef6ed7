//! Source-transform plugin capability.
//!
//! libpack never transforms source itself. A [`SourceTransform`] is a
//! capability token: it names a non-standard source extension and how the
//! engine should load the transform. Every synthesized configuration carries
//! the registration and lists the extension for module resolution; the
//! engine invokes the transform and reports failures back as
//! [`PluginError`]s.

use serde::{Deserialize, Serialize};

/// Error from a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginError {
    /// Plugin name that caused the error.
    pub plugin: String,
    /// Source file being transformed, if known.
    pub id: Option<String>,
    /// Error message.
    pub message: String,
}

impl PluginError {
    #[must_use]
    pub fn new(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            id: None,
            message: message.into(),
        }
    }

    /// Attach the file the transform failed on.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl std::fmt::Display for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "[{}] {} ({})", self.plugin, self.message, id),
            None => write!(f, "[{}] {}", self.plugin, self.message),
        }
    }
}

impl std::error::Error for PluginError {}

/// How a plugin appears inside a build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRegistration {
    /// Plugin name.
    pub name: String,
    /// Source extension the plugin claims, with leading dot.
    pub extension: String,
    /// Module the engine loads the transform from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

/// A transform the engine applies to files with a non-standard extension.
pub trait SourceTransform: Send + Sync {
    /// Plugin name.
    fn name(&self) -> &str;

    /// Claimed extension, with leading dot (e.g. `.jison`).
    fn extension(&self) -> &str;

    /// Module the engine should load the transform from, if any.
    fn module(&self) -> Option<&str> {
        None
    }

    /// Whether this transform claims the given module id.
    fn handles(&self, id: &str) -> bool {
        id.ends_with(self.extension())
    }

    /// The registration placed in every configuration.
    fn registration(&self) -> PluginRegistration {
        PluginRegistration {
            name: self.name().to_string(),
            extension: self.extension().to_string(),
            module: self.module().map(str::to_string),
        }
    }
}

/// The grammar-file (`.jison`) transform.
#[derive(Debug, Clone, Default)]
pub struct GrammarPlugin {
    module: Option<String>,
}

impl GrammarPlugin {
    /// Extension of grammar source files.
    pub const EXTENSION: &'static str = ".jison";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the module the engine loads the transform from.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }
}

impl SourceTransform for GrammarPlugin {
    fn name(&self) -> &str {
        "jison"
    }

    fn extension(&self) -> &str {
        Self::EXTENSION
    }

    fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_plugin_handles_jison_only() {
        let plugin = GrammarPlugin::new();
        assert!(plugin.handles("src/diagrams/flowchart/parser/flow.jison"));
        assert!(!plugin.handles("src/mermaid.ts"));
    }

    #[test]
    fn test_registration_carries_module() {
        let reg = GrammarPlugin::new()
            .with_module(".vite/jisonPlugin.js")
            .registration();
        assert_eq!(reg.name, "jison");
        assert_eq!(reg.extension, ".jison");
        assert_eq!(reg.module.as_deref(), Some(".vite/jisonPlugin.js"));
    }

    #[test]
    fn test_registration_json_omits_missing_module() {
        let json = serde_json::to_string(&GrammarPlugin::new().registration()).unwrap();
        assert_eq!(json, r#"{"name":"jison","extension":".jison"}"#);
    }

    #[test]
    fn test_plugin_error_display() {
        let err = PluginError::new("jison", "unexpected token").with_id("flow.jison");
        assert_eq!(err.to_string(), "[jison] unexpected token (flow.jison)");
    }
}
