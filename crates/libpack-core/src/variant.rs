//! Build intents and the fixed variant matrix.
//!
//! One-shot builds always produce the same three variants per package, in
//! this order:
//!
//! | Variant        | Minify | Formats   | Core |
//! |----------------|--------|-----------|------|
//! | `unminified`   | none   | esm + umd | no   |
//! | `minified`     | fast   | esm + umd | no   |
//! | `core`         | full   | esm       | yes  |

use serde::{Deserialize, Serialize};

/// Minification mode handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Minify {
    /// No minification.
    #[default]
    None,
    /// Fast, whitespace/identifier-level minification.
    Fast,
    /// Full minification.
    Full,
}

impl Minify {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fast => "fast",
            Self::Full => "full",
        }
    }

    /// Whether any minification is applied.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for Minify {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One of the standard one-shot variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Unminified,
    #[serde(rename = "minified")]
    FastMinified,
    Core,
}

impl Variant {
    /// All variants in submission order.
    pub const ALL: [Variant; 3] = [Self::Unminified, Self::FastMinified, Self::Core];

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unminified => "unminified",
            Self::FastMinified => "minified",
            Self::Core => "core",
        }
    }

    /// The intent producing this variant for `package`.
    #[must_use]
    pub fn intent(self, package: &str) -> BuildIntent {
        match self {
            Self::Unminified => BuildIntent::new(package, Minify::None),
            Self::FastMinified => BuildIntent::new(package, Minify::Fast),
            Self::Core => BuildIntent::new(package, Minify::Full).with_core(true),
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to build: one package under one set of modes.
///
/// Intents are plain values; any combination of modes is representable and
/// the synthesizer accepts all of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildIntent {
    /// Registered package name.
    pub package: String,
    pub minify: Minify,
    /// Externalize every declared dependency and emit a single esm output.
    pub core: bool,
    /// Keep rebuilding on source changes.
    pub watch: bool,
}

impl BuildIntent {
    /// Create a non-core, non-watch intent.
    #[must_use]
    pub fn new(package: impl Into<String>, minify: Minify) -> Self {
        Self {
            package: package.into(),
            minify,
            core: false,
            watch: false,
        }
    }

    /// The single intent used by watch mode: unminified, non-core, watching.
    #[must_use]
    pub fn watch_mode(package: impl Into<String>) -> Self {
        Self::new(package, Minify::None).with_watch(true)
    }

    /// Set core mode.
    #[must_use]
    pub fn with_core(mut self, core: bool) -> Self {
        self.core = core;
        self
    }

    /// Set watch mode.
    #[must_use]
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// The standard variant this intent corresponds to, ignoring watch.
    #[must_use]
    pub fn variant(&self) -> Option<Variant> {
        match (self.minify, self.core) {
            (Minify::None, false) => Some(Variant::Unminified),
            (Minify::Fast, false) => Some(Variant::FastMinified),
            (Minify::Full, true) => Some(Variant::Core),
            _ => None,
        }
    }

    /// Variant name, or the raw modes for non-standard combinations.
    #[must_use]
    pub fn variant_name(&self) -> String {
        self.variant().map_or_else(
            || format!("minify={},core={}", self.minify, self.core),
            |v| v.as_str().to_string(),
        )
    }

    /// Short label for logs and summaries, e.g. `mermaid/core`.
    #[must_use]
    pub fn label(&self) -> String {
        let variant = self.variant_name();
        if self.watch {
            format!("{}/{variant}+watch", self.package)
        } else {
            format!("{}/{variant}", self.package)
        }
    }
}

/// The one-shot variant intents for a package, in submission order.
#[must_use]
pub fn variant_matrix(package: &str) -> [BuildIntent; 3] {
    Variant::ALL.map(|v| v.intent(package))
}
