//! Stable error codes for build results.
//!
//! All codes are SCREAMING_SNAKE_CASE and stable across versions.

/// A build intent referenced a package missing from the registry.
pub const BUILD_UNKNOWN_PACKAGE: &str = "BUILD_UNKNOWN_PACKAGE";

/// The same package name was registered more than once.
pub const BUILD_DUPLICATE_PACKAGE: &str = "BUILD_DUPLICATE_PACKAGE";

/// Project config could not be read, parsed or validated.
pub const BUILD_CONFIG_INVALID: &str = "BUILD_CONFIG_INVALID";

/// Package manifest could not be read or parsed.
pub const BUILD_MANIFEST_INVALID: &str = "BUILD_MANIFEST_INVALID";

/// The bundling engine reported a failed build.
pub const BUILD_ENGINE_FAILED: &str = "BUILD_ENGINE_FAILED";

/// A source transform failed inside the engine.
pub const BUILD_PLUGIN_FAILED: &str = "BUILD_PLUGIN_FAILED";

/// The engine process could not be started.
pub const BUILD_ENGINE_SPAWN_FAILED: &str = "BUILD_ENGINE_SPAWN_FAILED";

/// The engine executable was not found.
pub const BUILD_ENGINE_NOT_FOUND: &str = "BUILD_ENGINE_NOT_FOUND";

/// I/O error outside the engine.
pub const BUILD_IO_ERROR: &str = "BUILD_IO_ERROR";

/// Internal error.
pub const BUILD_INTERNAL_ERROR: &str = "BUILD_INTERNAL_ERROR";
