use std::path::PathBuf;
use thiserror::Error;

/// Core error type for libpack operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    ConfigInvalid(String),

    #[error("Failed to read manifest at {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest at {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A build intent named a package that is not in the registry.
    #[error("Unknown package: {name}")]
    UnknownPackage { name: String },

    #[error("Package registered twice: {name}")]
    DuplicatePackage { name: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an unknown-package error.
    #[must_use]
    pub fn unknown_package(name: impl Into<String>) -> Self {
        Self::UnknownPackage { name: name.into() }
    }

    /// Stable code for this error (see [`crate::codes`]).
    #[must_use]
    pub fn code(&self) -> &'static str {
        use crate::codes;
        match self {
            Self::Io(_) => codes::BUILD_IO_ERROR,
            Self::ConfigRead { .. } | Self::ConfigParse { .. } | Self::ConfigInvalid(_) => {
                codes::BUILD_CONFIG_INVALID
            }
            Self::ManifestRead { .. } | Self::ManifestParse { .. } => codes::BUILD_MANIFEST_INVALID,
            Self::UnknownPackage { .. } => codes::BUILD_UNKNOWN_PACKAGE,
            Self::DuplicatePackage { .. } => codes::BUILD_DUPLICATE_PACKAGE,
            Self::Other(_) => codes::BUILD_INTERNAL_ERROR,
        }
    }
}
