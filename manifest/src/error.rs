//! Error types for manifest loading and declaration.

use plugin_union_core::SchemaError;
use thiserror::Error;

/// Errors that can occur while loading or applying a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The registry rejected a declaration.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A manifest refers to a variant that is not declared.
    #[error("unknown variant: {0}")]
    UnknownVariant(String),

    /// A named union is not defined in the manifest.
    #[error("unknown union: {0}")]
    UnknownUnion(String),

    /// Structural problem in the manifest itself.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
}

/// Convenience alias for results with [`ManifestError`].
pub type Result<T> = std::result::Result<T, ManifestError>;
