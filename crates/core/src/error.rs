//! Error types for the overlay core

use pdf_engine::PdfEngineError;
use std::io;

/// Failure of a single text-layer derivation
///
/// A failed derivation never touches the previously published layer.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("PDF engine error: {0}")]
    Engine(#[from] PdfEngineError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("render target unavailable (target width {width})")]
    RenderTargetUnavailable { width: f32 },

    #[error("derivation {generation} was superseded by a newer one")]
    Superseded { generation: u64 },
}

pub type LayerResult<T> = Result<T, LayerError>;

/// Rejected or unavailable byte source
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("Only PDF files are accepted")]
    UnsupportedType { mime: String },

    #[error("File cannot exceed {}MB", .limit / (1024 * 1024))]
    TooLarge { size: u64, limit: u64 },

    #[error("File is empty")]
    Empty,

    #[error("source reference {0} has been revoked")]
    Revoked(uuid::Uuid),
}

/// Errors that can occur while loading, validating or saving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}
