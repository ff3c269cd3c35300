use std::path::PathBuf;

use crate::gl::ShaderStage;

/// Convenience alias used across the engine.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Every failure the wrapper layer can report.
///
/// Resource operations return these directly; nothing is reported only
/// through the log.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An upload was attempted with an empty payload.
    #[error("invalid buffer data: payload is empty")]
    InvalidData,

    /// A partial update would write past the last uploaded size.
    #[error("buffer update out of bounds: {len} bytes at offset {offset} exceeds size {size}")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    /// A shader stage failed to compile.
    #[error("{stage} shader compilation failed: {log}")]
    CompileFailed { stage: ShaderStage, log: String },

    /// The program failed to link.
    #[error("shader program linking failed: {log}")]
    LinkFailed { log: String },

    /// A shader source file could not be read.
    #[error("failed to read shader source {}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An image could not be read or decoded.
    #[error("failed to load texture {origin}: {reason}")]
    DecodeFailed { origin: String, reason: String },

    /// Windowing, context creation, or function loading failed.
    #[error("{what} failed: {reason}")]
    InitFailed { what: &'static str, reason: String },

    /// Presenting the back buffer failed.
    #[error("failed to present frame: {reason}")]
    Present { reason: String },
}

impl EngineError {
    pub(crate) fn init(what: &'static str, reason: impl std::fmt::Display) -> Self {
        let err = EngineError::InitFailed {
            what,
            reason: reason.to_string(),
        };
        log::error!("{err}");
        err
    }
}
