//! Fatal-error taxonomy. Contained failures (unreadable files, pattern
//! timeouts, tool errors) are reported as findings, never as errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("pattern `{id}` failed to compile: {source}")]
    PatternCompile {
        id: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern `{id}` has an invalid exclude glob: {reason}")]
    PatternGlob { id: String, reason: String },

    #[error("descriptor file {path}: {reason}")]
    Descriptor { path: PathBuf, reason: String },

    #[error("root path is not a readable directory: {0}")]
    RootNotFound(PathBuf),

    #[error("run cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ScanError>;
