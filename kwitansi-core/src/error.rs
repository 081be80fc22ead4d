//! Error types for the receipt pipeline.
//!
//! Every stage owns a narrow error enum ([`ReadError`], [`RenderError`],
//! [`PackageError`], [`PublishError`]). [`PipelineError`] aggregates them for
//! the batch as a whole, and [`ServiceError`] is the structured, serializable
//! error handed back to callers of [`crate::pipeline::process_spreadsheet`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Message used when a batch yields no documents.
pub const EMPTY_BATCH_MESSAGE: &str = "Tidak ada data yang bisa diproses di file Excel.";

/// The spreadsheet could not be opened or parsed.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to open spreadsheet {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("spreadsheet {path} contains no worksheet")]
    NoSheet { path: PathBuf },

    #[error("failed to read first worksheet of {path}: {reason}")]
    Sheet { path: PathBuf, reason: String },

    #[error("spreadsheet reader task failed: {0}")]
    Task(String),
}

/// The document engine could not produce output for a record.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF engine failed for row {row}: {reason}")]
    Engine { row: u32, reason: String },

    #[error("rendering row {row} timed out after {secs}s")]
    Timeout { row: u32, secs: u64 },
}

/// The archive could not be assembled or flushed.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("archive {target} needs at least one entry")]
    NoEntries { target: PathBuf },

    #[error("archive entry {path} has no usable file name")]
    EntryName { path: PathBuf },

    #[error("failed to add {path} to archive: {source}")]
    Entry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("zip error while writing {target}: {source}")]
    Zip {
        target: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to create or flush archive {target}: {source}")]
    Io {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive task failed: {0}")]
    Task(String),
}

/// Upload or link issuance failed.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("upload of {destination} failed: {reason}")]
    Upload { destination: String, reason: String },

    #[error("issuing retrieval URL for {destination} failed: {reason}")]
    SignedUrl { destination: String, reason: String },
}

/// Any failure of a batch run. One failing stage aborts the whole batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("The function must be called while authenticated.")]
    Unauthenticated,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("failed to download {object}: {reason}")]
    Fetch { object: String, reason: String },

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("{}", EMPTY_BATCH_MESSAGE)]
    EmptyBatch,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("work area I/O failed at {path}: {source}")]
    WorkArea {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Stage name used in logs.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Unauthenticated => "authenticate",
            PipelineError::InvalidArgument(_) => "validate",
            PipelineError::Fetch { .. } => "fetch",
            PipelineError::Read(_) => "read",
            PipelineError::EmptyBatch => "batch",
            PipelineError::Render(_) => "render",
            PipelineError::Package(_) => "package",
            PipelineError::Publish(_) => "publish",
            PipelineError::WorkArea { .. } => "work_area",
        }
    }
}

/// Machine-readable error code returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    Unauthenticated,
    InvalidArgument,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::InvalidArgument => "invalid-argument",
            ErrorCode::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error surfaced to callers.
///
/// Only `unauthenticated` and `invalid-argument` are client-correctable; every
/// other pipeline failure becomes `internal` carrying the original message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<PipelineError> for ServiceError {
    fn from(err: PipelineError) -> Self {
        let code = match &err {
            PipelineError::Unauthenticated => ErrorCode::Unauthenticated,
            PipelineError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            _ => ErrorCode::Internal,
        };
        ServiceError::new(code, err.to_string())
    }
}
