use thiserror::Error;

use starlift_client::ApiError;
use starlift_core::{RowError, SourceError};

/// Fatal, pre-flight errors that abort an import before (or instead of)
/// dispatching rows. Per-row failures never surface here — they are recorded
/// in the failure log and counted instead.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Validation(#[from] RowError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("could not prepare log output: {0}")]
    LogSetup(#[from] std::io::Error),

    #[error("address cache error at {path}: {reason}")]
    Cache { path: String, reason: String },

    #[error("{entity} is not a valid note entity.")]
    InvalidNoteEntity { entity: String },

    #[error("{0} must be set to run a balance import")]
    MissingAdjustmentId(&'static str),

    #[error("{id} is not a valid {application} adjustment service.")]
    InvalidAdjustmentService { id: i64, application: &'static str },
}
