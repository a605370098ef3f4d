//! Request descriptors and terminal per-row outcomes.

use reqwest::Method;
use serde_json::Value;

/// One row's HTTP request, built lazily just before dispatch.
///
/// `row_index` is the sole correlation key back to the originating row:
/// outcomes arrive in arbitrary completion order and are resolved against the
/// submitted batch through it.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub row_index: usize,
    pub method: Method,
    pub path: String,
    pub body: Value,
}

/// Terminal result for one submitted row.
///
/// `Success` keeps the response body so callers that need the returned entity
/// (address validation) can parse it; plain entity imports ignore it.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success {
        row_index: usize,
        status: u16,
        body: String,
    },
    Failure {
        row_index: usize,
        reason: String,
    },
}

impl Outcome {
    #[must_use]
    pub fn row_index(&self) -> usize {
        match self {
            Outcome::Success { row_index, .. } | Outcome::Failure { row_index, .. } => *row_index,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}
