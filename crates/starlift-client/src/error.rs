use thiserror::Error;

/// Errors returned by the Northstar API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the request with an error envelope.
    #[error("Northstar API error ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured instance URI (or a path built on it) is not a valid URL.
    #[error("invalid Northstar URI \"{uri}\": {reason}")]
    InvalidUri { uri: String, reason: String },

    /// A paginated endpoint kept announcing further pages past the hard cap.
    #[error("pagination limit reached for {path}: exceeded {max_pages} pages")]
    PaginationLimit { path: String, max_pages: usize },
}
