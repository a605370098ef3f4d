pub mod client;
pub mod envelope;
pub mod error;
pub mod types;

pub use client::ApiClient;
pub use envelope::{flatten_error_message, rejection_message, NO_RESPONSE_MESSAGE};
pub use error::ApiError;
pub use types::{Country, ServiceRecord, Subdivision, SubmitReply};
