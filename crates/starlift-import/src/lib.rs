//! The bulk import engine: lazy bounded-concurrency dispatch of row-derived
//! requests, per-row outcome recording, and address resolution with a
//! persistent cache.

pub mod address;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod recorder;
pub mod request;

pub use dispatch::dispatch;
pub use error::ImportError;
pub use recorder::{ImportSummary, OutcomeRecorder};
pub use request::{Outcome, RequestDescriptor};
