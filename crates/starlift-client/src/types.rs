//! Typed payloads for the reference-data endpoints the importers consult.

use serde::Deserialize;

/// One country from `_data/countries`.
#[derive(Debug, Clone, Deserialize)]
pub struct Country {
    pub code: String,
    pub name: String,
}

/// One state/province from `_data/subdivisions/{country}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Subdivision {
    pub code: String,
    pub name: String,
}

/// A service definition from `system/services/{id}`, used to verify that
/// configured adjustment service ids really are adjustment services.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceRecord {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub application: String,
}

/// The raw result of a submitted entity request: HTTP status plus the
/// unparsed body. The dispatcher decides success or failure from the status.
#[derive(Debug, Clone)]
pub struct SubmitReply {
    pub status: u16,
    pub body: String,
}
