//! Address resolution: normalization, fingerprinting, the TTL'd disk cache,
//! remote validation with local fallback, and merging validated fields back
//! into rows.

pub mod cache;
pub mod fallback;
pub mod resolve;

pub use cache::AddressCache;
pub use fallback::ReferenceData;
pub use resolve::{resolve_file, resolve_rows, CacheStats};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use starlift_core::Row;

/// Column layout of the accounts import file (0-based).
pub mod columns {
    pub const LINE1: usize = 7;
    pub const LINE2: usize = 8;
    pub const CITY: usize = 9;
    pub const STATE: usize = 10;
    pub const COUNTY: usize = 11;
    pub const ZIP: usize = 12;
    pub const COUNTRY: usize = 13;
    pub const LATITUDE: usize = 14;
    pub const LONGITUDE: usize = 15;
}

/// A structured address, as submitted to and returned by the remote validator.
///
/// Two variants are derived from one raw row: the remote validator is queried
/// **without** county (county data is locally authoritative and frequently
/// stale upstream), while the local fallback path checks the with-county
/// variant explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    #[serde(default)]
    pub line1: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub latitude: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub longitude: String,
}

impl AddressRecord {
    /// Builds the address variant for a row, applying the configured default
    /// city/county when the corresponding columns are blank.
    #[must_use]
    pub fn from_row(
        row: &Row,
        with_county: bool,
        default_city: Option<&str>,
        default_county: Option<&str>,
    ) -> Self {
        let city = if row.is_blank(columns::CITY) {
            default_city.unwrap_or("").to_string()
        } else {
            row.get(columns::CITY).to_string()
        };

        let county = if with_county {
            let raw = row.get(columns::COUNTY);
            let value = if raw.is_empty() {
                default_county.unwrap_or("")
            } else {
                raw
            };
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        };

        Self {
            line1: row.get(columns::LINE1).to_string(),
            line2: row.get(columns::LINE2).to_string(),
            city,
            state: normalize_state(row.get(columns::STATE)),
            county,
            zip: row.get(columns::ZIP).to_string(),
            country: row.get(columns::COUNTRY).to_string(),
            latitude: row.get(columns::LATITUDE).to_string(),
            longitude: row.get(columns::LONGITUDE).to_string(),
        }
    }
}

/// Uppercase two-letter state codes; title-case written-out names.
#[must_use]
pub fn normalize_state(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() == 2 {
        trimmed.to_uppercase()
    } else {
        title_case(trimmed)
    }
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The content-derived cache key: SHA-256 over the normalized
/// `line1|city|state|zip` concatenation. Case, punctuation, and extra
/// whitespace do not change the key, so identical addresses across different
/// rows and runs deduplicate to one validation.
#[must_use]
pub fn fingerprint(record: &AddressRecord) -> String {
    let canonical = [
        record.line1.as_str(),
        record.city.as_str(),
        record.state.as_str(),
        record.zip.as_str(),
    ]
    .iter()
    .map(|part| normalize_part(part))
    .collect::<Vec<_>>()
    .join("|");

    let digest = Sha256::digest(canonical.as_bytes());
    format!("{digest:x}")
}

fn normalize_part(part: &str) -> String {
    part.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Merges a validated address back into its originating row, producing a
/// corrected copy.
///
/// Validated fields overwrite only when non-empty. The postal code keeps
/// whichever value is longer after removing spaces — validators sometimes
/// return a truncated code. Latitude/longitude fill in only when the
/// original row left them blank.
#[must_use]
pub fn merge_into_row(validated: &AddressRecord, row: &Row) -> Row {
    let mut updates: Vec<(usize, String)> = Vec::new();

    let mut overwrite = |column: usize, value: &str| {
        if !value.is_empty() {
            updates.push((column, value.to_string()));
        }
    };

    overwrite(columns::LINE1, &validated.line1);
    overwrite(columns::LINE2, &validated.line2);
    overwrite(columns::CITY, &validated.city);
    overwrite(columns::STATE, &validated.state);
    if let Some(county) = &validated.county {
        overwrite(columns::COUNTY, county);
    }
    overwrite(columns::COUNTRY, &validated.country);

    let original_zip = row.get(columns::ZIP);
    if stripped_len(&validated.zip) > stripped_len(original_zip) {
        updates.push((columns::ZIP, validated.zip.clone()));
    }

    if row.is_blank(columns::LATITUDE) && !validated.latitude.is_empty() {
        updates.push((columns::LATITUDE, validated.latitude.clone()));
    }
    if row.is_blank(columns::LONGITUDE) && !validated.longitude.is_empty() {
        updates.push((columns::LONGITUDE, validated.longitude.clone()));
    }

    row.with_updates(&updates)
}

fn stripped_len(zip: &str) -> usize {
    zip.chars().filter(|c| !c.is_whitespace()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_row(line1: &str, city: &str, state: &str, zip: &str) -> Row {
        let mut fields = vec![String::new(); 16];
        fields[columns::LINE1] = line1.into();
        fields[columns::CITY] = city.into();
        fields[columns::STATE] = state.into();
        fields[columns::ZIP] = zip.into();
        fields[columns::COUNTRY] = "US".into();
        Row::new(fields)
    }

    #[test]
    fn fingerprint_ignores_case_punctuation_and_spacing() {
        let a = AddressRecord {
            line1: "100 N. Main St.".into(),
            line2: String::new(),
            city: "Springfield".into(),
            state: "IL".into(),
            county: None,
            zip: "62701".into(),
            country: "US".into(),
            latitude: String::new(),
            longitude: String::new(),
        };
        let mut b = a.clone();
        b.line1 = "100  n main st".into();
        b.city = "SPRINGFIELD".into();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_distinguishes_different_addresses() {
        let a = AddressRecord {
            line1: "100 Main St".into(),
            line2: String::new(),
            city: "Springfield".into(),
            state: "IL".into(),
            county: None,
            zip: "62701".into(),
            country: "US".into(),
            latitude: String::new(),
            longitude: String::new(),
        };
        let mut b = a.clone();
        b.line1 = "101 Main St".into();
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn state_normalization_handles_codes_and_names() {
        assert_eq!(normalize_state("ny"), "NY");
        assert_eq!(normalize_state("new york"), "New York");
        assert_eq!(normalize_state("NEW YORK"), "New York");
    }

    #[test]
    fn merge_prefers_longer_postal_code_after_stripping_spaces() {
        let row = account_row("100 Main St", "Springfield", "IL", "9021");
        let validated = AddressRecord {
            line1: "100 Main St".into(),
            line2: String::new(),
            city: "Springfield".into(),
            state: "IL".into(),
            county: None,
            zip: "90210".into(),
            country: "US".into(),
            latitude: String::new(),
            longitude: String::new(),
        };
        let merged = merge_into_row(&validated, &row);
        assert_eq!(merged.get(columns::ZIP), "90210");
    }

    #[test]
    fn merge_keeps_original_postal_code_when_validator_truncates() {
        let row = account_row("100 Main St", "Springfield", "IL", "90210-1234");
        let validated = AddressRecord {
            line1: "100 Main St".into(),
            line2: String::new(),
            city: "Springfield".into(),
            state: "IL".into(),
            county: None,
            zip: "90210".into(),
            country: "US".into(),
            latitude: String::new(),
            longitude: String::new(),
        };
        let merged = merge_into_row(&validated, &row);
        assert_eq!(merged.get(columns::ZIP), "90210-1234");
    }

    #[test]
    fn merge_fills_coordinates_only_when_blank() {
        let mut fields = vec![String::new(); 16];
        fields[columns::LATITUDE] = "41.88".into();
        let row = Row::new(fields);

        let validated = AddressRecord {
            line1: String::new(),
            line2: String::new(),
            city: String::new(),
            state: String::new(),
            county: None,
            zip: String::new(),
            country: String::new(),
            latitude: "40.00".into(),
            longitude: "-89.64".into(),
        };

        let merged = merge_into_row(&validated, &row);
        assert_eq!(merged.get(columns::LATITUDE), "41.88", "original kept");
        assert_eq!(merged.get(columns::LONGITUDE), "-89.64", "blank filled");
    }

    #[test]
    fn merge_skips_empty_validated_fields() {
        let row = account_row("100 Main St", "Springfield", "IL", "62701");
        let validated = AddressRecord {
            line1: String::new(),
            line2: String::new(),
            city: "Springfield".into(),
            state: "IL".into(),
            county: None,
            zip: "62701".into(),
            country: "US".into(),
            latitude: String::new(),
            longitude: String::new(),
        };
        let merged = merge_into_row(&validated, &row);
        assert_eq!(merged.get(columns::LINE1), "100 Main St");
    }

    #[test]
    fn from_row_applies_default_city_and_county() {
        let mut fields = vec![String::new(); 16];
        fields[columns::LINE1] = "100 Main St".into();
        fields[columns::STATE] = "il".into();
        fields[columns::ZIP] = "62701".into();
        fields[columns::COUNTRY] = "US".into();
        let row = Row::new(fields);

        let with = AddressRecord::from_row(&row, true, Some("Springfield"), Some("Sangamon"));
        assert_eq!(with.city, "Springfield");
        assert_eq!(with.county.as_deref(), Some("Sangamon"));
        assert_eq!(with.state, "IL");

        let without = AddressRecord::from_row(&row, false, Some("Springfield"), Some("Sangamon"));
        assert_eq!(without.county, None);
    }
}
