//! Per-entity import capabilities.
//!
//! Each entity type implements [`EntityImport`]: its validation rules, the
//! request built for one row, and the success-log line. The shared engine
//! reads the file, runs pre-flight validation, and feeds lazily-built
//! requests through the bounded dispatcher into the recorder. Entities with
//! extra phases (address resolution for accounts, reference verification for
//! balances) compose the same pieces in their own `import` functions.

pub mod accounts;
pub mod balances;
pub mod contacts;
pub mod next_bill_dates;
pub mod notes;
pub mod services;

use std::path::Path;

use serde_json::{json, Map, Value};

use starlift_client::ApiClient;
use starlift_core::{read_rows, validate_rows, AppConfig, Row, Rule};

use crate::dispatch::{dispatch, submit_descriptor};
use crate::error::ImportError;
use crate::recorder::{ImportSummary, OutcomeRecorder};
use crate::request::RequestDescriptor;

/// A row-to-request capability for one entity type.
///
/// `request` must be pure and idempotent: calling it twice on the same row
/// yields an identical descriptor. Blank source columns are omitted from
/// payloads, except where the API contract requires an explicit value.
pub trait EntityImport {
    /// Name used in validation messages and log file prefixes.
    fn name(&self) -> &'static str;

    /// Pre-flight rules run over every row before any request is built.
    fn rules(&self) -> Vec<Rule>;

    /// The request for one prepared row. `row_index` is the position in the
    /// batch handed to the dispatcher.
    fn request(&self, row: &Row, row_index: usize) -> RequestDescriptor;

    /// The line written to the success log when the row is fulfilled.
    fn success_line(&self, row: &Row) -> String;
}

/// Dispatches a prepared batch of rows, folding outcomes into the recorder.
pub(crate) async fn dispatch_rows<E: EntityImport + ?Sized>(
    entity: &E,
    client: &ApiClient,
    concurrency: usize,
    rows: &[Row],
    recorder: &mut OutcomeRecorder,
) -> usize {
    let requests = rows
        .iter()
        .enumerate()
        .map(|(index, row)| entity.request(row, index));

    dispatch(
        requests,
        concurrency,
        |descriptor| submit_descriptor(client, descriptor),
        |outcome| {
            let row = &rows[outcome.row_index()];
            let line = entity.success_line(row);
            recorder.record(&outcome, row, &line);
        },
    )
    .await
}

/// Shared engine for entities whose rows go straight from file to dispatch.
pub(crate) async fn run_import<E: EntityImport>(
    entity: &E,
    client: &ApiClient,
    config: &AppConfig,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let rows = read_rows(path)?;
    validate_rows(entity.name(), &rows, &entity.rules())?;

    let mut recorder = OutcomeRecorder::create(&config.log_dir, entity.name())?;
    dispatch_rows(entity, client, config.concurrency, &rows, &mut recorder).await;
    recorder.reconcile(rows.len());
    recorder.finish()
}

// ---------------------------------------------------------------------------
// Payload building helpers
// ---------------------------------------------------------------------------

/// Integer cast with the original importer's semantics: unparseable is 0.
pub(crate) fn int(value: &str) -> i64 {
    value.parse().unwrap_or_default()
}

pub(crate) fn number(value: &str) -> f64 {
    value.parse().unwrap_or_default()
}

/// Strip a phone number down to its digits.
pub(crate) fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Explicit-boolean columns: only "1"/"true" count as set.
pub(crate) fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// A comma-separated id column as a JSON array of integers.
pub(crate) fn id_list(value: &str) -> Value {
    Value::Array(
        value
            .split(',')
            .map(|element| json!(int(element.trim())))
            .collect(),
    )
}

/// A comma-separated string column as a JSON array of trimmed strings.
pub(crate) fn string_list(value: &str) -> Value {
    Value::Array(
        value
            .split(',')
            .map(|element| json!(element.trim()))
            .collect(),
    )
}

/// Inserts `key` only when the source column is non-blank.
pub(crate) fn insert_if_present<F>(
    payload: &mut Map<String, Value>,
    key: &str,
    row: &Row,
    column: usize,
    to_value: F,
) where
    F: FnOnce(&str) -> Value,
{
    let value = row.get(column);
    if !value.is_empty() {
        payload.insert(key.to_string(), to_value(value));
    }
}

/// Column positions of the four phone-number fields for an entity file.
pub(crate) struct PhoneColumns {
    pub work: usize,
    pub work_extension: usize,
    pub home: usize,
    pub mobile: usize,
    pub fax: usize,
}

/// Builds the `phone_numbers` map, or `None` when every column is blank.
///
/// `normalize` strips non-digits (account files carry formatted numbers).
/// Only the work number carries an extension; the rest send an explicit null.
pub(crate) fn phone_numbers(row: &Row, columns: &PhoneColumns, normalize: bool) -> Option<Value> {
    let fetch = |column: usize| {
        let raw = row.get(column);
        if normalize {
            digits(raw)
        } else {
            raw.to_string()
        }
    };

    let mut numbers = Map::new();

    let work = fetch(columns.work);
    if !work.is_empty() {
        numbers.insert(
            "work".to_string(),
            json!({
                "number": work,
                "extension": row.get(columns.work_extension),
            }),
        );
    }

    for (key, column) in [
        ("home", columns.home),
        ("mobile", columns.mobile),
        ("fax", columns.fax),
    ] {
        let number = fetch(column);
        if !number.is_empty() {
            numbers.insert(
                key.to_string(),
                json!({ "number": number, "extension": Value::Null }),
            );
        }
    }

    (!numbers.is_empty()).then(|| Value::Object(numbers))
}
