//! The address resolution pass.
//!
//! Per row: cache lookup → remote validation (batched through the bounded
//! dispatcher, one call per unique fingerprint) → local fallback → terminal
//! accept or reject. Accepted addresses are merged into corrected row copies;
//! rejected rows are recorded as failures and drop out of the batch.

use std::collections::HashMap;
use std::path::Path;

use reqwest::Method;
use serde_json::Value;

use starlift_client::envelope::Envelope;
use starlift_client::ApiClient;
use starlift_core::{read_rows, validate_rows, AppConfig, Row, Rule};

use crate::address::cache::AddressCache;
use crate::address::fallback::ReferenceData;
use crate::address::{columns, fingerprint, merge_into_row, AddressRecord};
use crate::dispatch::{dispatch, submit_descriptor};
use crate::error::ImportError;
use crate::recorder::{ImportSummary, OutcomeRecorder};
use crate::request::{Outcome, RequestDescriptor};

/// How many rows were served from the cache versus sent out for validation.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// A row that survived address resolution, tagged with its original index.
pub struct ResolvedRow {
    pub index: usize,
    pub row: Row,
}

/// One unique address awaiting remote validation and the rows that share it.
struct PendingAddress {
    key: String,
    record: AddressRecord,
    row_indexes: Vec<usize>,
}

/// Resolves every row's address, recording rejected rows as failures.
///
/// Returns the corrected rows (in original file order) and the cache stats.
/// Duplicate addresses coalesce: one remote call per fingerprint, with the
/// result merged into every owning row.
///
/// # Errors
///
/// Only cache persistence problems are fatal; validation rejections and
/// fallback failures are recorded per row.
pub async fn resolve_rows(
    client: &ApiClient,
    config: &AppConfig,
    rows: &[Row],
    recorder: &mut OutcomeRecorder,
) -> Result<(Vec<ResolvedRow>, CacheStats), ImportError> {
    let mut cache = AddressCache::open(&config.cache_path, config.cache_ttl_days);
    let mut stats = CacheStats::default();
    let mut resolved: Vec<ResolvedRow> = Vec::new();

    let mut pending: Vec<PendingAddress> = Vec::new();
    let mut slot_by_key: HashMap<String, usize> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        let without_county = AddressRecord::from_row(
            row,
            false,
            config.default_city.as_deref(),
            config.default_county.as_deref(),
        );
        let key = fingerprint(&without_county);

        if let Some(record) = cache.get(&key) {
            stats.hits += 1;
            resolved.push(ResolvedRow {
                index,
                row: merge_into_row(record, row),
            });
            continue;
        }

        stats.misses += 1;
        if let Some(&slot) = slot_by_key.get(&key) {
            pending[slot].row_indexes.push(index);
        } else {
            slot_by_key.insert(key.clone(), pending.len());
            pending.push(PendingAddress {
                key,
                record: without_county,
                row_indexes: vec![index],
            });
        }
    }

    // The remote validator sees the without-county variant; the descriptor
    // index correlates back to the pending slot, not a file row.
    let requests = pending.iter().enumerate().map(|(slot, entry)| RequestDescriptor {
        row_index: slot,
        method: Method::POST,
        path: "_data/validate_address".to_string(),
        body: serde_json::to_value(&entry.record).unwrap_or(Value::Null),
    });

    let mut outcomes: Vec<Outcome> = Vec::with_capacity(pending.len());
    dispatch(
        requests,
        config.concurrency,
        |d| submit_descriptor(client, d),
        |outcome| outcomes.push(outcome),
    )
    .await;

    let mut reference = ReferenceData::new();
    for outcome in outcomes {
        let entry = &pending[outcome.row_index()];
        if let Some(validated) = parse_validated(&outcome) {
            cache.insert(entry.key.clone(), validated.clone());
            for &index in &entry.row_indexes {
                resolved.push(ResolvedRow {
                    index,
                    row: merge_into_row(&validated, &rows[index]),
                });
            }
        } else {
            // Remote rejection or transport failure: check the with-county
            // variant against local reference data before giving up on a row.
            for &index in &entry.row_indexes {
                let with_county = AddressRecord::from_row(
                    &rows[index],
                    true,
                    config.default_city.as_deref(),
                    config.default_county.as_deref(),
                );
                match reference.verify(client, &with_county).await {
                    Ok(()) => resolved.push(ResolvedRow {
                        index,
                        row: merge_into_row(&with_county, &rows[index]),
                    }),
                    Err(reason) => recorder.failure(&rows[index], &reason),
                }
            }
        }
    }

    cache.save()?;
    resolved.sort_by_key(|r| r.index);
    Ok((resolved, stats))
}

fn parse_validated(outcome: &Outcome) -> Option<AddressRecord> {
    match outcome {
        Outcome::Success { body, .. } => serde_json::from_str::<Envelope<AddressRecord>>(body)
            .ok()
            .map(|envelope| envelope.data),
        Outcome::Failure { .. } => None,
    }
}

/// The standalone address validation pre-pass over an accounts file.
///
/// Produces a corrected temp file of merged rows for downstream account
/// imports, plus success/failure logs and cache hit/miss counters.
///
/// # Errors
///
/// Fails before any network call if the file cannot be read or a required
/// address column is blank; afterwards only log/cache I/O errors are fatal.
pub async fn resolve_file(
    client: &ApiClient,
    config: &AppConfig,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let rows = read_rows(path)?;
    validate_rows(
        "address validation",
        &rows,
        &[
            Rule::Required {
                column: columns::LINE1,
            },
            Rule::Required {
                column: columns::STATE,
            },
            Rule::Required {
                column: columns::COUNTRY,
            },
        ],
    )?;

    let mut recorder = OutcomeRecorder::create(&config.log_dir, "address_validator")?;
    let (resolved, stats) = resolve_rows(client, config, &rows, &mut recorder).await?;

    let (validated_file, validated_path) = tempfile::Builder::new()
        .prefix("validated_addresses_")
        .suffix(".csv")
        .tempfile_in(&config.log_dir)?
        .keep()
        .map_err(|e| e.error)?;

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(validated_file);
    for entry in &resolved {
        writer
            .write_record(entry.row.fields())
            .map_err(std::io::Error::other)?;
        recorder.success(&format!(
            "Validation succeeded for ID {}",
            entry.row.get(0)
        ));
    }
    writer.flush()?;

    recorder.set_cache_stats(stats.hits, stats.misses);
    recorder.set_validated_file(validated_path);
    recorder.reconcile(rows.len());
    recorder.finish()
}
