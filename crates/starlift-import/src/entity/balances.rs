//! Prior-balance imports, posted as debit or credit adjustment services.
//!
//! The configured adjustment service ids are verified against the API before
//! any row is dispatched — an unresolvable or mistyped service id aborts the
//! whole import up front rather than failing every row individually.

use std::path::Path;

use reqwest::Method;
use serde_json::json;

use starlift_client::{ApiClient, ApiError};
use starlift_core::{read_rows, validate_rows, AppConfig, Row, Rule};

use crate::entity::{dispatch_rows, int, number, EntityImport};
use crate::error::ImportError;
use crate::recorder::{ImportSummary, OutcomeRecorder};
use crate::request::RequestDescriptor;

pub struct BalanceImport {
    debit_service_id: i64,
    credit_service_id: i64,
}

impl EntityImport for BalanceImport {
    fn name(&self) -> &'static str {
        "balance update"
    }

    fn rules(&self) -> Vec<Rule> {
        vec![
            Rule::Required { column: 0 },
            Rule::Required { column: 1 },
            Rule::Numeric { column: 0 },
            Rule::Numeric { column: 1 },
        ]
    }

    fn request(&self, row: &Row, row_index: usize) -> RequestDescriptor {
        let balance = number(row.get(1));
        let service_id = if balance > 0.0 {
            self.debit_service_id
        } else {
            self.credit_service_id
        };

        RequestDescriptor {
            row_index,
            method: Method::POST,
            path: format!("accounts/{}/services", int(row.get(0))),
            body: json!({
                "service_id": service_id,
                "prorate": false,
                "amount": balance.abs(),
            }),
        }
    }

    fn success_line(&self, row: &Row) -> String {
        format!("Import succeeded for account ID {}", row.get(0))
    }
}

/// Runs a balance import.
///
/// Zero balances are recorded as row failures — there is nothing to post,
/// and silently skipping them would break the reconciliation invariant.
///
/// # Errors
///
/// Fatal when the adjustment ids are unset or do not resolve to adjustment
/// services of the right application, on unreadable files, structural
/// validation failures, and log I/O; API rejections are recorded per row.
pub async fn import(
    client: &ApiClient,
    config: &AppConfig,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let debit_service_id = config
        .debit_adjustment_id
        .ok_or(ImportError::MissingAdjustmentId("STARLIFT_DEBIT_ADJUSTMENT_ID"))?;
    let credit_service_id = config
        .credit_adjustment_id
        .ok_or(ImportError::MissingAdjustmentId("STARLIFT_CREDIT_ADJUSTMENT_ID"))?;

    let entity = BalanceImport {
        debit_service_id,
        credit_service_id,
    };

    let rows = read_rows(path)?;
    validate_rows(entity.name(), &rows, &entity.rules())?;

    verify_adjustment_service(client, debit_service_id, "debit").await?;
    verify_adjustment_service(client, credit_service_id, "credit").await?;

    let mut recorder = OutcomeRecorder::create(&config.log_dir, entity.name())?;

    let (zeroes, dispatchable): (Vec<&Row>, Vec<&Row>) = rows
        .iter()
        .partition(|row| number(row.get(1)) == 0.0);
    for row in zeroes {
        recorder.failure(row, "Can't import a zero balance.");
    }

    let dispatchable: Vec<Row> = dispatchable.into_iter().cloned().collect();
    dispatch_rows(&entity, client, config.concurrency, &dispatchable, &mut recorder).await;

    recorder.reconcile(rows.len());
    recorder.finish()
}

async fn verify_adjustment_service(
    client: &ApiClient,
    id: i64,
    application: &'static str,
) -> Result<(), ImportError> {
    let service = match client.service(id).await {
        Ok(service) => service,
        Err(ApiError::Rejected { .. }) => {
            return Err(ImportError::InvalidAdjustmentService { id, application })
        }
        Err(e) => return Err(e.into()),
    };

    if service.kind != "adjustment" || service.application != application {
        return Err(ImportError::InvalidAdjustmentService { id, application });
    }
    Ok(())
}
