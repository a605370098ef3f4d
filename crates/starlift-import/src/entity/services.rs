//! Service definition imports.

use std::path::Path;

use reqwest::Method;
use serde_json::{json, Map, Value};

use starlift_client::ApiClient;
use starlift_core::{AppConfig, Row, Rule};

use crate::entity::{flag, id_list, insert_if_present, int, number, run_import, EntityImport};
use crate::error::ImportError;
use crate::recorder::ImportSummary;
use crate::request::RequestDescriptor;

pub struct ServiceImport;

impl EntityImport for ServiceImport {
    fn name(&self) -> &'static str {
        "service"
    }

    fn rules(&self) -> Vec<Rule> {
        vec![
            Rule::Required { column: 0 },
            Rule::Required { column: 1 },
            Rule::Required { column: 2 },
            Rule::Required { column: 3 },
            Rule::Required { column: 6 },
            Rule::OneOf {
                column: 1,
                allowed: &["one time", "recurring", "expiring"],
                label: "service type",
            },
            Rule::OneOf {
                column: 2,
                allowed: &["credit", "debit"],
                label: "application",
            },
            Rule::NumberAtLeast {
                column: 3,
                min: 0.0,
                label: "service amount",
            },
            Rule::NumberAtLeast {
                column: 4,
                min: 1.0,
                label: "number of times to run",
            },
            Rule::IntegerList {
                column: 5,
                min: 1,
                label: "tax ID",
            },
            Rule::NumberAtLeast {
                column: 7,
                min: 8.0,
                label: "download in kilobits",
            },
            Rule::NumberAtLeast {
                column: 8,
                min: 8.0,
                label: "upload in kilobits",
            },
            Rule::OneOf {
                column: 9,
                allowed: &["0", "10", "20", "30", "40", "50", "60", "70", "90"],
                label: "technology code",
            },
            Rule::NumberAtLeast {
                column: 10,
                min: 1.0,
                label: "usage based billing policy ID",
            },
            Rule::NumberAtLeast {
                column: 11,
                min: 1.0,
                label: "general ledger code ID",
            },
            Rule::NumberAtLeast {
                column: 12,
                min: 0.0,
                label: "tax exemption amount",
            },
        ]
    }

    fn request(&self, row: &Row, row_index: usize) -> RequestDescriptor {
        let mut payload = Map::new();
        payload.insert("active".into(), json!(true));
        payload.insert("name".into(), json!(row.get(0)));
        payload.insert("type".into(), json!(row.get(1).to_lowercase()));
        payload.insert("application".into(), json!(row.get(2).to_lowercase()));
        payload.insert("amount".into(), json!(number(row.get(3))));
        payload.insert("data_service".into(), json!(flag(row.get(6))));

        insert_if_present(&mut payload, "times_to_run", row, 4, |v| json!(int(v)));
        insert_if_present(&mut payload, "taxes", row, 5, id_list);
        insert_if_present(&mut payload, "download_in_kilobits", row, 7, |v| {
            json!(int(v))
        });
        insert_if_present(&mut payload, "upload_in_kilobits", row, 8, |v| json!(int(v)));
        insert_if_present(&mut payload, "technology_code", row, 9, |v| json!(int(v)));
        insert_if_present(&mut payload, "usage_based_billing_policy_id", row, 10, |v| {
            json!(int(v))
        });
        insert_if_present(&mut payload, "general_ledger_code_id", row, 11, |v| {
            json!(int(v))
        });
        insert_if_present(&mut payload, "tax_exemption_amount", row, 12, |v| {
            json!(number(v))
        });

        RequestDescriptor {
            row_index,
            method: Method::POST,
            path: "system/services".to_string(),
            body: Value::Object(payload),
        }
    }

    fn success_line(&self, row: &Row) -> String {
        format!("Import succeeded for service {}", row.get(0))
    }
}

/// Runs a service import.
///
/// # Errors
///
/// Fatal on unreadable files, structural validation failures, and log I/O;
/// API rejections are recorded per row.
pub async fn import(
    client: &ApiClient,
    config: &AppConfig,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    run_import(&ServiceImport, client, config, path).await
}
