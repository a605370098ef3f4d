//! Next-bill-date updates for existing accounts.

use std::path::Path;

use reqwest::Method;
use serde_json::json;

use starlift_client::ApiClient;
use starlift_core::{AppConfig, Row, Rule};

use crate::entity::{int, run_import, EntityImport};
use crate::error::ImportError;
use crate::recorder::ImportSummary;
use crate::request::RequestDescriptor;

pub struct NextBillDateImport;

impl EntityImport for NextBillDateImport {
    fn name(&self) -> &'static str {
        "account next bill date"
    }

    fn rules(&self) -> Vec<Rule> {
        vec![
            Rule::Required { column: 0 },
            Rule::Required { column: 1 },
            Rule::Numeric { column: 0 },
            Rule::FutureDate { column: 1 },
        ]
    }

    fn request(&self, row: &Row, row_index: usize) -> RequestDescriptor {
        RequestDescriptor {
            row_index,
            method: Method::PATCH,
            path: format!("accounts/{}", int(row.get(0))),
            body: json!({ "next_bill_date": row.get(1) }),
        }
    }

    fn success_line(&self, row: &Row) -> String {
        format!("Update succeeded for account ID {}", row.get(0))
    }
}

/// Runs a next-bill-date update import.
///
/// # Errors
///
/// Fatal on unreadable files, structural validation failures (including a
/// date not strictly in the future), and log I/O; API rejections are
/// recorded per row.
pub async fn import(
    client: &ApiClient,
    config: &AppConfig,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    run_import(&NextBillDateImport, client, config, path).await
}
