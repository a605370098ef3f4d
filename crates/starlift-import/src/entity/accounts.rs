//! Account imports: the one entity whose rows carry a full service address,
//! resolved through the address cache before dispatch.

use std::path::Path;

use reqwest::Method;
use serde_json::{json, Map, Value};

use starlift_client::ApiClient;
use starlift_core::validate::parse_date;
use starlift_core::{read_rows, validate_rows, AppConfig, Row, Rule};

use crate::address::{columns, resolve_rows};
use crate::entity::{
    dispatch_rows, id_list, insert_if_present, int, phone_numbers, string_list, EntityImport,
    PhoneColumns,
};
use crate::error::ImportError;
use crate::recorder::{ImportSummary, OutcomeRecorder};
use crate::request::RequestDescriptor;

const GROUPS: usize = 4;
const SUB_ACCOUNTS: usize = 5;
const NEXT_BILL_DATE: usize = 6;
const CONTACT_NAME: usize = 16;
const ROLE: usize = 17;
const EMAIL: usize = 18;
const EMAIL_CATEGORIES: usize = 19;

const PHONES: PhoneColumns = PhoneColumns {
    work: 20,
    work_extension: 21,
    home: 22,
    mobile: 23,
    fax: 24,
};

pub struct AccountImport;

impl EntityImport for AccountImport {
    fn name(&self) -> &'static str {
        "account"
    }

    fn rules(&self) -> Vec<Rule> {
        vec![
            Rule::Required { column: 0 },
            Rule::Required { column: 1 },
            Rule::Required { column: 2 },
            Rule::Required { column: 3 },
            Rule::Required {
                column: columns::LINE1,
            },
            Rule::Required {
                column: columns::CITY,
            },
            Rule::Required {
                column: columns::STATE,
            },
            Rule::Required {
                column: columns::COUNTRY,
            },
            Rule::IntegerList {
                column: GROUPS,
                min: 1,
                label: "account group ID",
            },
            Rule::IntegerList {
                column: SUB_ACCOUNTS,
                min: 1,
                label: "sub-account ID",
            },
        ]
    }

    fn request(&self, row: &Row, row_index: usize) -> RequestDescriptor {
        let mut payload = Map::new();
        payload.insert("id".into(), json!(int(row.get(0))));
        payload.insert("name".into(), json!(row.get(1)));
        payload.insert("account_type_id".into(), json!(int(row.get(2))));
        payload.insert("account_status_id".into(), json!(int(row.get(3))));

        let contact_name = if row.is_blank(CONTACT_NAME) {
            row.get(1)
        } else {
            row.get(CONTACT_NAME)
        };
        payload.insert("contact_name".into(), json!(contact_name));

        payload.insert("line1".into(), json!(row.get(columns::LINE1)));
        insert_if_present(&mut payload, "line2", row, columns::LINE2, |v| json!(v));
        payload.insert("city".into(), json!(row.get(columns::CITY)));
        payload.insert("state".into(), json!(row.get(columns::STATE)));
        insert_if_present(&mut payload, "county", row, columns::COUNTY, |v| json!(v));
        payload.insert("zip".into(), json!(row.get(columns::ZIP)));
        payload.insert("country".into(), json!(row.get(columns::COUNTRY)));
        insert_if_present(&mut payload, "latitude", row, columns::LATITUDE, |v| json!(v));
        insert_if_present(&mut payload, "longitude", row, columns::LONGITUDE, |v| {
            json!(v)
        });

        insert_if_present(&mut payload, "account_groups", row, GROUPS, id_list);
        insert_if_present(&mut payload, "sub_accounts", row, SUB_ACCOUNTS, id_list);

        // Only a future next bill date is sent; a past one means the account
        // bills immediately on creation anyway.
        if let Some(date) = parse_date(row.get(NEXT_BILL_DATE)) {
            if date > chrono::Utc::now().date_naive() {
                payload.insert("next_bill_date".into(), json!(date.format("%Y-%m-%d").to_string()));
            }
        }

        insert_if_present(&mut payload, "role", row, ROLE, |v| json!(v));
        insert_if_present(&mut payload, "email_address", row, EMAIL, |v| json!(v));

        // The API wants an explicit list here even when empty.
        let categories = if row.is_blank(EMAIL_CATEGORIES) {
            json!([])
        } else {
            string_list(row.get(EMAIL_CATEGORIES))
        };
        payload.insert("email_message_categories".into(), categories);

        if let Some(numbers) = phone_numbers(row, &PHONES, true) {
            payload.insert("phone_numbers".into(), numbers);
        }

        RequestDescriptor {
            row_index,
            method: Method::POST,
            path: "accounts".to_string(),
            body: Value::Object(payload),
        }
    }

    fn success_line(&self, row: &Row) -> String {
        format!("Import succeeded for account ID {}", row.get(0))
    }
}

/// Runs a full account import: pre-flight validation, address resolution
/// through the cache, master-before-sub ordering, then bounded dispatch.
///
/// # Errors
///
/// Fatal on unreadable files, structural validation failures, and log/cache
/// I/O; address rejections and API rejections are recorded per row.
pub async fn import(
    client: &ApiClient,
    config: &AppConfig,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let entity = AccountImport;
    let rows = read_rows(path)?;
    validate_rows(entity.name(), &rows, &entity.rules())?;

    let mut recorder = OutcomeRecorder::create(&config.log_dir, entity.name())?;
    let (resolved, stats) = resolve_rows(client, config, &rows, &mut recorder).await?;

    // Accounts that reference sub-accounts go last, so the referenced
    // accounts exist by the time they are created. A failed master does not
    // skip its dependents — they are submitted and fail server-side with
    // their own recorded reason.
    let (subs, masters): (Vec<_>, Vec<_>) = resolved
        .into_iter()
        .partition(|entry| !entry.row.is_blank(SUB_ACCOUNTS));
    let ordered: Vec<Row> = masters
        .into_iter()
        .chain(subs)
        .map(|entry| entry.row)
        .collect();

    dispatch_rows(&entity, client, config.concurrency, &ordered, &mut recorder).await;

    recorder.set_cache_stats(stats.hits, stats.misses);
    recorder.reconcile(rows.len());
    recorder.finish()
}
