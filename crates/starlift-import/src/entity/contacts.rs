//! Contact imports: one contact per row, attached to an existing account.

use std::path::Path;

use reqwest::Method;
use serde_json::{json, Map, Value};

use starlift_client::ApiClient;
use starlift_core::{AppConfig, Row, Rule};

use crate::entity::{
    insert_if_present, int, phone_numbers, run_import, string_list, EntityImport, PhoneColumns,
};
use crate::error::ImportError;
use crate::recorder::ImportSummary;
use crate::request::RequestDescriptor;

const USERNAME: usize = 10;
const PASSWORD: usize = 11;

const PHONES: PhoneColumns = PhoneColumns {
    work: 4,
    work_extension: 5,
    home: 6,
    mobile: 7,
    fax: 8,
};

pub struct ContactImport;

impl EntityImport for ContactImport {
    fn name(&self) -> &'static str {
        "contact"
    }

    fn rules(&self) -> Vec<Rule> {
        vec![
            Rule::Required { column: 0 },
            Rule::Required { column: 1 },
            Rule::BothOrNeither {
                first: USERNAME,
                second: PASSWORD,
                labels: ("username", "password"),
            },
        ]
    }

    fn request(&self, row: &Row, row_index: usize) -> RequestDescriptor {
        let mut payload = Map::new();
        payload.insert("id".into(), json!(int(row.get(0))));
        payload.insert("name".into(), json!(row.get(1)));

        insert_if_present(&mut payload, "role", row, 2, |v| json!(v));
        insert_if_present(&mut payload, "email_address", row, 3, |v| json!(v));

        let categories = if row.is_blank(9) {
            json!([])
        } else {
            string_list(row.get(9))
        };
        payload.insert("email_message_categories".into(), categories);

        if let Some(numbers) = phone_numbers(row, &PHONES, false) {
            payload.insert("phone_numbers".into(), numbers);
        }

        if !row.is_blank(USERNAME) {
            payload.insert("username".into(), json!(row.get(USERNAME)));
            payload.insert("password".into(), json!(row.get(PASSWORD)));
        }

        payload.insert("primary".into(), json!(false));

        RequestDescriptor {
            row_index,
            method: Method::POST,
            path: format!("accounts/{}/contacts", int(row.get(0))),
            body: Value::Object(payload),
        }
    }

    fn success_line(&self, row: &Row) -> String {
        format!("Import succeeded for account ID {}", row.get(0))
    }
}

/// Runs a contact import.
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
    run_import(&ContactImport, client, config, path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_row() -> Row {
        let mut fields = vec![String::new(); 12];
        fields[0] = "42".into();
        fields[1] = "Pat Jones".into();
        Row::new(fields)
    }

    #[test]
    fn request_targets_the_owning_account() {
        let descriptor = ContactImport.request(&contact_row(), 0);
        assert_eq!(descriptor.path, "accounts/42/contacts");
        assert_eq!(descriptor.body["id"], 42);
        assert_eq!(descriptor.body["name"], "Pat Jones");
        assert_eq!(descriptor.body["primary"], false);
    }

    #[test]
    fn blank_optional_columns_are_omitted() {
        let descriptor = ContactImport.request(&contact_row(), 0);
        assert!(descriptor.body.get("role").is_none());
        assert!(descriptor.body.get("email_address").is_none());
        assert!(descriptor.body.get("username").is_none());
        assert_eq!(descriptor.body["email_message_categories"], json!([]));
    }

    #[test]
    fn credentials_travel_together() {
        let row = contact_row().with_updates(&[
            (USERNAME, "pjones".into()),
            (PASSWORD, "s3cret".into()),
        ]);
        let descriptor = ContactImport.request(&row, 0);
        assert_eq!(descriptor.body["username"], "pjones");
        assert_eq!(descriptor.body["password"], "s3cret");
    }

    #[test]
    fn contact_numbers_are_not_reformatted() {
        let row = contact_row().with_updates(&[(4, "555-123-4567".into())]);
        let descriptor = ContactImport.request(&row, 0);
        assert_eq!(
            descriptor.body["phone_numbers"]["work"]["number"],
            "555-123-4567"
        );
    }
}
