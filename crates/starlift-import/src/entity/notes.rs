//! Note imports, attached to an existing entity (accounts only, today).

use std::path::Path;

use reqwest::Method;
use serde_json::json;

use starlift_client::ApiClient;
use starlift_core::{AppConfig, Row, Rule};

use crate::entity::{int, run_import, EntityImport};
use crate::error::ImportError;
use crate::recorder::ImportSummary;
use crate::request::RequestDescriptor;

const NOTE_TARGETS: &[&str] = &["accounts"];

pub struct NoteImport {
    target: String,
}

impl NoteImport {
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidNoteEntity`] for targets the notes
    /// endpoint does not accept.
    pub fn new(target: &str) -> Result<Self, ImportError> {
        if !NOTE_TARGETS.contains(&target) {
            return Err(ImportError::InvalidNoteEntity {
                entity: target.to_string(),
            });
        }
        Ok(Self {
            target: target.to_string(),
        })
    }
}

impl EntityImport for NoteImport {
    fn name(&self) -> &'static str {
        "note"
    }

    fn rules(&self) -> Vec<Rule> {
        vec![
            Rule::Required { column: 0 },
            Rule::Required { column: 1 },
            Rule::Required { column: 2 },
        ]
    }

    fn request(&self, row: &Row, row_index: usize) -> RequestDescriptor {
        RequestDescriptor {
            row_index,
            method: Method::POST,
            path: format!("notes/{}/{}", self.target, int(row.get(0))),
            body: json!({
                "category": row.get(2),
                "message": row.get(1),
            }),
        }
    }

    fn success_line(&self, row: &Row) -> String {
        format!("Import succeeded for account ID {}", row.get(0))
    }
}

/// Runs a note import against the given target entity kind.
///
/// # Errors
///
/// Fatal on an unknown target, unreadable files, structural validation
/// failures, and log I/O; API rejections are recorded per row.
pub async fn import(
    client: &ApiClient,
    config: &AppConfig,
    path: &Path,
    target: &str,
) -> Result<ImportSummary, ImportError> {
    let entity = NoteImport::new(target)?;
    run_import(&entity, client, config, path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_target_is_rejected_before_reading_the_file() {
        let result = NoteImport::new("tickets");
        assert!(matches!(
            result,
            Err(ImportError::InvalidNoteEntity { ref entity }) if entity == "tickets"
        ));
    }

    #[test]
    fn request_addresses_the_target_entity() {
        let entity = NoteImport::new("accounts").unwrap();
        let row: Row = ["42", "Needs a truck roll", "install"].into_iter().collect();
        let descriptor = entity.request(&row, 0);
        assert_eq!(descriptor.path, "notes/accounts/42");
        assert_eq!(descriptor.body["message"], "Needs a truck roll");
        assert_eq!(descriptor.body["category"], "install");
    }
}
