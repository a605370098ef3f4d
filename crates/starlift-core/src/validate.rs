//! Pre-flight validation of import files.
//!
//! Every importer declares a set of [`Rule`]s which run in a single pass over
//! all rows **before any request is built**. The first violation fails the
//! entire import with a [`RowError`] carrying 1-based row and column numbers —
//! structural problems are operator errors to fix in the file, distinct from
//! the per-row runtime failures recorded during dispatch.

use chrono::{NaiveDate, Utc};

use crate::error::RowError;
use crate::row::Row;

/// A single declarative check applied to every row.
///
/// Rules other than `Required` skip blank fields: whether a column may be
/// blank is expressed by pairing the rule with a `Required` on the same column.
#[derive(Debug, Clone)]
pub enum Rule {
    /// The trimmed value must be non-empty.
    Required { column: usize },
    /// The value must parse as a number.
    Numeric { column: usize },
    /// A comma-separated list where every element must be an integer >= `min`.
    IntegerList {
        column: usize,
        min: i64,
        label: &'static str,
    },
    /// The value must be one of a fixed set.
    OneOf {
        column: usize,
        allowed: &'static [&'static str],
        label: &'static str,
    },
    /// The value must be a number >= `min`.
    NumberAtLeast {
        column: usize,
        min: f64,
        label: &'static str,
    },
    /// Either both columns are present or both are blank.
    BothOrNeither {
        first: usize,
        second: usize,
        labels: (&'static str, &'static str),
    },
    /// The value must be a valid `YYYY-MM-DD` date.
    Date { column: usize },
    /// The value must be a valid `YYYY-MM-DD` date strictly after today.
    FutureDate { column: usize },
}

impl Rule {
    fn column(&self) -> usize {
        match self {
            Rule::Required { column }
            | Rule::Numeric { column }
            | Rule::IntegerList { column, .. }
            | Rule::OneOf { column, .. }
            | Rule::NumberAtLeast { column, .. }
            | Rule::Date { column }
            | Rule::FutureDate { column } => *column,
            Rule::BothOrNeither { first, .. } => *first,
        }
    }
}

/// Run every rule against every row, failing fast on the first violation.
///
/// `import` names the import in error messages ("account", "contact", ...).
///
/// # Errors
///
/// Returns the first [`RowError`] encountered, with 1-based coordinates.
pub fn validate_rows(import: &str, rows: &[Row], rules: &[Rule]) -> Result<(), RowError> {
    for (index, row) in rows.iter().enumerate() {
        let number = index + 1;
        for rule in rules {
            check_rule(import, row, number, rule)?;
        }
    }
    Ok(())
}

fn check_rule(import: &str, row: &Row, number: usize, rule: &Rule) -> Result<(), RowError> {
    let fail = |message: String| RowError {
        row: number,
        column: rule.column() + 1,
        message,
    };

    match rule {
        Rule::Required { column } => {
            if row.is_blank(*column) {
                return Err(fail(format!(
                    "In the {import} import, column number {} is required, and it is empty on row {number}.",
                    column + 1
                )));
            }
        }
        Rule::Numeric { column } => {
            let value = row.get(*column);
            if !value.is_empty() && value.parse::<f64>().is_err() {
                return Err(fail(format!(
                    "In the {import} import, column number {} is not numeric on row {number}.",
                    column + 1
                )));
            }
        }
        Rule::IntegerList { column, min, label } => {
            let value = row.get(*column);
            if !value.is_empty() {
                for element in value.split(',') {
                    let element = element.trim();
                    if element.parse::<i64>().map_or(true, |n| n < *min) {
                        return Err(fail(format!(
                            "{element} is not a valid {label} on row {number}."
                        )));
                    }
                }
            }
        }
        Rule::OneOf {
            column,
            allowed,
            label,
        } => {
            let value = row.get(*column);
            if !value.is_empty() && !allowed.contains(&value) {
                return Err(fail(format!(
                    "{value} is not a valid {label} on row {number}."
                )));
            }
        }
        Rule::NumberAtLeast { column, min, label } => {
            let value = row.get(*column);
            if !value.is_empty() && value.parse::<f64>().map_or(true, |n| n < *min) {
                return Err(fail(format!(
                    "{value} is not a valid {label} on row {number}."
                )));
            }
        }
        Rule::BothOrNeither {
            first,
            second,
            labels,
        } => {
            if row.is_blank(*first) != row.is_blank(*second) {
                return Err(fail(format!(
                    "In the {import} import, row {number} has either a {} or a {}, but not both. \
                     If one is supplied, the other must be also.",
                    labels.0, labels.1
                )));
            }
        }
        Rule::Date { column } => {
            let value = row.get(*column);
            if !value.is_empty() && parse_date(value).is_none() {
                return Err(fail(format!(
                    "In the {import} import, column number {} must be a valid date in YYYY-MM-DD format on row {number}.",
                    column + 1
                )));
            }
        }
        Rule::FutureDate { column } => {
            let value = row.get(*column);
            if !value.is_empty() {
                let Some(date) = parse_date(value) else {
                    return Err(fail(format!(
                        "In the {import} import, column number {} must be a valid date in YYYY-MM-DD format on row {number}.",
                        column + 1
                    )));
                };
                if date <= Utc::now().date_naive() {
                    return Err(fail(format!(
                        "In the {import} import, column number {} must be a date in the future on row {number}.",
                        column + 1
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Parse an import-file date. Only `YYYY-MM-DD` is accepted.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
