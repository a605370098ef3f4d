//! The positional row model and the delimited-file row source.
//!
//! Import files are comma-delimited with **no header row**; column meaning is
//! fixed per entity type. A `Row` is immutable once read — corrections (for
//! example from address resolution) produce a new `Row` via [`Row::with_updates`].

use std::path::Path;

use crate::error::SourceError;

/// One positional record from an import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    fields: Vec<String>,
}

impl Row {
    #[must_use]
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// The whitespace-trimmed value at `column`, or `""` when the column is
    /// absent. All validation and payload building goes through this accessor
    /// so short rows behave like rows with trailing blanks.
    #[must_use]
    pub fn get(&self, column: usize) -> &str {
        self.fields.get(column).map_or("", |f| f.trim())
    }

    /// Whether the trimmed value at `column` is empty.
    #[must_use]
    pub fn is_blank(&self, column: usize) -> bool {
        self.get(column).is_empty()
    }

    /// The raw (untrimmed) fields, as they will be re-emitted into a failure log.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A corrected copy with the given `(column, value)` pairs applied,
    /// growing the row with empty fields if an update lands past the end.
    #[must_use]
    pub fn with_updates(&self, updates: &[(usize, String)]) -> Row {
        let mut fields = self.fields.clone();
        for (column, value) in updates {
            if *column >= fields.len() {
                fields.resize(column + 1, String::new());
            }
            fields[*column] = value.clone();
        }
        Row { fields }
    }
}

impl<S: Into<String>> FromIterator<S> for Row {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Row::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Read every row of a headerless comma-delimited file, in file order.
///
/// Rows may have differing field counts (`flexible`); blank lines are skipped
/// by the reader. The whole file is read before any validation or network
/// activity so a malformed file fails the import up front.
///
/// # Errors
///
/// Returns [`SourceError::Open`] if the file cannot be opened and
/// [`SourceError::Read`] (with a 1-based row number) if a record is malformed.
pub fn read_rows(path: &Path) -> Result<Vec<Row>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| SourceError::Open {
            path: path.display().to_string(),
            source,
        })?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|source| SourceError::Read {
            path: path.display().to_string(),
            row: index + 1,
            source,
        })?;
        rows.push(Row::new(record.iter().map(str::to_string).collect()));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_rows_in_file_order_without_header_skipping() {
        let file = write_file("1,Alpha LLC,1\n2,Beta Inc,2\n");
        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(1), "Alpha LLC");
        assert_eq!(rows[1].get(0), "2");
    }

    #[test]
    fn get_trims_whitespace_and_tolerates_short_rows() {
        let row: Row = ["  42 ", "name"].into_iter().collect();
        assert_eq!(row.get(0), "42");
        assert_eq!(row.get(7), "");
        assert!(row.is_blank(7));
    }

    #[test]
    fn handles_quoted_fields_with_embedded_commas() {
        let file = write_file("1,\"Smith, John\",owner\n");
        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows[0].get(1), "Smith, John");
    }

    #[test]
    fn rows_may_have_differing_field_counts() {
        let file = write_file("1,a,b,c\n2,a\n");
        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows[0].len(), 4);
        assert_eq!(rows[1].len(), 2);
    }

    #[test]
    fn with_updates_grows_and_replaces() {
        let row: Row = ["1", "old"].into_iter().collect();
        let updated = row.with_updates(&[(1, "new".into()), (4, "far".into())]);
        assert_eq!(updated.get(1), "new");
        assert_eq!(updated.get(4), "far");
        // original untouched
        assert_eq!(row.get(1), "old");
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let result = read_rows(Path::new("/nonexistent/accounts.csv"));
        assert!(matches!(result, Err(SourceError::Open { .. })));
    }
}
