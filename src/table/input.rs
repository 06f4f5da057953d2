use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::core::{Result, SentimentError, TEXT_COLUMN};
use crate::pipelines::TextRow;

/// Field values read as missing text, matching pandas' default `na_values`.
const NA_MARKERS: [&str; 19] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
    "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "1.#IND", "1.#QNAN",
];

/// A parsed input CSV.
///
/// Every field is kept as read so the output can reproduce the original
/// columns; the text column is additionally coerced to plain text.
#[derive(Debug, Clone)]
pub struct InputTable {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
    text_column: usize,
}

impl InputTable {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let table = Self::from_reader(File::open(path)?)?;
        debug!(path = %path.display(), rows = table.len(), "read input table");
        Ok(table)
    }

    /// Parse CSV with a header row. Fails with [`SentimentError::Schema`]
    /// when the `content` column is absent.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut headers: Vec<String> = reader.byte_headers()?.iter().map(decode).collect();
        if let Some(first) = headers.first_mut() {
            if let Some(stripped) = first.strip_prefix('\u{feff}') {
                *first = stripped.to_string();
            }
        }

        let text_column = headers
            .iter()
            .position(|h| h == TEXT_COLUMN)
            .ok_or_else(|| SentimentError::Schema {
                column: TEXT_COLUMN.to_string(),
                found: headers.join(", "),
            })?;

        let mut records = Vec::new();
        for record in reader.byte_records() {
            let record = record?;
            records.push(record.iter().map(decode).collect());
        }

        Ok(Self {
            headers,
            records,
            text_column,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn text_column(&self) -> usize {
        self.text_column
    }

    /// Raw fields of row `index`, possibly fewer or more than there are headers.
    pub(crate) fn record(&self, index: usize) -> &[String] {
        &self.records[index]
    }

    /// Coerced text of row `index`; missing and NA values become empty.
    pub fn content(&self, index: usize) -> &str {
        let field = self
            .records
            .get(index)
            .and_then(|record| record.get(self.text_column))
            .map(String::as_str)
            .unwrap_or("");
        if is_missing(field) {
            ""
        } else {
            field
        }
    }

    pub fn rows(&self) -> Vec<TextRow> {
        (0..self.len())
            .map(|i| TextRow::new(i, self.content(i)))
            .collect()
    }
}

fn decode(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

fn is_missing(field: &str) -> bool {
    NA_MARKERS.contains(&field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_in_order() {
        let csv = "id,content\n1,great product\n2,\n3,terrible support\n";
        let table = InputTable::from_reader(csv.as_bytes()).unwrap();

        let rows = table.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], TextRow::new(0, "great product"));
        assert_eq!(rows[1], TextRow::new(1, ""));
        assert_eq!(rows[2].content, "terrible support");
    }

    #[test]
    fn missing_text_column_is_a_schema_error() {
        let csv = "id,text\n1,hello\n";
        let err = InputTable::from_reader(csv.as_bytes()).unwrap_err();
        match err {
            SentimentError::Schema { column, found } => {
                assert_eq!(column, "content");
                assert_eq!(found, "id, text");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn column_match_is_case_sensitive() {
        let csv = "Content\nhello\n";
        assert!(matches!(
            InputTable::from_reader(csv.as_bytes()),
            Err(SentimentError::Schema { .. })
        ));
    }

    #[test]
    fn na_markers_and_short_rows_become_empty_text() {
        let table = InputTable::from_reader("id,content\n1\n2,NA\n3,none\n".as_bytes()).unwrap();
        assert_eq!(table.content(0), "");
        assert_eq!(table.content(1), "");
        // only the exact markers count as missing
        assert_eq!(table.content(2), "none");

        let csv = "content,id\nNaN,1\nnull,2\n<NA>,3\n";
        let table = InputTable::from_reader(csv.as_bytes()).unwrap();
        assert!(table.rows().iter().all(|row| row.content.is_empty()));
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let mut csv = b"content\n".to_vec();
        csv.extend_from_slice(b"caf\xe9\n");
        let table = InputTable::from_reader(csv.as_slice()).unwrap();
        assert_eq!(table.content(0), "caf\u{fffd}");
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let csv = "\u{feff}content\nhello\n";
        let table = InputTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.headers(), ["content"]);
        assert_eq!(table.content(0), "hello");
    }
}
