use std::collections::HashMap;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use super::input::InputTable;
use crate::core::{Result, SentimentError};
use crate::pipelines::ScoreRecord;

/// Columns added to the input table, in output order.
pub const OUTPUT_COLUMNS: [&str; 5] = [
    "prob_negative",
    "prob_neutral",
    "prob_positive",
    "sentiment",
    "sentiment_confidence",
];

/// Input rows with the result columns filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Join `records` onto the rows of `input` by `row_index`.
///
/// Row order and the original columns are kept; a column that already
/// carries one of the [`OUTPUT_COLUMNS`] names is overwritten in place.
/// Every row needs exactly one record; a duplicate or a record for a row
/// the table does not have is an error.
pub fn attach(input: &InputTable, records: &[ScoreRecord]) -> Result<OutputTable> {
    let mut by_row: HashMap<usize, &ScoreRecord> = HashMap::with_capacity(records.len());
    for record in records {
        if record.row_index >= input.len() {
            return Err(SentimentError::UnmatchedScore {
                row: record.row_index,
                rows: input.len(),
            });
        }
        if by_row.insert(record.row_index, record).is_some() {
            return Err(SentimentError::DuplicateScore(record.row_index));
        }
    }

    let mut headers = input.headers().to_vec();
    let width = headers.len();
    let slots: Vec<usize> = OUTPUT_COLUMNS
        .iter()
        .map(|name| match headers.iter().position(|h| h == name) {
            Some(existing) => existing,
            None => {
                headers.push(name.to_string());
                headers.len() - 1
            }
        })
        .collect();

    let mut rows = Vec::with_capacity(input.len());
    for i in 0..input.len() {
        let record = by_row
            .get(&i)
            .copied()
            .ok_or(SentimentError::MissingScore(i))?;

        let mut row: Vec<String> = input.record(i).iter().take(width).cloned().collect();
        row.resize(headers.len(), String::new());
        row[input.text_column()] = input.content(i).to_string();

        let values = [
            record.prob_negative.to_string(),
            record.prob_neutral.to_string(),
            record.prob_positive.to_string(),
            record.label.as_str().to_string(),
            record.confidence.to_string(),
        ];
        for (slot, value) in slots.iter().zip(values) {
            row[*slot] = value;
        }
        rows.push(row);
    }

    Ok(OutputTable { headers, rows })
}

impl OutputTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Values of the column named `name`, if present.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.headers.iter().position(|h| h == name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Write the table as CSV.
    ///
    /// The file is staged next to `path` and renamed into place, so `path`
    /// either holds the complete table or is left untouched.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let staged = NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(staged.as_file());
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        staged.persist(path).map_err(|e| e.error)?;

        debug!(path = %path.display(), rows = self.rows.len(), "wrote output table");
        Ok(())
    }
}
