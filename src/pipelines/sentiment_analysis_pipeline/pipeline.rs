use tracing::{debug, info};

use super::model::SentimentAnalysisModel;
use super::scores::{softmax_rows, ScoreRecord};
use crate::core::config::check_sizes;
use crate::core::{LazySession, ModelOptions, Result, ScoringConfig, SentimentError};
use crate::pipelines::stats::{batch_count, BatchStats};
use crate::pipelines::utils::ComputeBackend;

/// One input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRow {
    /// Position in the source table.
    pub row_index: usize,
    /// May be empty; empty text is still scored.
    pub content: String,
}

impl TextRow {
    pub fn new(row_index: usize, content: impl Into<String>) -> Self {
        Self {
            row_index,
            content: content.into(),
        }
    }

    /// Number `texts` from zero in order.
    pub fn enumerate<I, S>(texts: I) -> Vec<TextRow>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| TextRow::new(i, text))
            .collect()
    }
}

/// Output of [`SentimentAnalysisPipeline::run`].
#[derive(Debug, Clone)]
pub struct ScoreOutput {
    /// One record per input row, in input order.
    pub records: Vec<ScoreRecord>,
    pub stats: BatchStats,
}

/// Scores rows of text in fixed-size batches.
///
/// Construct with [`SentimentAnalysisPipelineBuilder`](super::SentimentAnalysisPipelineBuilder),
/// or directly from a [`LazySession`] with [`SentimentAnalysisPipeline::new`].
///
/// Batches run strictly one after another on the caller's thread; a batch
/// either yields a record for every one of its rows or fails as a whole.
pub struct SentimentAnalysisPipeline<M: SentimentAnalysisModel> {
    pub(crate) session: LazySession<M>,
    pub(crate) config: ScoringConfig,
}

impl<M> SentimentAnalysisPipeline<M>
where
    M: SentimentAnalysisModel,
    M::Options: ModelOptions,
{
    pub fn new(session: LazySession<M>, config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { session, config })
    }

    /// Score `rows` with the configured batch size and token limit.
    pub fn run(&self, rows: &[TextRow]) -> Result<ScoreOutput> {
        let stats = BatchStats::start();
        let records = self.score_all(rows, self.config.batch_size, self.config.max_length)?;
        let stats = stats.finish(records.len(), batch_count(rows.len(), self.config.batch_size));

        info!(
            rows = stats.rows,
            batches = stats.batches,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "scored all rows"
        );
        Ok(ScoreOutput { records, stats })
    }

    /// Score every row, returning one [`ScoreRecord`] per row in input order.
    ///
    /// Rows are split into contiguous batches of `batch_size`; each batch is
    /// padded to its own longest text and truncated at `max_length` tokens.
    /// The first failing batch aborts the call with
    /// [`SentimentError::Inference`] naming that batch's row range.
    pub fn score_all(
        &self,
        rows: &[TextRow],
        batch_size: usize,
        max_length: usize,
    ) -> Result<Vec<ScoreRecord>> {
        check_sizes(batch_size, max_length)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.session.acquire()?;
        let mut records = Vec::with_capacity(rows.len());

        for (batch_no, batch) in rows.chunks(batch_size).enumerate() {
            let span = row_span(batch);
            let texts: Vec<&str> = batch.iter().map(|row| row.content.as_str()).collect();

            let probs = model
                .logits(&texts, max_length)
                .and_then(|logits| softmax_rows(&logits))
                .map_err(|e| SentimentError::Inference {
                    rows: span.clone(),
                    reason: format!("{e:#}"),
                })?;

            if probs.len() != batch.len() {
                return Err(SentimentError::Inference {
                    rows: span,
                    reason: format!(
                        "model returned {} score rows for {} texts",
                        probs.len(),
                        batch.len()
                    ),
                });
            }

            records.extend(
                batch
                    .iter()
                    .zip(probs)
                    .map(|(row, p)| ScoreRecord::from_probabilities(row.row_index, p)),
            );
            debug!(batch = batch_no, rows = ?span, "scored batch");
        }

        Ok(records)
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn session(&self) -> &LazySession<M> {
        &self.session
    }

    /// Backend the model was loaded on, once it has been loaded.
    pub fn backend(&self) -> Option<ComputeBackend> {
        self.session.backend()
    }
}

/// Row-index range covered by a non-empty batch.
fn row_span(batch: &[TextRow]) -> std::ops::Range<usize> {
    let start = batch.first().map_or(0, |row| row.row_index);
    let end = batch.last().map_or(start, |row| row.row_index + 1);
    start..end
}
