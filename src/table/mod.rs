//! CSV in, CSV out.
//!
//! [`InputTable`] parses the input file into [`TextRow`](crate::pipelines::TextRow)s,
//! [`attach`] joins the score records back onto the original rows and
//! [`OutputTable::write_csv`] persists the result. [`score_csv`] runs the
//! whole thing with a pipeline.

pub mod input;
pub mod output;
pub mod summary;

use std::path::{Path, PathBuf};

use tracing::info;

pub use input::InputTable;
pub use output::{attach, OutputTable, OUTPUT_COLUMNS};
pub use summary::{SentimentTally, DISPLAY_ORDER};

use crate::core::{ModelOptions, Result};
use crate::pipelines::{BatchStats, SentimentAnalysisModel, SentimentAnalysisPipeline};

/// What a [`score_csv`] run produced.
#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub output: PathBuf,
    pub tally: SentimentTally,
    pub stats: BatchStats,
}

/// Score the `content` column of `input` and write the augmented table to `output`.
///
/// The schema is checked before the model is touched. Nothing is written
/// unless every row was scored.
pub fn score_csv<M>(
    pipeline: &SentimentAnalysisPipeline<M>,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<ScoreReport>
where
    M: SentimentAnalysisModel,
    M::Options: ModelOptions,
{
    let table = InputTable::from_path(input.as_ref())?;
    let scored = pipeline.run(&table.rows())?;

    let augmented = attach(&table, &scored.records)?;
    augmented.write_csv(output.as_ref())?;

    let tally = SentimentTally::from_records(&scored.records);
    info!(
        output = %output.as_ref().display(),
        positive = tally.positive,
        neutral = tally.neutral,
        negative = tally.negative,
        "saved scored table"
    );

    Ok(ScoreReport {
        output: output.as_ref().to_path_buf(),
        tally,
        stats: scored.stats,
    })
}
