//! Sentiment analysis pipeline for scoring rows of free text.
//!
//! Every row gets a probability for each of `negative`, `neutral` and
//! `positive`, the most probable label, and that label's probability as a
//! confidence. Rows are scored in fixed-size batches so memory stays bounded
//! however long the input is.
//!
//! ## Main Types
//!
//! - [`SentimentAnalysisPipeline`] - Batching orchestrator over a model session
//! - [`SentimentAnalysisPipelineBuilder`] - Builder pattern for pipeline configuration
//! - [`SentimentAnalysisModel`] - Trait for sentiment classifier implementations
//! - [`ScoreRecord`] / [`Sentiment`] - Per-row result and label
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use batch_sentiment::pipelines::sentiment_analysis_pipeline::*;
//!
//! let pipeline = SentimentAnalysisPipelineBuilder::twitter_roberta()
//!     .batch_size(2)
//!     .build()?;
//!
//! let rows = TextRow::enumerate(["great product", "", "terrible support"]);
//! for record in pipeline.run(&rows)?.records {
//!     println!("{}: {} ({:.2})", record.row_index, record.label, record.confidence);
//! }
//! # Ok::<(), batch_sentiment::SentimentError>(())
//! ```

pub mod builder;
pub mod model;
pub mod pipeline;
pub mod scores;

pub use builder::SentimentAnalysisPipelineBuilder;
pub use model::SentimentAnalysisModel;
pub use pipeline::{ScoreOutput, SentimentAnalysisPipeline, TextRow};
pub use scores::{ParseSentimentError, ScoreRecord, Sentiment};

pub use crate::models::sentiment_roberta::{RobertaSentimentOptions, SentimentRobertaModel};
