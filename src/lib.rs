//! Batch sentiment scoring for CSV tables of free text.
//!
//! Rows are classified as `negative`, `neutral` or `positive` by a pretrained
//! RoBERTa classifier running on [candle](https://github.com/huggingface/candle),
//! in fixed-size batches, and the probabilities are written back next to the
//! original rows.

pub mod core;
mod loaders;
pub mod models;
pub mod pipelines;
pub mod table;

pub use core::{Result, ScoringConfig, SentimentError};

pub use models::{RobertaSentimentOptions, SentimentRobertaModel};

pub use pipelines::{
    ComputeBackend, ScoreRecord, Sentiment, SentimentAnalysisModel, SentimentAnalysisPipeline,
    SentimentAnalysisPipelineBuilder, TextRow,
};

pub use table::{score_csv, InputTable, OutputTable, ScoreReport, SentimentTally};
