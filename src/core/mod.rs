pub mod config;
pub mod error;
pub mod session;

pub use config::{ScoringConfig, DEFAULT_BATCH_SIZE, DEFAULT_MAX_LENGTH, TEXT_COLUMN};
pub use error::{FailureScope, Result, SentimentError};
pub use session::{LazySession, ModelOptions};
