use super::error::{Result, SentimentError};

pub const DEFAULT_BATCH_SIZE: usize = 32;
pub const DEFAULT_MAX_LENGTH: usize = 256;

/// Name of the free-text column every input table must carry.
pub const TEXT_COLUMN: &str = "content";

/// Knobs for a scoring run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    /// Rows per forward pass. Must be at least 1.
    pub batch_size: usize,
    /// Token limit per row, special tokens included. Must be at least 1.
    pub max_length: usize,
    /// Prefer CUDA/Metal when present. Silently falls back to CPU.
    pub use_accelerated_device: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_length: DEFAULT_MAX_LENGTH,
            use_accelerated_device: true,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        check_sizes(self.batch_size, self.max_length)
    }
}

pub(crate) fn check_sizes(batch_size: usize, max_length: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(SentimentError::Config("batch_size must be at least 1".into()));
    }
    if max_length == 0 {
        return Err(SentimentError::Config("max_length must be at least 1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_batch_script() {
        let config = ScoringConfig::default();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.max_length, 256);
        assert!(config.use_accelerated_device);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let config = ScoringConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SentimentError::Config(_))));

        let config = ScoringConfig {
            max_length: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SentimentError::Config(_))));
    }
}
