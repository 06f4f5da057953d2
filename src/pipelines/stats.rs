use std::time::{Duration, Instant};

/// Statistics for a batched scoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStats {
    /// Rows scored.
    pub rows: usize,
    /// Forward passes issued.
    pub batches: usize,
    /// Wall time, model loading included when it happened during the run.
    pub elapsed: Duration,
}

impl BatchStats {
    /// Start timing (call at start of operation).
    pub(crate) fn start() -> BatchStatsBuilder {
        BatchStatsBuilder {
            start_time: Instant::now(),
        }
    }

    pub fn rows_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.rows as f64 / secs
        } else {
            0.0
        }
    }
}

pub(crate) struct BatchStatsBuilder {
    start_time: Instant,
}

impl BatchStatsBuilder {
    pub fn finish(self, rows: usize, batches: usize) -> BatchStats {
        BatchStats {
            rows,
            batches,
            elapsed: self.start_time.elapsed(),
        }
    }
}

/// Number of forward passes needed for `rows` rows.
pub fn batch_count(rows: usize, batch_size: usize) -> usize {
    rows.div_ceil(batch_size)
}
