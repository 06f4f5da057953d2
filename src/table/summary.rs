use std::fmt;

use crate::pipelines::{ScoreRecord, Sentiment};

/// Order the labels are reported in.
pub const DISPLAY_ORDER: [Sentiment; 3] =
    [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

/// Label counts over a scored table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentTally {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    /// Labels that are none of the three classes.
    pub other: usize,
}

impl SentimentTally {
    pub fn from_records(records: &[ScoreRecord]) -> Self {
        let mut tally = Self::default();
        for record in records {
            tally.add(record.label);
        }
        tally
    }

    /// Count free-form label strings, normalized to lowercase and trimmed.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tally = Self::default();
        for label in labels {
            match label.as_ref().parse::<Sentiment>() {
                Ok(sentiment) => tally.add(sentiment),
                Err(_) => tally.other += 1,
            }
        }
        tally
    }

    fn add(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }

    pub fn count(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
        }
    }

    /// Rows carrying one of the three labels.
    pub fn labelled(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    /// Percentage of labelled rows carrying `sentiment`; zero when empty.
    pub fn share(&self, sentiment: Sentiment) -> f64 {
        match self.labelled() {
            0 => 0.0,
            total => 100.0 * self.count(sentiment) as f64 / total as f64,
        }
    }
}

impl fmt::Display for SentimentTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sentiment in DISPLAY_ORDER {
            writeln!(
                f,
                "{:<9}{:>7}  {:>5.1}%",
                sentiment.as_str(),
                self.count(sentiment),
                self.share(sentiment)
            )?;
        }
        if self.other > 0 {
            writeln!(f, "{:<9}{:>7}", "other", self.other)?;
        }
        Ok(())
    }
}
