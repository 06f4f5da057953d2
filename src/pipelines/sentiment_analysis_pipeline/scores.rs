use std::fmt;
use std::str::FromStr;

use candle_core::{DType, Tensor};
use thiserror::Error;

/// Sentiment classes in the classifier's output order.
///
/// The ordering doubles as the tie-break: on exactly equal probabilities the
/// lower class wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label string that is none of the three classes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sentiment label `{0}`")]
pub struct ParseSentimentError(pub String);

impl FromStr for Sentiment {
    type Err = ParseSentimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            "positive" => Ok(Sentiment::Positive),
            other => Err(ParseSentimentError(other.to_string())),
        }
    }
}

/// Scores for one input row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub row_index: usize,
    pub prob_negative: f32,
    pub prob_neutral: f32,
    pub prob_positive: f32,
    pub label: Sentiment,
    /// Probability of `label`, i.e. the largest of the three.
    pub confidence: f32,
}

impl ScoreRecord {
    pub fn from_probabilities(row_index: usize, probs: [f32; 3]) -> Self {
        let (label, confidence) = argmax(&probs);
        Self {
            row_index,
            prob_negative: probs[0],
            prob_neutral: probs[1],
            prob_positive: probs[2],
            label,
            confidence,
        }
    }

    pub fn probabilities(&self) -> [f32; 3] {
        [self.prob_negative, self.prob_neutral, self.prob_positive]
    }
}

/// Most probable class; the first one wins on exact ties.
pub fn argmax(probs: &[f32; 3]) -> (Sentiment, f32) {
    let mut best = 0;
    for i in 1..probs.len() {
        if probs[i] > probs[best] {
            best = i;
        }
    }
    (Sentiment::ALL[best], probs[best])
}

/// Softmax over the class axis of a `(batch, 3)` logits tensor.
///
/// Runs in F32 whatever precision the model used, and rejects rows that
/// come out non-finite.
pub fn softmax_rows(logits: &Tensor) -> anyhow::Result<Vec<[f32; 3]>> {
    let (_, classes) = logits.dims2()?;
    if classes != Sentiment::ALL.len() {
        anyhow::bail!("expected 3 class scores per row, got {classes}");
    }

    let probs = candle_nn::ops::softmax_last_dim(&logits.to_dtype(DType::F32)?)?;
    probs
        .to_vec2::<f32>()?
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            if row.iter().any(|p| !p.is_finite()) {
                anyhow::bail!("non-finite class probability in batch row {i}");
            }
            Ok([row[0], row[1], row[2]])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn logits(rows: &[[f32; 3]]) -> Tensor {
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Tensor::from_vec(flat, (rows.len(), 3), &Device::Cpu).unwrap()
    }

    #[test]
    fn softmax_rows_are_distributions() {
        let probs =
            softmax_rows(&logits(&[[2.0, 0.5, -1.0], [-3.0, 0.0, 4.0], [0.0, 0.0, 0.0]])).unwrap();

        for row in &probs {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "sum was {sum}");
            assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
        }
        assert!(probs[0][0] > probs[0][1] && probs[0][1] > probs[0][2]);
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let probs = softmax_rows(&logits(&[[1000.0, 999.0, -1000.0]])).unwrap();
        assert!(probs[0].iter().all(|p| p.is_finite()));
        assert!((probs[0][0] - 0.7311).abs() < 1e-3);
    }

    #[test]
    fn softmax_runs_in_f32_for_half_logits() {
        let half = logits(&[[1.0, 2.0, 3.0]]).to_dtype(DType::F16).unwrap();
        let probs = softmax_rows(&half).unwrap();
        let sum: f32 = probs[0].iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
    }

    #[test]
    fn wrong_class_count_is_rejected() {
        let two = Tensor::zeros((1, 2), DType::F32, &Device::Cpu).unwrap();
        assert!(softmax_rows(&two).is_err());
    }

    #[test]
    fn nan_logits_are_rejected() {
        assert!(softmax_rows(&logits(&[[f32::NAN, 0.0, 0.0]])).is_err());
    }

    #[test]
    fn confidence_is_the_largest_probability() {
        let record = ScoreRecord::from_probabilities(4, [0.1, 0.2, 0.7]);
        assert_eq!(record.row_index, 4);
        assert_eq!(record.label, Sentiment::Positive);
        assert_eq!(record.confidence, 0.7);
    }

    #[test]
    fn exact_ties_prefer_the_lower_class() {
        let third = 1.0 / 3.0;
        assert_eq!(argmax(&[third, third, third]).0, Sentiment::Negative);
        assert_eq!(argmax(&[0.2, 0.4, 0.4]).0, Sentiment::Neutral);
        assert_eq!(argmax(&[0.4, 0.2, 0.4]).0, Sentiment::Negative);
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(" Positive\n".parse::<Sentiment>(), Ok(Sentiment::Positive));
        assert_eq!("NEUTRAL".parse::<Sentiment>(), Ok(Sentiment::Neutral));
        assert_eq!(
            " Mixed ".parse::<Sentiment>(),
            Err(ParseSentimentError("mixed".into()))
        );
        assert_eq!(
            ParseSentimentError("mixed".into()).to_string(),
            "unknown sentiment label `mixed`"
        );
        assert_eq!(Sentiment::from_index(0), Some(Sentiment::Negative));
        assert_eq!(Sentiment::from_index(3), None);
        assert_eq!(Sentiment::Neutral.to_string(), "neutral");
    }
}
