use anyhow::{Error as E, Result as AnyhowResult};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::roberta::{Config, RobertaForSequenceClassification};
use crate::core::ModelOptions;
use crate::loaders::{ConfigLoader, TokenizerLoader, WeightsLoader};
use crate::pipelines::sentiment_analysis_pipeline::SentimentAnalysisModel;
use crate::pipelines::utils::{ComputeBackend, ResolvedDevice};

pub const DEFAULT_MODEL_ID: &str = "cardiffnlp/twitter-roberta-base-sentiment";
pub const DEFAULT_REVISION: &str = "main";

/// Where the sentiment checkpoint comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobertaSentimentOptions {
    /// Hub repository id, or a local directory with the same files.
    pub model_id: String,
    pub revision: String,
}

impl Default for RobertaSentimentOptions {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            revision: DEFAULT_REVISION.to_string(),
        }
    }
}

impl ModelOptions for RobertaSentimentOptions {
    fn model_key(&self) -> String {
        format!("{}@{}", self.model_id, self.revision)
    }
}

/// Token ids the batch encoder needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub pad_id: u32,
}

/// A padded batch ready for the encoder, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBatch {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub position_ids: Vec<u32>,
    pub batch_size: usize,
    pub seq_len: usize,
}

impl EncodedBatch {
    /// Truncate each sequence to `max_len` tokens (at least two), keeping both
    /// framing tokens, then pad everything to the longest remaining sequence.
    pub fn from_ids(sequences: Vec<Vec<u32>>, max_len: usize, special: SpecialTokens) -> Self {
        let truncated: Vec<Vec<u32>> = sequences
            .into_iter()
            .map(|ids| truncate_keeping_last(ids, max_len))
            .collect();

        let batch_size = truncated.len();
        let seq_len = truncated.iter().map(Vec::len).max().unwrap_or(0);
        let pad = special.pad_id;

        let mut input_ids = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        let mut position_ids = Vec::with_capacity(batch_size * seq_len);

        for ids in &truncated {
            for t in 0..seq_len {
                match ids.get(t) {
                    Some(&id) => {
                        input_ids.push(id);
                        attention_mask.push(1);
                        position_ids.push(pad + 1 + t as u32);
                    }
                    None => {
                        input_ids.push(pad);
                        attention_mask.push(0);
                        position_ids.push(pad);
                    }
                }
            }
        }

        Self {
            input_ids,
            attention_mask,
            position_ids,
            batch_size,
            seq_len,
        }
    }

    fn tensors(&self, device: &Device) -> candle_core::Result<(Tensor, Tensor, Tensor)> {
        let shape = (self.batch_size, self.seq_len);
        Ok((
            Tensor::from_slice(&self.input_ids, shape, device)?,
            Tensor::from_slice(&self.attention_mask, shape, device)?,
            Tensor::from_slice(&self.position_ids, shape, device)?,
        ))
    }
}

/// Never drops below `<s> </s>`, so the classifier always pools `<s>`.
const MIN_FRAMED_LEN: usize = 2;

fn truncate_keeping_last(mut ids: Vec<u32>, max_len: usize) -> Vec<u32> {
    let max_len = max_len.max(MIN_FRAMED_LEN);
    if ids.len() <= max_len {
        return ids;
    }
    let last = ids[ids.len() - 1];
    ids.truncate(max_len);
    if let Some(tail) = ids.last_mut() {
        *tail = last;
    }
    ids
}

/// Sentiment analysis model using RoBERTa.
#[derive(Clone)]
pub struct SentimentRobertaModel {
    model: RobertaForSequenceClassification,
    tokenizer: Tokenizer,
    special: SpecialTokens,
    max_sequence_length: usize,
    backend: ComputeBackend,
    device: Device,
}

impl SentimentRobertaModel {
    pub fn new(options: RobertaSentimentOptions, device: &ResolvedDevice) -> AnyhowResult<Self> {
        let RobertaSentimentOptions { model_id, revision } = options;

        let config: Config = ConfigLoader::new(&model_id, &revision).load()?;
        if config.num_labels() != 3 {
            anyhow::bail!(
                "expected a three-way sentiment head, found {} labels",
                config.num_labels()
            );
        }

        let weights_filename = WeightsLoader::new(&model_id, &revision).load()?;
        let dtype = device.backend.dtype();
        let vb = if weights_filename
            .extension()
            .is_some_and(|ext| ext == "safetensors")
        {
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[&weights_filename], dtype, &device.device)?
            }
        } else if weights_filename
            .extension()
            .is_some_and(|ext| ext == "bin")
        {
            VarBuilder::from_pth(&weights_filename, dtype, &device.device)?
        } else {
            anyhow::bail!("Unsupported weight file format: {:?}", weights_filename);
        };

        let model = RobertaForSequenceClassification::load(vb, &config)?;
        // Batches are truncated and padded by `EncodedBatch`.
        let mut tokenizer = TokenizerLoader::new(&model_id, &revision).load()?;
        tokenizer.with_padding(None);
        tokenizer.with_truncation(None).map_err(E::msg)?;
        let pad_id = tokenizer
            .token_to_id("<pad>")
            .unwrap_or(config.pad_token_id);

        info!(
            model = %model_id,
            revision = %revision,
            ?dtype,
            layers = config.num_hidden_layers,
            "sentiment model ready"
        );

        Ok(Self {
            model,
            tokenizer,
            special: SpecialTokens { pad_id },
            max_sequence_length: config.max_sequence_length(),
            backend: device.backend,
            device: device.device.clone(),
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Tokenize a batch, truncating at `max_length` (capped by the position table).
    pub fn encode(&self, texts: &[&str], max_length: usize) -> AnyhowResult<EncodedBatch> {
        let limit = max_length.min(self.max_sequence_length);
        if limit < max_length {
            debug!(requested = max_length, limit, "max_length capped by model position table");
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| E::msg(format!("Tokenization error: {e}")))?;
        let sequences = encodings
            .iter()
            .map(|encoding| encoding.get_ids().to_vec())
            .collect();

        Ok(EncodedBatch::from_ids(sequences, limit, self.special))
    }
}

impl SentimentAnalysisModel for SentimentRobertaModel {
    type Options = RobertaSentimentOptions;

    fn load(options: Self::Options, device: &ResolvedDevice) -> anyhow::Result<Self> {
        SentimentRobertaModel::new(options, device)
    }

    fn logits(&self, texts: &[&str], max_length: usize) -> AnyhowResult<Tensor> {
        let batch = self.encode(texts, max_length)?;
        let (input_ids, attention_mask, position_ids) = batch.tensors(&self.device)?;
        Ok(self
            .model
            .forward(&input_ids, &attention_mask, &position_ids)?)
    }

    fn backend(&self) -> ComputeBackend {
        self.backend
    }

    fn device(&self) -> &Device {
        self.device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECIAL: SpecialTokens = SpecialTokens { pad_id: 1 };

    #[test]
    fn pads_to_longest_sequence_in_batch() {
        let batch = EncodedBatch::from_ids(vec![vec![0, 7, 8, 2], vec![0, 2]], 256, SPECIAL);

        assert_eq!(batch.batch_size, 2);
        assert_eq!(batch.seq_len, 4);
        assert_eq!(batch.input_ids, vec![0, 7, 8, 2, 0, 2, 1, 1]);
        assert_eq!(batch.attention_mask, vec![1, 1, 1, 1, 1, 1, 0, 0]);
        assert_eq!(batch.position_ids, vec![2, 3, 4, 5, 2, 3, 1, 1]);
    }

    #[test]
    fn truncation_keeps_closing_token() {
        let batch = EncodedBatch::from_ids(vec![vec![0, 5, 6, 7, 8, 2]], 4, SPECIAL);
        assert_eq!(batch.seq_len, 4);
        assert_eq!(batch.input_ids, vec![0, 5, 6, 2]);
    }

    #[test]
    fn tiny_limit_still_keeps_both_framing_tokens() {
        let batch = EncodedBatch::from_ids(vec![vec![0, 5, 6, 2], vec![0, 2]], 1, SPECIAL);
        assert_eq!(batch.seq_len, 2);
        assert_eq!(batch.input_ids, vec![0, 2, 0, 2]);
        assert_eq!(batch.position_ids, vec![2, 3, 2, 3]);
    }

    #[test]
    fn short_batches_are_not_padded_to_max_length() {
        let batch = EncodedBatch::from_ids(vec![vec![0, 2], vec![0, 9, 2]], 256, SPECIAL);
        assert_eq!(batch.seq_len, 3);
    }

    #[test]
    fn default_options_point_at_twitter_roberta() {
        let options = RobertaSentimentOptions::default();
        assert_eq!(
            options.model_key(),
            "cardiffnlp/twitter-roberta-base-sentiment@main"
        );
    }
}
