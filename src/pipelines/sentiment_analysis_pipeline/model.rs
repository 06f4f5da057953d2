use candle_core::{Device, Tensor};

use crate::pipelines::utils::{ComputeBackend, ResolvedDevice};

/// A pretrained three-way sentiment classifier together with its tokenizer.
///
/// Class order along the last logits axis is fixed: negative, neutral, positive.
pub trait SentimentAnalysisModel {
    type Options: std::fmt::Debug + Clone;

    fn load(options: Self::Options, device: &ResolvedDevice) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Tokenize `texts` as one batch, padded to its longest member and
    /// truncated at `max_length` tokens, and run a single forward pass.
    ///
    /// Returns raw class scores of shape `(texts.len(), 3)`.
    fn logits(&self, texts: &[&str], max_length: usize) -> anyhow::Result<Tensor>;

    fn backend(&self) -> ComputeBackend;

    fn device(&self) -> &Device;
}
