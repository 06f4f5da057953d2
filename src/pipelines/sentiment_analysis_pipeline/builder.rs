use super::model::SentimentAnalysisModel;
use super::pipeline::SentimentAnalysisPipeline;
use crate::core::{LazySession, ModelOptions, Result, ScoringConfig};
use crate::models::sentiment_roberta::{RobertaSentimentOptions, SentimentRobertaModel};
use crate::pipelines::utils::DeviceRequest;

/// Builder for [`SentimentAnalysisPipeline`].
///
/// `build()` only validates settings; the model is loaded on the first
/// scoring call.
pub struct SentimentAnalysisPipelineBuilder<M: SentimentAnalysisModel> {
    options: M::Options,
    config: ScoringConfig,
    device: Option<candle_core::Device>,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipelineBuilder<M> {
    pub fn new(options: M::Options) -> Self {
        Self {
            options,
            config: ScoringConfig::default(),
            device: None,
        }
    }

    pub fn config(mut self, config: ScoringConfig) -> Self {
        self.config = config;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.config.max_length = max_length;
        self
    }

    /// Prefer CUDA/Metal when present (the default).
    pub fn use_accelerated_device(mut self, enabled: bool) -> Self {
        self.config.use_accelerated_device = enabled;
        self
    }

    pub fn cpu(self) -> Self {
        self.use_accelerated_device(false)
    }

    /// Run on an explicit device, overriding the accelerator preference.
    pub fn device(mut self, device: candle_core::Device) -> Self {
        self.device = Some(device);
        self
    }

    pub fn build(self) -> Result<SentimentAnalysisPipeline<M>>
    where
        M::Options: ModelOptions,
    {
        let device_request = match self.device {
            Some(device) => DeviceRequest::Explicit(device),
            None => DeviceRequest::from_preference(self.config.use_accelerated_device),
        };
        let session = LazySession::new(self.options, device_request);
        SentimentAnalysisPipeline::new(session, self.config)
    }
}

impl SentimentAnalysisPipelineBuilder<SentimentRobertaModel> {
    /// `cardiffnlp/twitter-roberta-base-sentiment` from the Hugging Face Hub.
    pub fn twitter_roberta() -> Self {
        Self::roberta(RobertaSentimentOptions::default())
    }

    /// A RoBERTa sentiment checkpoint from another hub repository or a local directory.
    pub fn roberta(options: RobertaSentimentOptions) -> Self {
        Self::new(options)
    }
}
