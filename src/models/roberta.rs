//! RoBERTa encoder with a sequence-classification head.
//!
//! Post-norm BERT-style transformer layers over learned absolute position
//! embeddings. Position ids follow RoBERTa's convention of starting after the
//! padding index, so callers supply them alongside the token ids.
//!
//! Weight names match the Hugging Face `RobertaForSequenceClassification`
//! checkpoint layout (`roberta.*` encoder, `classifier.*` head).

use std::collections::HashMap;

use candle_core::{DType, Device, IndexOp, Result, Tensor};
use candle_nn::{
    embedding, linear, ops::softmax_last_dim, Embedding, Init, LayerNorm, Linear, Module,
    VarBuilder,
};
use serde::Deserialize;

// Additive bias for padded key positions; finite so half precision stays NaN-free.
const MASK_FILL: f64 = -10_000.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    #[serde(default = "default_pad_token_id")]
    pub pad_token_id: u32,
    #[serde(default)]
    pub id2label: Option<HashMap<String, String>>,
}

fn default_type_vocab_size() -> usize {
    1
}

fn default_layer_norm_eps() -> f64 {
    1e-5
}

fn default_pad_token_id() -> u32 {
    1
}

impl Config {
    /// Width of the classification head; checkpoints without `id2label`
    /// default to two labels like the Hugging Face config does.
    pub fn num_labels(&self) -> usize {
        self.id2label.as_ref().map_or(2, |labels| labels.len())
    }

    /// Longest token sequence the position table can address.
    pub fn max_sequence_length(&self) -> usize {
        self.max_position_embeddings
            .saturating_sub(self.pad_token_id as usize + 1)
    }
}

/// Older checkpoints name layer-norm parameters `gamma`/`beta`.
fn layer_norm(size: usize, eps: f64, vb: VarBuilder) -> Result<LayerNorm> {
    let (weight_name, bias_name) = if vb.contains_tensor("gamma") {
        ("gamma", "beta")
    } else {
        ("weight", "bias")
    };
    let weight = vb.get_with_hints(size, weight_name, Init::Const(1.0))?;
    let bias = vb.get_with_hints(size, bias_name, Init::Const(0.0))?;
    Ok(LayerNorm::new(weight, bias, eps))
}

#[derive(Debug, Clone)]
struct Embeddings {
    word: Embedding,
    position: Embedding,
    token_type: Embedding,
    norm: LayerNorm,
}

impl Embeddings {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            word: embedding(config.vocab_size, config.hidden_size, vb.pp("word_embeddings"))?,
            position: embedding(
                config.max_position_embeddings,
                config.hidden_size,
                vb.pp("position_embeddings"),
            )?,
            token_type: embedding(
                config.type_vocab_size,
                config.hidden_size,
                vb.pp("token_type_embeddings"),
            )?,
            norm: layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?,
        })
    }

    fn forward(&self, input_ids: &Tensor, position_ids: &Tensor) -> Result<Tensor> {
        let token_types = input_ids.zeros_like()?;
        input_ids
            .apply(&self.word)?
            .broadcast_add(&position_ids.apply(&self.position)?)?
            .broadcast_add(&token_types.apply(&self.token_type)?)?
            .apply(&self.norm)
    }
}

/// Multi-head self-attention.
#[derive(Debug, Clone)]
struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    num_heads: usize,
    head_dim: usize,
}

impl SelfAttention {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let hidden = config.hidden_size;
        Ok(Self {
            query: linear(hidden, hidden, vb.pp("query"))?,
            key: linear(hidden, hidden, vb.pp("key"))?,
            value: linear(hidden, hidden, vb.pp("value"))?,
            num_heads: config.num_attention_heads,
            head_dim: hidden / config.num_attention_heads,
        })
    }

    fn split_heads(&self, xs: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, _) = xs.dims3()?;
        xs.reshape((batch, seq_len, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&self, hidden_states: &Tensor, mask_bias: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, hidden) = hidden_states.dims3()?;

        let q = self.split_heads(&hidden_states.apply(&self.query)?)?;
        let k = self.split_heads(&hidden_states.apply(&self.key)?)?;
        let v = self.split_heads(&hidden_states.apply(&self.value)?)?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = (q.matmul(&k.t()?)? * scale)?.broadcast_add(mask_bias)?;
        let probs = softmax_last_dim(&scores)?;

        probs
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, seq_len, hidden))
    }
}

#[derive(Debug, Clone)]
struct EncoderLayer {
    attention: SelfAttention,
    attention_output: Linear,
    attention_norm: LayerNorm,
    intermediate: Linear,
    output: Linear,
    output_norm: LayerNorm,
}

impl EncoderLayer {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let hidden = config.hidden_size;
        let eps = config.layer_norm_eps;
        Ok(Self {
            attention: SelfAttention::load(vb.pp("attention.self"), config)?,
            attention_output: linear(hidden, hidden, vb.pp("attention.output.dense"))?,
            attention_norm: layer_norm(hidden, eps, vb.pp("attention.output.LayerNorm"))?,
            intermediate: linear(hidden, config.intermediate_size, vb.pp("intermediate.dense"))?,
            output: linear(config.intermediate_size, hidden, vb.pp("output.dense"))?,
            output_norm: layer_norm(hidden, eps, vb.pp("output.LayerNorm"))?,
        })
    }

    fn forward(&self, hidden_states: &Tensor, mask_bias: &Tensor) -> Result<Tensor> {
        let attended = self
            .attention
            .forward(hidden_states, mask_bias)?
            .apply(&self.attention_output)?;
        let hidden_states = (attended + hidden_states)?.apply(&self.attention_norm)?;

        let projected = hidden_states
            .apply(&self.intermediate)?
            .gelu_erf()?
            .apply(&self.output)?;
        (projected + hidden_states)?.apply(&self.output_norm)
    }
}

/// `dense -> tanh -> out_proj` over the `<s>` token.
#[derive(Debug, Clone)]
struct ClassificationHead {
    dense: Linear,
    out_proj: Linear,
}

impl ClassificationHead {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            dense: linear(config.hidden_size, config.hidden_size, vb.pp("dense"))?,
            out_proj: linear(config.hidden_size, config.num_labels(), vb.pp("out_proj"))?,
        })
    }
}

impl Module for ClassificationHead {
    fn forward(&self, hidden_states: &Tensor) -> Result<Tensor> {
        hidden_states
            .i((.., 0, ..))?
            .contiguous()?
            .apply(&self.dense)?
            .tanh()?
            .apply(&self.out_proj)
    }
}

/// RoBERTa model for sequence classification.
#[derive(Debug, Clone)]
pub struct RobertaForSequenceClassification {
    embeddings: Embeddings,
    layers: Vec<EncoderLayer>,
    head: ClassificationHead,
    device: Device,
    dtype: DType,
}

impl RobertaForSequenceClassification {
    pub fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let encoder = vb.pp("roberta");
        let embeddings = Embeddings::load(encoder.pp("embeddings"), config)?;

        let mut layers = Vec::with_capacity(config.num_hidden_layers);
        for layer_idx in 0..config.num_hidden_layers {
            layers.push(EncoderLayer::load(
                encoder.pp(format!("encoder.layer.{layer_idx}")),
                config,
            )?);
        }

        let head = ClassificationHead::load(vb.pp("classifier"), config)?;

        Ok(Self {
            embeddings,
            layers,
            head,
            device: vb.device().clone(),
            dtype: vb.dtype(),
        })
    }

    /// Turn a `(batch, seq_len)` 0/1 padding mask into an additive bias of
    /// shape `(batch, 1, 1, seq_len)`.
    fn mask_bias(&self, attention_mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len) = attention_mask.dims2()?;
        let keep = attention_mask.to_dtype(DType::F32)?;
        ((1.0 - keep)? * MASK_FILL)?
            .reshape((batch, 1, 1, seq_len))?
            .to_dtype(self.dtype)
    }

    /// Forward pass for sequence classification.
    ///
    /// # Arguments
    /// * `input_ids` - Token IDs with shape `(batch_size, sequence_length)`
    /// * `attention_mask` - Shape `(batch_size, sequence_length)` (1 for tokens, 0 for padding)
    /// * `position_ids` - Shape `(batch_size, sequence_length)`
    ///
    /// # Returns
    /// Classification logits with shape `(batch_size, num_labels)`
    pub fn forward(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        position_ids: &Tensor,
    ) -> Result<Tensor> {
        let mask_bias = self.mask_bias(attention_mask)?;

        let mut hidden_states = self.embeddings.forward(input_ids, position_ids)?;
        for layer in &self.layers {
            hidden_states = layer.forward(&hidden_states, &mask_bias)?;
        }

        hidden_states.apply(&self.head)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;

    fn tiny_config() -> Config {
        serde_json::from_str(
            r#"{
                "vocab_size": 16,
                "hidden_size": 8,
                "num_hidden_layers": 2,
                "num_attention_heads": 2,
                "intermediate_size": 16,
                "max_position_embeddings": 12,
                "type_vocab_size": 1,
                "layer_norm_eps": 1e-5,
                "pad_token_id": 1,
                "id2label": {"0": "LABEL_0", "1": "LABEL_1", "2": "LABEL_2"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn config_reads_hub_layout() {
        let config = tiny_config();
        assert_eq!(config.num_labels(), 3);
        assert_eq!(config.max_sequence_length(), 10);
    }

    #[test]
    fn config_defaults_fill_optional_fields() {
        let config: Config = serde_json::from_str(
            r#"{"vocab_size": 4, "hidden_size": 8, "num_hidden_layers": 1,
                "num_attention_heads": 2, "intermediate_size": 8,
                "max_position_embeddings": 514}"#,
        )
        .unwrap();
        assert_eq!(config.pad_token_id, 1);
        assert_eq!(config.type_vocab_size, 1);
        assert_eq!(config.num_labels(), 2);
        assert_eq!(config.max_sequence_length(), 512);
    }

    #[test]
    fn forward_yields_one_logit_row_per_sequence() {
        let config = tiny_config();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = RobertaForSequenceClassification::load(vb, &config).unwrap();

        let input_ids = Tensor::new(&[[0u32, 5, 6, 2], [0, 7, 2, 1]], &Device::Cpu).unwrap();
        let mask = Tensor::new(&[[1u32, 1, 1, 1], [1, 1, 1, 0]], &Device::Cpu).unwrap();
        let positions = Tensor::new(&[[2u32, 3, 4, 5], [2, 3, 4, 1]], &Device::Cpu).unwrap();

        let logits = model.forward(&input_ids, &mask, &positions).unwrap();
        assert_eq!(logits.dims(), &[2, 3]);
        let values = logits.to_vec2::<f32>().unwrap();
        assert!(values.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn padding_does_not_change_logits() {
        let config = tiny_config();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = RobertaForSequenceClassification::load(vb, &config).unwrap();

        let short = model
            .forward(
                &Tensor::new(&[[0u32, 7, 2]], &Device::Cpu).unwrap(),
                &Tensor::new(&[[1u32, 1, 1]], &Device::Cpu).unwrap(),
                &Tensor::new(&[[2u32, 3, 4]], &Device::Cpu).unwrap(),
            )
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();
        let padded = model
            .forward(
                &Tensor::new(&[[0u32, 7, 2, 1, 1]], &Device::Cpu).unwrap(),
                &Tensor::new(&[[1u32, 1, 1, 0, 0]], &Device::Cpu).unwrap(),
                &Tensor::new(&[[2u32, 3, 4, 1, 1]], &Device::Cpu).unwrap(),
            )
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();

        for (a, b) in short[0].iter().zip(&padded[0]) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }
}
