//! Model and tokenizer loading utilities for Hugging Face Hub integration.
//!
//! This module resolves the files a sentiment classifier needs, either from a
//! Hugging Face repository (downloaded into the local hub cache) or from a
//! local directory holding the same files:
//! - Model configuration (`config.json`)
//! - Weights (`model.safetensors`, falling back to `pytorch_model.bin`)
//! - Tokenizer (`tokenizer.json`, or a byte-level BPE assembled from
//!   `vocab.json` + `merges.txt`)
//!
//! ## Main Types
//!
//! - [`HfLoader`] - Generic file loader with retry logic
//! - [`TokenizerLoader`] - Loads or assembles the tokenizer
//! - [`WeightsLoader`] - Locates the weight file
//! - [`ConfigLoader`] - Reads and deserializes `config.json`

use std::path::{Path, PathBuf};
use std::time::Duration;

use hf_hub::api::sync::Api as HfApi;
use hf_hub::{Repo, RepoType};
use serde::de::DeserializeOwned;
use tokenizers::pre_tokenizers::byte_level::ByteLevel;
use tokenizers::models::bpe::BPE;
use tokenizers::processors::roberta::RobertaProcessing;
use tokenizers::Tokenizer;
use tracing::debug;

const MAX_RETRIES: u32 = 3;

/// Kinds of weight files, in order of preference.
const WEIGHT_FILES: [&str; 2] = ["model.safetensors", "pytorch_model.bin"];

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub revision: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, revision: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            revision: revision.into(),
            filename: filename.into(),
        }
    }

    /// Resolve the file to a local path, downloading it if needed.
    ///
    /// When `repo` names an existing directory the file is looked up there
    /// and nothing is downloaded.
    pub fn load(&self) -> anyhow::Result<PathBuf> {
        let local_dir = Path::new(&self.repo);
        if local_dir.is_dir() {
            let path = local_dir.join(&self.filename);
            if path.is_file() {
                return Ok(path);
            }
            anyhow::bail!("{} not found in {}", self.filename, local_dir.display());
        }

        let hf_api = HfApi::new()?;
        let hf_repo = hf_api.repo(Repo::with_revision(
            self.repo.clone(),
            RepoType::Model,
            self.revision.clone(),
        ));

        // Retry logic for lock acquisition failures
        let mut attempt = 0;
        loop {
            match hf_repo.get(self.filename.as_str()) {
                Ok(path) => return Ok(path),
                Err(e) => {
                    let error_msg = e.to_string();
                    if error_msg.contains("Lock acquisition failed") && attempt + 1 < MAX_RETRIES {
                        let wait_time = Duration::from_millis(100 * (1 << attempt));
                        debug!(file = %self.filename, attempt, "hub cache locked, retrying");
                        std::thread::sleep(wait_time);
                        attempt += 1;
                        continue;
                    }
                    return Err(anyhow::anyhow!(
                        "failed to fetch {} from {}@{}: {e}",
                        self.filename,
                        self.repo,
                        self.revision
                    ));
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenizerLoader {
    pub repo: String,
    pub revision: String,
}

impl TokenizerLoader {
    pub fn new(repo: &str, revision: &str) -> Self {
        Self {
            repo: repo.into(),
            revision: revision.into(),
        }
    }

    /// Load `tokenizer.json`, or assemble a RoBERTa tokenizer from
    /// `vocab.json` and `merges.txt` when the repository ships only those.
    pub fn load(&self) -> anyhow::Result<Tokenizer> {
        let file = |name: &str| HfLoader::new(&self.repo, &self.revision, name).load();

        if let Ok(path) = file("tokenizer.json") {
            return Tokenizer::from_file(path).map_err(anyhow::Error::msg);
        }

        let vocab = file("vocab.json")?;
        let merges = file("merges.txt")?;
        debug!(repo = %self.repo, "assembling byte-level BPE tokenizer from vocab and merges");
        roberta_bpe_tokenizer(&vocab, &merges)
    }
}

/// Byte-level BPE with `<s> … </s>` framing, as RoBERTa checkpoints expect.
pub fn roberta_bpe_tokenizer(vocab: &Path, merges: &Path) -> anyhow::Result<Tokenizer> {
    let bpe = BPE::from_file(&vocab.to_string_lossy(), &merges.to_string_lossy())
        .build()
        .map_err(anyhow::Error::msg)?;

    let mut tokenizer = Tokenizer::new(bpe);
    let bos = special_id(&tokenizer, "<s>")?;
    let eos = special_id(&tokenizer, "</s>")?;

    tokenizer
        .with_pre_tokenizer(Some(ByteLevel::default().add_prefix_space(false)))
        .with_post_processor(Some(
            RobertaProcessing::new(("</s>".to_string(), eos), ("<s>".to_string(), bos))
                .add_prefix_space(false),
        ))
        .with_decoder(Some(ByteLevel::default()));

    Ok(tokenizer)
}

fn special_id(tokenizer: &Tokenizer, token: &str) -> anyhow::Result<u32> {
    tokenizer
        .token_to_id(token)
        .ok_or_else(|| anyhow::anyhow!("special token {token} missing from vocabulary"))
}

#[derive(Debug, Clone)]
pub struct WeightsLoader {
    pub repo: String,
    pub revision: String,
}

impl WeightsLoader {
    pub fn new(repo: &str, revision: &str) -> Self {
        Self {
            repo: repo.into(),
            revision: revision.into(),
        }
    }

    /// Path to the weight file, preferring safetensors over a pickled state dict.
    pub fn load(&self) -> anyhow::Result<PathBuf> {
        let mut errors = Vec::new();
        for name in WEIGHT_FILES {
            match HfLoader::new(&self.repo, &self.revision, name).load() {
                Ok(path) => return Ok(path),
                Err(e) => errors.push(e.to_string()),
            }
        }
        anyhow::bail!(
            "Model weights not found in repo. Expected `model.safetensors` or `pytorch_model.bin`. Errors: {}",
            errors.join("; ")
        )
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub config_file_loader: HfLoader,
}

impl ConfigLoader {
    pub fn new(repo: &str, revision: &str) -> Self {
        Self {
            config_file_loader: HfLoader::new(repo, revision, "config.json"),
        }
    }

    pub fn load<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let path = self.config_file_loader.load()?;
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {path:?}: {e}"))?;
        serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse model config {path:?}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_bpe(dir: &Path) {
        let vocab = r#"{"<s>":0,"<pad>":1,"</s>":2,"<unk>":3,"g":4,"o":5,"d":6,"go":7,"od":8,"good":9,"Ġ":10,"Ġgood":11}"#;
        fs::write(dir.join("vocab.json"), vocab).unwrap();
        fs::write(dir.join("merges.txt"), "#version: 0.2\ng o\no d\ngo od\nĠ good\n").unwrap();
    }

    #[test]
    fn local_directory_is_used_without_download() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"hidden_size": 8}"#).unwrap();

        let repo = dir.path().to_string_lossy().to_string();
        let path = HfLoader::new(&repo, "main", "config.json").load().unwrap();
        assert_eq!(path, dir.path().join("config.json"));

        let missing = HfLoader::new(&repo, "main", "model.safetensors").load();
        assert!(missing.is_err());
    }

    #[test]
    fn config_loader_deserializes_json() {
        #[derive(serde::Deserialize)]
        struct Partial {
            hidden_size: usize,
        }

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"hidden_size": 8, "extra": true}"#).unwrap();
        let repo = dir.path().to_string_lossy().to_string();

        let config: Partial = ConfigLoader::new(&repo, "main").load().unwrap();
        assert_eq!(config.hidden_size, 8);
    }

    #[test]
    fn weights_loader_falls_back_to_pytorch_bin() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pytorch_model.bin"), b"").unwrap();
        let repo = dir.path().to_string_lossy().to_string();

        let path = WeightsLoader::new(&repo, "main").load().unwrap();
        assert_eq!(path.file_name().unwrap(), "pytorch_model.bin");

        fs::write(dir.path().join("model.safetensors"), b"").unwrap();
        let path = WeightsLoader::new(&repo, "main").load().unwrap();
        assert_eq!(path.file_name().unwrap(), "model.safetensors");
    }

    #[test]
    fn weights_loader_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().to_string_lossy().to_string();
        let err = WeightsLoader::new(&repo, "main").load().unwrap_err();
        assert!(err.to_string().contains("Model weights not found"));
    }

    #[test]
    fn assembled_tokenizer_frames_with_special_tokens() {
        let dir = tempfile::tempdir().unwrap();
        write_bpe(dir.path());
        let repo = dir.path().to_string_lossy().to_string();

        let tokenizer = TokenizerLoader::new(&repo, "main").load().unwrap();
        let encoding = tokenizer.encode("good", true).unwrap();
        assert_eq!(encoding.get_ids(), &[0, 9, 2]);

        let empty = tokenizer.encode("", true).unwrap();
        assert_eq!(empty.get_ids(), &[0, 2]);
    }
}
