//! Lazily-initialized model session.
//!
//! A [`LazySession`] owns exactly one model instance. The first call to
//! [`LazySession::acquire`] resolves the compute device and loads the weights;
//! every later call hands back the same instance. The session is created by
//! the caller and injected into the pipeline, so its lifetime is explicit and
//! tests can substitute a pre-built model.

use once_cell::sync::OnceCell;
use tracing::info;

use super::error::{Result, SentimentError};
use crate::pipelines::sentiment_analysis_pipeline::SentimentAnalysisModel;
use crate::pipelines::utils::{ComputeBackend, DeviceRequest};

/// Trait implemented by model option types to describe what gets loaded.
pub trait ModelOptions {
    /// Stable, human-readable identifier used in logs and errors.
    fn model_key(&self) -> String;
}

pub struct LazySession<M: SentimentAnalysisModel> {
    options: M::Options,
    device_request: DeviceRequest,
    model: OnceCell<M>,
}

impl<M: SentimentAnalysisModel> LazySession<M> {
    /// Create an empty session. Nothing is loaded until [`acquire`](Self::acquire).
    pub fn new(options: M::Options, device_request: DeviceRequest) -> Self {
        Self {
            options,
            device_request,
            model: OnceCell::new(),
        }
    }

    /// Wrap an already loaded model.
    pub fn with_model(options: M::Options, model: M) -> Self {
        let device_request = DeviceRequest::Explicit(model.device().clone());
        Self {
            options,
            device_request,
            model: OnceCell::with_value(model),
        }
    }

    /// Return the model, loading it on first use.
    ///
    /// A failed load leaves the session empty, so no half-initialized model
    /// is ever handed out.
    pub fn acquire(&self) -> Result<&M>
    where
        M::Options: ModelOptions,
    {
        self.model.get_or_try_init(|| {
            let resolved = self.device_request.clone().resolve();
            let key = self.options.model_key();
            info!(model = %key, backend = ?resolved.backend, "loading sentiment model");

            M::load(self.options.clone(), &resolved).map_err(|e| SentimentError::ModelLoad {
                model: key,
                reason: format!("{e:#}"),
            })
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// Backend of the loaded model, `None` before the first `acquire`.
    pub fn backend(&self) -> Option<ComputeBackend> {
        self.model.get().map(|m| m.backend())
    }

    pub fn options(&self) -> &M::Options {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::utils::ResolvedDevice;
    use candle_core::{Device, Tensor};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static LOADS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, Clone)]
    struct Flaky {
        fail: bool,
    }

    impl ModelOptions for Flaky {
        fn model_key(&self) -> String {
            "flaky".into()
        }
    }

    struct CountingModel {
        device: Device,
    }

    impl SentimentAnalysisModel for CountingModel {
        type Options = Flaky;

        fn load(options: Flaky, _device: &ResolvedDevice) -> anyhow::Result<Self> {
            if options.fail {
                anyhow::bail!("weights not found");
            }
            LOADS.fetch_add(1, Ordering::SeqCst);
            Ok(CountingModel {
                device: Device::Cpu,
            })
        }

        fn logits(&self, texts: &[&str], _max_length: usize) -> anyhow::Result<Tensor> {
            Ok(Tensor::zeros((texts.len(), 3), candle_core::DType::F32, &Device::Cpu)?)
        }

        fn backend(&self) -> ComputeBackend {
            ComputeBackend::Standard
        }

        fn device(&self) -> &Device {
            &self.device
        }
    }

    #[test]
    fn loads_once_and_reuses_the_instance() {
        let session = LazySession::<CountingModel>::new(Flaky { fail: false }, DeviceRequest::Cpu);
        assert!(!session.is_loaded());
        assert_eq!(session.backend(), None);

        let before = LOADS.load(Ordering::SeqCst);
        let first = session.acquire().unwrap() as *const CountingModel;
        let second = session.acquire().unwrap() as *const CountingModel;

        assert_eq!(first, second);
        assert_eq!(LOADS.load(Ordering::SeqCst), before + 1);
        assert_eq!(session.backend(), Some(ComputeBackend::Standard));
    }

    #[test]
    fn failed_load_leaves_session_empty() {
        let session = LazySession::<CountingModel>::new(Flaky { fail: true }, DeviceRequest::Cpu);
        let err = session.acquire().err().unwrap();

        assert!(matches!(err, SentimentError::ModelLoad { ref model, .. } if model == "flaky"));
        assert!(err.to_string().contains("weights not found"));
        assert!(!session.is_loaded());
    }

    #[test]
    fn with_model_is_already_loaded() {
        let session = LazySession::with_model(
            Flaky { fail: true },
            CountingModel {
                device: Device::Cpu,
            },
        );
        assert!(session.is_loaded());
        assert!(session.acquire().is_ok());
    }
}
