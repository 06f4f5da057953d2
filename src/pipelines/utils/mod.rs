use candle_core::{DType, Device};
use tracing::{info, warn};

/// Compute strategy fixed once when the model session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeBackend {
    /// CUDA or Metal, with half-precision weights.
    Accelerated,
    /// CPU, full precision.
    Standard,
}

impl ComputeBackend {
    /// Precision the weights are loaded in.
    pub fn dtype(self) -> DType {
        match self {
            ComputeBackend::Accelerated => DType::F16,
            ComputeBackend::Standard => DType::F32,
        }
    }
}

/// A device together with the backend it was resolved to.
#[derive(Debug, Clone)]
pub struct ResolvedDevice {
    pub backend: ComputeBackend,
    pub device: Device,
}

impl ResolvedDevice {
    pub fn cpu() -> Self {
        Self {
            backend: ComputeBackend::Standard,
            device: Device::Cpu,
        }
    }
}

/// Request for a specific device, used by pipeline builders.
#[derive(Clone, Debug, Default)]
pub enum DeviceRequest {
    /// Use CUDA or Metal if available, otherwise CPU (default behavior).
    #[default]
    Accelerated,
    /// Force CPU even if an accelerator is available.
    Cpu,
    /// Provide an already constructed device.
    Explicit(Device),
}

impl DeviceRequest {
    pub fn from_preference(use_accelerated_device: bool) -> Self {
        if use_accelerated_device {
            DeviceRequest::Accelerated
        } else {
            DeviceRequest::Cpu
        }
    }

    /// Resolve the request into an actual [`Device`].
    ///
    /// Never fails: an unavailable accelerator degrades to the CPU.
    pub fn resolve(self) -> ResolvedDevice {
        match self {
            DeviceRequest::Accelerated => match accelerated_device() {
                Some(device) => ResolvedDevice {
                    backend: ComputeBackend::Accelerated,
                    device,
                },
                None => {
                    warn!("no accelerated device available, falling back to CPU");
                    ResolvedDevice::cpu()
                }
            },
            DeviceRequest::Cpu => ResolvedDevice::cpu(),
            DeviceRequest::Explicit(device) => {
                let backend = if device.is_cpu() {
                    ComputeBackend::Standard
                } else {
                    ComputeBackend::Accelerated
                };
                ResolvedDevice { backend, device }
            }
        }
    }
}

fn accelerated_device() -> Option<Device> {
    if candle_core::utils::cuda_is_available() {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("using CUDA device 0");
                return Some(device);
            }
            Err(e) => warn!(error = %e, "CUDA device unavailable"),
        }
    }

    if candle_core::utils::metal_is_available() {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("using Metal device 0");
                return Some(device);
            }
            Err(e) => warn!(error = %e, "Metal device unavailable"),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_request_is_standard_f32() {
        let resolved = DeviceRequest::Cpu.resolve();
        assert_eq!(resolved.backend, ComputeBackend::Standard);
        assert!(resolved.device.is_cpu());
        assert_eq!(resolved.backend.dtype(), DType::F32);
    }

    #[test]
    fn explicit_cpu_device_maps_to_standard() {
        let resolved = DeviceRequest::Explicit(Device::Cpu).resolve();
        assert_eq!(resolved.backend, ComputeBackend::Standard);
    }

    #[test]
    fn accelerated_request_always_resolves() {
        let resolved = DeviceRequest::from_preference(true).resolve();
        match resolved.backend {
            ComputeBackend::Accelerated => assert!(!resolved.device.is_cpu()),
            ComputeBackend::Standard => assert!(resolved.device.is_cpu()),
        }
    }
}
