pub mod sentiment_analysis_pipeline;
pub mod stats;
pub mod utils;

pub use sentiment_analysis_pipeline::*;
pub use stats::BatchStats;
pub use utils::{ComputeBackend, DeviceRequest, ResolvedDevice};
