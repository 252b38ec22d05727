pub mod anomaly;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod frames;
pub mod outputs;
pub mod pipeline;
pub mod trend;
pub mod types;

pub use error::{PipelineError, Result};
pub use pipeline::{analyze_bytes, run_pipeline, PipelineOptions};
