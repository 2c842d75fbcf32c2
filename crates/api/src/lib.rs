pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod retry;
pub mod routes;

pub use config::AppConfig;
pub use error::PipelineError;
pub use pipeline::{DocumentInput, GraphReport, GraphRequest, Pipeline, PipelineOutcome};
