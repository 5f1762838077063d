pub mod aggregator;
pub mod config;
pub mod error;
pub mod invoker;
pub mod locator;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod publisher;
pub mod render;
pub mod runtime;

pub use aggregator::{FoldOutcome, ResultAggregator};
pub use config::Config;
pub use error::ScanError;
pub use invoker::{InvokerSettings, ScanInvoker};
pub use model::{ManifestRecord, RunSummary, RuntimeVariantGroup, ScanMode, ScanOutcome};
pub use orchestrator::ScanRun;
pub use runtime::{ContainerRuntime, DockerEngine};
