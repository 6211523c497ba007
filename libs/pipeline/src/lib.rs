pub mod batch;
pub mod config;
pub mod error;
pub mod resolve;
pub mod segment;
mod writer;

pub use batch::BatchBuilder;
pub use config::{BatchConfig, RetryPolicy};
pub use error::PipelineError;
pub use resolve::{DestinationSpec, resolve_destination};
pub use segment::RecordReader;
pub use writer::{BatchWriter, Phase, WriteSummary};
