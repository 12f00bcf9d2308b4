pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;

pub use config::PipelineConfig;
pub use context::{PipelineContext, PipelineStage, ProcessedDocument, RecognizedUnit, Submission};
pub use error::{PipelineError, PipelineWarning};
pub use progress::{LogProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::Pipeline;
