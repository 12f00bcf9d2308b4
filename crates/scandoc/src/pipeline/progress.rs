use crate::error::ErrorKind;

use super::context::PipelineStage;

/// Events emitted by the pipeline during a run.
/// Recognized text is omitted (can be large).
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Stage {
        stage: PipelineStage,
        message: String,
    },
    ImageRecognized {
        page_index: usize,
        image_index: usize,
        failed: bool,
    },
    Completed {
        document_id: i64,
        location: String,
        units: usize,
    },
    Failed {
        stage: PipelineStage,
        kind: ErrorKind,
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes every event to the tracing log.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Stage { stage, message } => {
                tracing::info!(stage = %stage, "{}", message);
            }
            ProgressEvent::ImageRecognized {
                page_index,
                image_index,
                failed,
            } => {
                tracing::debug!(page = page_index, image = image_index, failed, "image recognized");
            }
            ProgressEvent::Completed {
                document_id,
                location,
                units,
            } => {
                tracing::info!(
                    document_id,
                    units,
                    "Stored document at {}",
                    crate::sanitize::redact_url(&location)
                );
            }
            ProgressEvent::Failed { stage, kind, error } => {
                tracing::error!(stage = %stage, kind = %kind, "Pipeline failed: {}", error);
            }
        }
    }
}
