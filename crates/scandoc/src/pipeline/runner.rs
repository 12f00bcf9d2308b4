use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::config::{Config, UploadOrder};
use crate::db::{document_repo, Database};
use crate::error::ProcessError;
use crate::processor::{
    aggregate, ImageExtractor, PageImage, PageImages, PdfImageExtractor, Recognizer,
    TesseractRecognizer,
};
use crate::sanitize;
use crate::storage::{self, BlobStore};

use super::config::PipelineConfig;
use super::context::{
    PipelineContext, PipelineStage, ProcessedDocument, RecognizedUnit, Submission,
};
use super::error::{PipelineError, PipelineWarning};
use super::progress::{ProgressEvent, ProgressReporter};

/// Turns one uploaded PDF into a stored document with its transcript.
///
/// Runs are independent: a single `Pipeline` can serve concurrent
/// submissions, each with its own [`PipelineContext`].
pub struct Pipeline {
    config: PipelineConfig,
    extractor: Arc<dyn ImageExtractor>,
    recognizer: Arc<dyn Recognizer>,
    store: Arc<dyn BlobStore>,
    db: Database,
}

struct Recognized {
    ordinal: usize,
    page_index: usize,
    image_index: usize,
    result: Result<String, ProcessError>,
}

impl Pipeline {
    /// Production constructor: lopdf extraction, Tesseract recognition and
    /// the blob store named in `config.storage`.
    pub fn from_config(config: &Config, db: Database) -> crate::error::Result<Self> {
        let store = storage::from_config(&config.storage)?;

        Ok(Self::new(
            PipelineConfig::from_config(config),
            Arc::new(PdfImageExtractor::new()),
            Arc::new(TesseractRecognizer::new().with_source_dpi(config.ocr.source_dpi)),
            store,
            db,
        ))
    }

    pub fn new(
        config: PipelineConfig,
        extractor: Arc<dyn ImageExtractor>,
        recognizer: Arc<dyn Recognizer>,
        store: Arc<dyn BlobStore>,
        db: Database,
    ) -> Self {
        Self {
            config,
            extractor,
            recognizer,
            store,
            db,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Runs a fresh context for `submission`.
    pub fn process(
        &self,
        submission: Submission,
        progress: &dyn ProgressReporter,
    ) -> Result<ProcessedDocument, PipelineError> {
        let mut ctx = PipelineContext::new(submission);
        self.run(&mut ctx, progress)
    }

    /// Run the full pipeline for a single submission.
    ///
    /// At most once: nothing is retried. A failure after the upload leaves
    /// the blob in place.
    pub fn run(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<ProcessedDocument, PipelineError> {
        let filename = sanitize::redact_path(Path::new(&ctx.submission.filename));
        let _pipeline_span = info_span!("pipeline",
            filename = %filename,
            size = ctx.submission.bytes.len(),
            upload_order = ?self.config.upload_order,
        )
        .entered();

        match self.run_steps(ctx, progress) {
            Ok(done) => {
                progress.report(ProgressEvent::Completed {
                    document_id: done.document_id,
                    location: done.location.clone(),
                    units: done.units.len(),
                });
                Ok(done)
            }
            Err(e) => {
                if let Some(ref location) = ctx.location {
                    warn!(
                        "Blob {} is not referenced by any document after {} failure",
                        sanitize::redact_url(location),
                        e.kind()
                    );
                }
                progress.report(ProgressEvent::Failed {
                    stage: e.stage(),
                    kind: e.kind(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn run_steps(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<ProcessedDocument, PipelineError> {
        // Received: name the object, optionally parse before anything leaves
        let object_name = {
            let _step = info_span!("receive").entered();
            self.enter(ctx, progress, PipelineStage::Received, "Document received");
            let object_name = self.step_receive(ctx)?;
            if self.config.upload_order == UploadOrder::ValidateFirst {
                self.step_parse(ctx)?;
            }
            object_name
        };

        let location = {
            let _step = info_span!("upload").entered();
            self.enter(ctx, progress, PipelineStage::Uploading, "Uploading document...");
            self.step_upload(ctx, &object_name)?
        };

        {
            let _step = info_span!("extract").entered();
            self.enter(
                ctx,
                progress,
                PipelineStage::Extracting,
                "Extracting embedded images...",
            );
            if ctx.images.is_none() {
                self.step_parse(ctx)?;
            }
        }

        {
            let _step = info_span!("recognize_all").entered();
            self.enter(
                ctx,
                progress,
                PipelineStage::Recognizing,
                "Running OCR on embedded images...",
            );
            self.step_recognize(ctx, progress);
        }

        let transcript = {
            let _step = info_span!("aggregate").entered();
            self.enter(ctx, progress, PipelineStage::Aggregating, "Building transcript...");
            self.step_aggregate(ctx)
        };

        let document_id = {
            let _step = info_span!("persist").entered();
            self.enter(ctx, progress, PipelineStage::Persisting, "Saving document...");
            self.step_persist(ctx, &location, &transcript)?
        };

        ctx.stage = PipelineStage::Completed;

        Ok(ProcessedDocument {
            document_id,
            name: ctx.submission.filename.clone(),
            location,
            transcript,
            units: ctx.units.clone(),
            warnings: ctx.warnings.clone(),
        })
    }

    fn enter(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
        stage: PipelineStage,
        message: &str,
    ) {
        ctx.stage = stage;
        progress.report(ProgressEvent::Stage {
            stage,
            message: message.to_string(),
        });
    }

    fn step_receive(&self, ctx: &mut PipelineContext) -> Result<String, PipelineError> {
        let object_name = sanitize::object_name(&ctx.submission.filename)
            .ok_or_else(|| PipelineError::InvalidFilename(ctx.submission.filename.clone()))?;
        ctx.object_name = Some(object_name.clone());
        Ok(object_name)
    }

    fn step_parse(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let stage = ctx.stage;
        let images = self
            .extractor
            .extract(&ctx.submission.bytes)
            .map_err(|source| PipelineError::MalformedInput { stage, source })?;

        debug!("Parsed PDF, {} images found", images.size_hint().0);
        ctx.images = Some(images);
        Ok(())
    }

    fn step_upload(
        &self,
        ctx: &mut PipelineContext,
        object_name: &str,
    ) -> Result<String, PipelineError> {
        let location = self.store.upload(object_name, &ctx.submission.bytes)?;

        debug!("Uploaded {} -> {}", object_name, sanitize::redact_url(&location));
        ctx.location = Some(location.clone());
        Ok(location)
    }

    fn step_recognize(&self, ctx: &mut PipelineContext, progress: &dyn ProgressReporter) {
        let Some(images) = ctx.images.take() else {
            return;
        };

        let mut recognized = self.recognize_all(images);
        recognized.sort_by_key(|r| r.ordinal);

        for unit in recognized {
            let (text, failed) = match unit.result {
                Ok(text) => (text, false),
                Err(e) => {
                    warn!(
                        "Recognition failed for page {} image {}: {}",
                        unit.page_index + 1,
                        unit.image_index + 1,
                        e
                    );
                    ctx.warnings.push(PipelineWarning::RecognitionFailed {
                        page_index: unit.page_index,
                        image_index: unit.image_index,
                        kind: e.kind(),
                        error: e.to_string(),
                    });
                    (String::new(), true)
                }
            };

            progress.report(ProgressEvent::ImageRecognized {
                page_index: unit.page_index,
                image_index: unit.image_index,
                failed,
            });
            ctx.units.push(RecognizedUnit {
                page_index: unit.page_index,
                image_index: unit.image_index,
                text,
                failed,
            });
        }
    }

    /// Recognizes every image on a pool of scoped workers. Images are pulled
    /// from the extractor on this thread as workers free up; results come
    /// back in completion order, tagged with their ordinal.
    fn recognize_all(&self, images: PageImages) -> Vec<Recognized> {
        let (expected, _) = images.size_hint();
        let workers = self.config.recognition_workers.clamp(1, expected.max(1));
        let recognizer = self.recognizer.as_ref();
        let language = self.config.language.as_str();
        let parent = tracing::Span::current();

        let (job_tx, job_rx) = crossbeam_channel::bounded::<(usize, PageImage)>(workers);
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Recognized>();

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                let parent = parent.clone();
                scope.spawn(move || {
                    for (ordinal, image) in job_rx.iter() {
                        let _span = info_span!(parent: &parent, "recognize",
                            worker,
                            page = image.page_index,
                            image = image.image_index,
                        )
                        .entered();

                        let result = recognize_contained(recognizer, &image.bytes, language);
                        let sent = done_tx.send(Recognized {
                            ordinal,
                            page_index: image.page_index,
                            image_index: image.image_index,
                            result,
                        });
                        if sent.is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(done_tx);

            for job in images.enumerate() {
                if job_tx.send(job).is_err() {
                    break;
                }
            }
            drop(job_tx);

            done_rx.iter().collect()
        })
    }

    fn step_aggregate(&self, ctx: &mut PipelineContext) -> String {
        let transcript = aggregate(ctx.units.iter().map(|unit| unit.text.as_str()));
        ctx.transcript = Some(transcript.clone());
        transcript
    }

    fn step_persist(
        &self,
        ctx: &mut PipelineContext,
        location: &str,
        transcript: &str,
    ) -> Result<i64, PipelineError> {
        let document_id =
            document_repo::save_document(&self.db, &ctx.submission.filename, location, transcript)?;

        debug!(
            "Saved document {} ({} chars of text)",
            document_id,
            transcript.chars().count()
        );
        ctx.document_id = Some(document_id);
        Ok(document_id)
    }
}

/// Runs one recognition, turning a panic inside the engine into an
/// `OcrFailed` for that image only.
fn recognize_contained(
    recognizer: &dyn Recognizer,
    image_bytes: &[u8],
    language: &str,
) -> Result<String, ProcessError> {
    panic::catch_unwind(AssertUnwindSafe(|| recognizer.recognize(image_bytes, language)))
        .unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!("Recognizer panicked: {}", message);
            Err(ProcessError::OcrFailed(format!("recognizer panicked: {}", message)))
        })
}
