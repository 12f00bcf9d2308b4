use crate::config::{Config, OcrConfig, UploadOrder};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub language: String,
    pub recognition_workers: usize,
    pub upload_order: UploadOrder,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            language: config.ocr.language.clone(),
            recognition_workers: config.ocr.recognition_workers.max(1),
            upload_order: config.pipeline.upload_order,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let ocr = OcrConfig::default();
        Self {
            language: ocr.language,
            recognition_workers: ocr.recognition_workers,
            upload_order: UploadOrder::default(),
        }
    }
}
