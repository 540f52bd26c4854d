use crate::core::ocr::{CorrectionError, OcrError};
use crate::core::video::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),
    #[error("Correction error: {0}")]
    Correction(#[from] CorrectionError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Frame producer thread panicked")]
    ProducerPanicked,
}
