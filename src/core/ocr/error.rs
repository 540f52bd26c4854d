use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid frame buffer")]
    InvalidFrame,
    #[error("Tesseract error: {0}")]
    Tesseract(String),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionError {
    #[error("No substitution for glyph {0:?}")]
    UnknownGlyph(char),
}
