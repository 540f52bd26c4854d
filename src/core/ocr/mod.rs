pub mod corrector;
pub mod error;
pub mod recognizer;
pub mod tesseract;

pub use corrector::{
    is_mostly_dark, resolve, CorrectionRule, Corrector, DarkFrameRule, TemplateMatchRule, ALPHABET,
    SUBSTITUTIONS,
};
pub use error::{CorrectionError, OcrError};
pub use recognizer::{first_glyph, MockOcrEngine, OcrEngine, Recognizer};
pub use tesseract::{OcrConfig, TesseractCli};
