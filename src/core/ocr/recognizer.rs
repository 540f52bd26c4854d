use super::error::OcrError;
use crate::core::video::Frame;
use image::RgbImage;
use log::{debug, warn};

/// OCR 协作者
pub trait OcrEngine {
    fn recognize(&self, image: &RgbImage) -> Result<String, OcrError>;
}

impl<E: OcrEngine + ?Sized> OcrEngine for Box<E> {
    fn recognize(&self, image: &RgbImage) -> Result<String, OcrError> {
        (**self).recognize(image)
    }
}

/// 单字符识别器：只取识别结果的首个非空白字符
pub struct Recognizer {
    engine: Box<dyn OcrEngine>,
}

impl Recognizer {
    pub fn new(engine: Box<dyn OcrEngine>) -> Self {
        Self { engine }
    }

    /// 识别失败 / IO 失败 / 空文本都返回 None，不向上传播
    pub fn recognize(&self, frame: &Frame) -> Option<char> {
        let image = match frame.to_rgb_image() {
            Some(image) => image,
            None => {
                warn!("⚠️ Frame #{} has a malformed buffer", frame.frame_number);
                return None;
            }
        };

        match self.engine.recognize(&image) {
            Ok(text) => {
                let glyph = first_glyph(&text);
                if glyph.is_none() {
                    debug!("Frame #{}: no text recognized", frame.frame_number);
                }
                glyph
            }
            Err(e) => {
                debug!("Frame #{}: OCR failed: {}", frame.frame_number, e);
                None
            }
        }
    }
}

pub fn first_glyph(text: &str) -> Option<char> {
    text.chars().find(|c| !c.is_whitespace())
}

type Pattern = Box<dyn Fn(&RgbImage) -> Result<String, OcrError> + Send + Sync>;

/// 模拟 OCR 引擎，按图像内容返回文本
pub struct MockOcrEngine {
    pattern: Pattern,
}

impl MockOcrEngine {
    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&RgbImage) -> Result<String, OcrError> + Send + Sync + 'static,
    {
        Self {
            pattern: Box::new(pattern),
        }
    }

    pub fn fixed(text: &str) -> Self {
        let text = text.to_string();
        Self::with_pattern(move |_| Ok(text.clone()))
    }

    /// 以左上角像素的红色通道为键查表
    pub fn by_fill(table: Vec<(u8, &'static str)>) -> Self {
        Self::with_pattern(move |img| {
            let key = img.get_pixel(0, 0)[0];
            table
                .iter()
                .find(|(fill, _)| *fill == key)
                .map(|(_, text)| text.to_string())
                .ok_or_else(|| OcrError::Tesseract(format!("no text for fill {}", key)))
        })
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, image: &RgbImage) -> Result<String, OcrError> {
        (self.pattern)(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_frame(fill: u8) -> Frame {
        Frame::new(4, 4, vec![fill; 4 * 4 * 3], 0, 0)
    }

    #[test]
    fn test_first_glyph() {
        assert_eq!(first_glyph("AB\n"), Some('A'));
        assert_eq!(first_glyph("  \n\tW\n"), Some('W'));
        assert_eq!(first_glyph("\n \x0c"), None);
        assert_eq!(first_glyph(""), None);
    }

    #[test]
    fn test_takes_first_character() {
        let recognizer = Recognizer::new(Box::new(MockOcrEngine::fixed("XYZ\n")));
        assert_eq!(recognizer.recognize(&create_test_frame(0)), Some('X'));
    }

    #[test]
    fn test_failure_is_skipped() {
        let recognizer = Recognizer::new(Box::new(MockOcrEngine::with_pattern(|_| {
            Err(OcrError::Tesseract("unreadable".into()))
        })));
        assert_eq!(recognizer.recognize(&create_test_frame(0)), None);

        let recognizer = Recognizer::new(Box::new(MockOcrEngine::with_pattern(|_| {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "tesseract").into())
        })));
        assert_eq!(recognizer.recognize(&create_test_frame(0)), None);
    }

    #[test]
    fn test_malformed_frame_is_skipped() {
        let recognizer = Recognizer::new(Box::new(MockOcrEngine::fixed("A")));
        let frame = Frame::new(4, 4, vec![0u8; 5], 0, 0);
        assert_eq!(recognizer.recognize(&frame), None);
    }

    #[test]
    fn test_mock_by_fill() {
        let engine = MockOcrEngine::by_fill(vec![(10, "A"), (20, "'")]);
        let recognizer = Recognizer::new(Box::new(engine));
        assert_eq!(recognizer.recognize(&create_test_frame(10)), Some('A'));
        assert_eq!(recognizer.recognize(&create_test_frame(20)), Some('\''));
        assert_eq!(recognizer.recognize(&create_test_frame(30)), None);
    }
}
