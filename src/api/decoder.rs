//! 视频字符解码器

use crate::core::ocr::{Corrector, OcrConfig, OcrEngine, TemplateMatchRule, TesseractCli};
use crate::core::video::FfmpegDecoder;
use crate::glyph_decoder::{
    DecodeReport, ExtractionStats, GlyphPipeline, PipelineConfig, PipelineError,
};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// 解码器选项（原先硬编码的路径）
#[derive(Debug, Clone, Default)]
pub struct DecoderOptions {
    pub ocr: OcrConfig,
    /// V/W 消歧用的参考模板，加载失败时该规则关闭
    pub template_path: Option<PathBuf>,
    pub pipeline: PipelineConfig,
}

/// 视频字符解码器 - 采样 + 去重 + OCR + 纠正
///
/// ```ignore
/// let mut decoder = GlyphDecoder::create(DecoderOptions::default());
/// let report = decoder.decode_file("task.mp4")?;
/// println!("{}", report);
/// ```
pub struct GlyphDecoder {
    pipeline: GlyphPipeline,
}

impl GlyphDecoder {
    /// 使用 tesseract 命令行创建
    pub fn create(options: DecoderOptions) -> Self {
        let engine = TesseractCli::new(options.ocr.clone());
        Self::with_engine(Box::new(engine), options)
    }

    pub fn with_engine(engine: Box<dyn OcrEngine>, options: DecoderOptions) -> Self {
        let template = options.template_path.as_deref().and_then(load_template);
        let corrector = Corrector::standard(template);
        info!(
            "🎬 GlyphDecoder: created with rules {:?}",
            corrector.rule_names()
        );
        Self {
            pipeline: GlyphPipeline::with_config(engine, corrector, options.pipeline),
        }
    }

    /// 解码整个视频文件
    pub fn decode_file(&mut self, path: impl AsRef<Path>) -> Result<DecodeReport, PipelineError> {
        let decoder = FfmpegDecoder::open(path)?;
        self.pipeline.run(decoder)
    }

    pub fn stats(&self) -> ExtractionStats {
        self.pipeline.stats()
    }

    pub fn reset(&mut self) {
        self.pipeline.reset()
    }
}

fn load_template(path: &Path) -> Option<TemplateMatchRule> {
    match TemplateMatchRule::load(path) {
        Ok(rule) => Some(rule),
        Err(e) => {
            warn!("⚠️ Reference template {:?} unavailable: {}", path, e);
            None
        }
    }
}

impl Drop for GlyphDecoder {
    fn drop(&mut self) {
        info!("🗑️ GlyphDecoder: released");
    }
}
