//! 字符解码流水线 - 从视频帧中逐帧读出单个字符
//!
//! 流程：
//! 1. 定频采样 - 按固定网格挑选帧
//! 2. 帧去重 - 像素差异低于阈值的相邻帧只识别一次
//! 3. OCR - 取识别结果首字符
//! 4. 纠正 - 替换表 + 暗帧 / 模板消歧规则

pub mod accumulator;
pub mod error;
pub mod pipeline;

pub use accumulator::{histogram, Accumulator, DecodeReport, ExtractionStats};
pub use error::PipelineError;
pub use pipeline::{GlyphPipeline, MissPolicy, PipelineConfig};
