//! 识别结果纠正 - 字母表校验、替换表、像素特征消歧

use super::error::CorrectionError;
use crate::core::video::{Frame, PixelDiff};
use log::{debug, info};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// 合法输出字符
pub static ALPHABET: Lazy<BTreeSet<char>> = Lazy::new(|| {
    [
        'U', 'T', 'A', 'W', 'Y', 'R', 'B', 'O', 'G', 'M', 'I', 'V', 'X', 'D',
    ]
    .into_iter()
    .collect()
});

/// OCR 常见误读 -> 字母表字符
pub static SUBSTITUTIONS: Lazy<HashMap<char, char>> = Lazy::new(|| {
    HashMap::from([
        ('\'', 'V'),
        (')', 'B'),
        ('N', 'W'),
        ('o', 'O'),
        ('0', 'O'),
        ('4', 'W'),
        ('9', 'O'),
        ('y', 'A'),
        ('\\', 'W'),
        ('|', 'I'),
    ])
});

pub fn in_alphabet(c: char) -> bool {
    ALPHABET.contains(&c)
}

/// 步骤 1-2：字母表内保留，否则查替换表
pub fn resolve(c: char) -> Result<char, CorrectionError> {
    if in_alphabet(c) {
        return Ok(c);
    }
    SUBSTITUTIONS
        .get(&c)
        .copied()
        .ok_or(CorrectionError::UnknownGlyph(c))
}

/// 消歧规则：根据帧像素特征改写已解析的字符
pub trait CorrectionRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, glyph: char, frame: &Frame) -> char;
}

/// 暗像素占比是否超过 `min_fraction`（像素三通道最大值低于 `dark_level` 记为暗）
pub fn is_mostly_dark(frame: &Frame, dark_level: u8, min_fraction: f64) -> bool {
    let total = frame.pixel_count();
    if total == 0 {
        return false;
    }
    let dark = frame
        .data
        .par_chunks_exact(3)
        .filter(|px| px.iter().copied().max().unwrap_or(0) < dark_level)
        .count();
    dark as f64 > min_fraction * total as f64
}

/// 暗帧上的 Y 实际是 V
pub struct DarkFrameRule {
    pub from: char,
    pub to: char,
    pub dark_level: u8,
    pub min_fraction: f64,
}

impl Default for DarkFrameRule {
    fn default() -> Self {
        Self {
            from: 'Y',
            to: 'V',
            dark_level: 100,
            min_fraction: 0.7,
        }
    }
}

impl CorrectionRule for DarkFrameRule {
    fn name(&self) -> &'static str {
        "dark-frame"
    }

    fn apply(&self, glyph: char, frame: &Frame) -> char {
        if glyph == self.from && is_mostly_dark(frame, self.dark_level, self.min_fraction) {
            self.to
        } else {
            glyph
        }
    }
}

/// 与参考模板逐像素相同的 V 实际是 W
pub struct TemplateMatchRule {
    pub from: char,
    pub to: char,
    template: Frame,
}

impl TemplateMatchRule {
    pub fn new(template: Frame) -> Self {
        Self {
            from: 'V',
            to: 'W',
            template,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, image::ImageError> {
        let image = image::open(path.as_ref())?.to_rgb8();
        info!(
            "🖼️ Loaded reference template {:?} ({}x{})",
            path.as_ref(),
            image.width(),
            image.height()
        );
        Ok(Self::new(Frame::from_image(image, 0, 0)))
    }

    pub fn template(&self) -> &Frame {
        &self.template
    }
}

impl CorrectionRule for TemplateMatchRule {
    fn name(&self) -> &'static str {
        "template-match"
    }

    fn apply(&self, glyph: char, frame: &Frame) -> char {
        if glyph == self.from && PixelDiff::exact().is_same(&self.template, frame) {
            self.to
        } else {
            glyph
        }
    }
}

/// 纠正器，无内部可变状态
pub struct Corrector {
    rules: Vec<Box<dyn CorrectionRule>>,
}

impl Corrector {
    /// 只做字母表 / 替换表解析
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// 暗帧规则 + 可选模板规则
    pub fn standard(template: Option<TemplateMatchRule>) -> Self {
        let mut corrector = Self::new().with_rule(DarkFrameRule::default());
        if let Some(rule) = template {
            corrector = corrector.with_rule(rule);
        }
        corrector
    }

    pub fn with_rule(mut self, rule: impl CorrectionRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn correct(&self, recognized: char, frame: &Frame) -> Result<char, CorrectionError> {
        let resolved = resolve(recognized)?;
        let corrected = self.rules.iter().fold(resolved, |glyph, rule| {
            let next = rule.apply(glyph, frame);
            if next != glyph {
                debug!(
                    "Frame #{}: {} rule {:?} -> {:?}",
                    frame.frame_number,
                    rule.name(),
                    glyph,
                    next
                );
            }
            next
        });
        Ok(corrected)
    }
}

impl Default for Corrector {
    fn default() -> Self {
        Self::standard(None)
    }
}
