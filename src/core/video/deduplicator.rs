use super::frame::Frame;
use log::debug;
use rayon::prelude::*;

/// 像素差异度量
///
/// 单像素取三通道绝对差最大值，超过 `noise_threshold` 记为差异像素；
/// 差异像素满足 `differing * ratio_denominator < total * ratio_numerator` 时两帧视为相同。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelDiff {
    pub noise_threshold: u8,
    pub ratio_numerator: u64,
    pub ratio_denominator: u64,
}

impl Default for PixelDiff {
    fn default() -> Self {
        Self {
            noise_threshold: 15,
            ratio_numerator: 60,
            ratio_denominator: 256,
        }
    }
}

impl PixelDiff {
    /// 零容差：任一通道不同即不相同
    pub fn exact() -> Self {
        Self {
            noise_threshold: 0,
            ratio_numerator: 0,
            ratio_denominator: 1,
        }
    }

    fn is_exact(&self) -> bool {
        self.noise_threshold == 0 && self.ratio_numerator == 0
    }

    /// 差异像素数（尺寸不同返回 None）
    pub fn differing_pixels(&self, a: &Frame, b: &Frame) -> Option<u64> {
        if !a.same_dimensions(b) || a.data.len() != b.data.len() {
            return None;
        }

        let threshold = self.noise_threshold;
        let count = a
            .data
            .par_chunks(3)
            .zip(b.data.par_chunks(3))
            .filter(|(p, q)| max_channel_diff(p, q) > threshold)
            .count();
        Some(count as u64)
    }

    pub fn is_same(&self, a: &Frame, b: &Frame) -> bool {
        if self.is_exact() {
            return a.same_dimensions(b) && a.data == b.data;
        }

        match self.differing_pixels(a, b) {
            Some(differing) => {
                let total = a.pixel_count() as u64;
                differing * self.ratio_denominator < total * self.ratio_numerator
            }
            None => false,
        }
    }
}

fn max_channel_diff(p: &[u8], q: &[u8]) -> u8 {
    p.iter()
        .zip(q.iter())
        .map(|(&x, &y)| x.abs_diff(y))
        .max()
        .unwrap_or(0)
}

/// 无前驱帧时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstFramePolicy {
    /// 首帧只作为比较基准，不进入识别
    #[default]
    Suppress,
    /// 首帧直接作为新内容
    Accept,
}

#[derive(Debug, Clone, Default)]
pub struct DedupConfig {
    pub metric: PixelDiff,
    pub first_frame: FirstFramePolicy,
}

/// 去重决策结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    /// 首帧，作为基准
    Seeded { accepted: bool },
    /// 与上一接受帧不同
    Changed,
    /// 与上一接受帧相同，丢弃
    Duplicate,
}

impl DedupDecision {
    pub fn is_new(&self) -> bool {
        match self {
            DedupDecision::Seeded { accepted } => *accepted,
            DedupDecision::Changed => true,
            DedupDecision::Duplicate => false,
        }
    }
}

/// 相邻帧去重器 - 与最近一次接受的帧比较
pub struct FrameDeduplicator {
    config: DedupConfig,
    reference: Option<Frame>,
    accepted_count: usize,
}

impl FrameDeduplicator {
    pub fn new() -> Self {
        Self::with_config(DedupConfig::default())
    }

    pub fn with_config(config: DedupConfig) -> Self {
        Self {
            config,
            reference: None,
            accepted_count: 0,
        }
    }

    pub fn check(&mut self, frame: &Frame) -> DedupDecision {
        let decision = match &self.reference {
            None => DedupDecision::Seeded {
                accepted: self.config.first_frame == FirstFramePolicy::Accept,
            },
            Some(last) if self.config.metric.is_same(last, frame) => DedupDecision::Duplicate,
            Some(_) => DedupDecision::Changed,
        };

        if decision != DedupDecision::Duplicate {
            self.reference = Some(frame.clone());
        }
        if decision.is_new() {
            self.accepted_count += 1;
        }

        debug!(
            "Dedup frame #{} @ {:.3}s -> {:?}",
            frame.frame_number,
            frame.seconds(),
            decision
        );
        decision
    }

    /// 是否为新内容（会更新内部基准）
    pub fn is_new(&mut self, frame: &Frame) -> bool {
        self.check(frame).is_new()
    }

    pub fn reference(&self) -> Option<&Frame> {
        self.reference.as_ref()
    }

    pub fn len(&self) -> usize {
        self.accepted_count
    }

    pub fn is_empty(&self) -> bool {
        self.accepted_count == 0
    }

    pub fn clear(&mut self) {
        self.reference = None;
        self.accepted_count = 0;
    }
}

impl Default for FrameDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_frame(width: u32, height: u32, fill: u8) -> Frame {
        let data = vec![fill; (width * height * 3) as usize];
        Frame::new(width, height, data, 0, 0)
    }

    /// 前 n 个像素改为 fill 的帧
    fn with_changed_pixels(base: &Frame, n: usize, fill: u8) -> Frame {
        let mut frame = base.clone();
        for px in frame.data.chunks_exact_mut(3).take(n) {
            px[0] = fill;
        }
        frame
    }

    #[test]
    fn test_identical_frames_are_same() {
        let metric = PixelDiff::default();
        for fill in [0u8, 15, 128, 255] {
            let a = create_test_frame(16, 9, fill);
            let b = create_test_frame(16, 9, fill);
            assert!(metric.is_same(&a, &b));
            assert!(PixelDiff::exact().is_same(&a, &b));
        }
    }

    #[test]
    fn test_noise_below_threshold_ignored() {
        let metric = PixelDiff::default();
        let a = create_test_frame(10, 10, 100);
        let b = create_test_frame(10, 10, 115);
        assert_eq!(metric.differing_pixels(&a, &b), Some(0));
        assert!(metric.is_same(&a, &b));

        let c = create_test_frame(10, 10, 116);
        assert_eq!(metric.differing_pixels(&a, &c), Some(100));
        assert!(!metric.is_same(&a, &c));
    }

    #[test]
    fn test_area_fraction_boundary() {
        let metric = PixelDiff::default();
        // 10x10 = 100 像素: differing * 256 < 100 * 60 <=> differing <= 23
        let base = create_test_frame(10, 10, 0);
        assert!(metric.is_same(&base, &with_changed_pixels(&base, 23, 200)));
        assert!(!metric.is_same(&base, &with_changed_pixels(&base, 24, 200)));
    }

    #[test]
    fn test_exact_variant_has_zero_tolerance() {
        let base = create_test_frame(10, 10, 50);
        let one_off = with_changed_pixels(&base, 1, 51);
        assert!(!PixelDiff::exact().is_same(&base, &one_off));
        assert!(PixelDiff::default().is_same(&base, &one_off));
    }

    #[test]
    fn test_dimension_mismatch_never_same() {
        let a = create_test_frame(10, 10, 0);
        let b = create_test_frame(10, 11, 0);
        assert!(!PixelDiff::default().is_same(&a, &b));
        assert!(!PixelDiff::exact().is_same(&a, &b));
    }

    #[test]
    fn test_first_frame_suppressed_by_default() {
        // 无前驱时视为“相同”，首帧只作为基准不参与识别
        let mut dedup = FrameDeduplicator::new();
        let first = create_test_frame(8, 8, 0);
        assert_eq!(dedup.check(&first), DedupDecision::Seeded { accepted: false });
        assert!(dedup.reference().is_some());
        assert!(dedup.is_empty());

        assert!(dedup.is_new(&create_test_frame(8, 8, 255)));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_first_frame_accept_policy() {
        let mut dedup = FrameDeduplicator::with_config(DedupConfig {
            first_frame: FirstFramePolicy::Accept,
            ..Default::default()
        });
        assert!(dedup.is_new(&create_test_frame(8, 8, 0)));
        assert!(!dedup.is_new(&create_test_frame(8, 8, 0)));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_compares_against_last_accepted() {
        let mut dedup = FrameDeduplicator::with_config(DedupConfig {
            first_frame: FirstFramePolicy::Accept,
            ..Default::default()
        });
        let base = create_test_frame(10, 10, 0);
        assert!(dedup.is_new(&base));

        // 每次只变化少量像素，但相对基准的累计变化最终超过阈值
        let step1 = with_changed_pixels(&base, 15, 200);
        let step2 = with_changed_pixels(&base, 30, 200);
        assert!(!dedup.is_new(&step1));
        assert!(dedup.is_new(&step2));
        assert_eq!(dedup.reference(), Some(&step2));
    }

    #[test]
    fn test_clear() {
        let mut dedup = FrameDeduplicator::new();
        dedup.check(&create_test_frame(4, 4, 0));
        dedup.clear();
        assert!(dedup.reference().is_none());
        assert_eq!(dedup.len(), 0);
    }
}
