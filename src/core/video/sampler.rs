use super::frame::{Frame, PTS_PER_SECOND};

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// 每秒采样帧数
    pub fps: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { fps: 24 }
    }
}

impl SamplerConfig {
    /// 采样间隔（微秒）
    pub fn interval_us(&self) -> i64 {
        PTS_PER_SECOND / i64::from(self.fps.max(1))
    }
}

/// 定频采样器
///
/// 标记按固定间隔推进（而不是跳到实际帧时间戳），采样节奏锁定在网格上，
/// 帧间抖动不会累积成漂移。
pub struct Sampler {
    interval_us: i64,
    last_write_us: Option<i64>,
}

impl Sampler {
    pub fn new() -> Self {
        Self::with_config(&SamplerConfig::default())
    }

    pub fn with_config(config: &SamplerConfig) -> Self {
        Self {
            interval_us: config.interval_us(),
            last_write_us: None,
        }
    }

    pub fn interval_us(&self) -> i64 {
        self.interval_us
    }

    pub fn marker(&self) -> Option<i64> {
        self.last_write_us
    }

    /// 判断时间戳是否落入下一个采样槽，是则推进标记
    pub fn should_sample(&mut self, timestamp_us: i64) -> bool {
        let marker = *self
            .last_write_us
            .get_or_insert(timestamp_us - self.interval_us);

        if timestamp_us - marker >= self.interval_us {
            self.last_write_us = Some(marker + self.interval_us);
            true
        } else {
            false
        }
    }

    pub fn sample(&mut self, frame: Frame) -> Option<Frame> {
        if self.should_sample(frame.timestamp_us) {
            Some(frame)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.last_write_us = None;
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interval() {
        assert_eq!(Sampler::new().interval_us(), 41_666);
        assert_eq!(SamplerConfig { fps: 10 }.interval_us(), 100_000);
    }

    #[test]
    fn test_first_frame_always_sampled() {
        let mut sampler = Sampler::new();
        assert!(sampler.should_sample(123_456));
        assert_eq!(sampler.marker(), Some(123_456));

        let mut sampler = Sampler::new();
        assert!(sampler.should_sample(0));
    }

    #[test]
    fn test_skips_frames_inside_interval() {
        let mut sampler = Sampler::with_config(&SamplerConfig { fps: 10 });
        // 30fps 源，10fps 采样 -> 每 3 帧取 1 帧
        let kept: Vec<i64> = (0..9)
            .map(|i| i * 33_333)
            .filter(|&ts| sampler.should_sample(ts))
            .collect();

        assert_eq!(kept, vec![0, 133_332, 233_331]);
    }

    #[test]
    fn test_marker_advances_on_grid() {
        let mut sampler = Sampler::with_config(&SamplerConfig { fps: 10 });
        let initial = 5_000 - 100_000;
        // 带抖动的时间戳
        let timestamps = [5_000, 108_000, 205_000, 311_000, 405_000, 512_000];

        let mut emitted = 0i64;
        for ts in timestamps {
            let before = sampler.marker();
            if sampler.should_sample(ts) {
                let slot = initial + emitted * 100_000;
                assert!(ts - slot >= 100_000 || before.is_none());
                emitted += 1;
                assert_eq!(sampler.marker(), Some(initial + emitted * 100_000));
            }
        }
        assert_eq!(emitted, 6);
    }

    #[test]
    fn test_gap_is_caught_up_one_slot_at_a_time() {
        let mut sampler = Sampler::with_config(&SamplerConfig { fps: 10 });
        assert!(sampler.should_sample(0));
        // 1 秒空洞后，后续帧依次补齐网格
        assert!(sampler.should_sample(1_000_000));
        assert_eq!(sampler.marker(), Some(100_000));
        assert!(sampler.should_sample(1_000_001));
        assert_eq!(sampler.marker(), Some(200_000));
    }

    #[test]
    fn test_reset() {
        let mut sampler = Sampler::new();
        sampler.should_sample(0);
        sampler.reset();
        assert_eq!(sampler.marker(), None);
        assert!(sampler.should_sample(10));
    }
}
