use super::accumulator::{Accumulator, DecodeReport, ExtractionStats};
use super::error::PipelineError;
use crate::core::ocr::{CorrectionError, Corrector, OcrEngine, Recognizer};
use crate::core::video::{
    DedupConfig, Frame, FrameDeduplicator, FrameSource, Sampler, SamplerConfig, VideoDecoder,
};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

/// 替换表未命中时的处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissPolicy {
    /// 记录日志并跳过该帧
    #[default]
    Skip,
    /// 终止整个解码
    Abort,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sampler: SamplerConfig,
    pub dedup: DedupConfig,
    /// 解码线程与识别线程之间的帧队列上限
    pub queue_capacity: usize,
    pub miss_policy: MissPolicy,
    /// 调试用：把识别成功的帧写成 PNG
    pub dump_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            dedup: DedupConfig::default(),
            queue_capacity: 1000,
            miss_policy: MissPolicy::Skip,
            dump_dir: None,
        }
    }
}

/// 采样 -> 去重 -> 识别 -> 纠正 -> 累加
pub struct GlyphPipeline {
    sampler: Sampler,
    deduplicator: FrameDeduplicator,
    recognizer: Recognizer,
    corrector: Corrector,
    accumulator: Accumulator,
    stats: ExtractionStats,
    config: PipelineConfig,
}

impl GlyphPipeline {
    pub fn new(engine: Box<dyn OcrEngine>, corrector: Corrector) -> Self {
        Self::with_config(engine, corrector, PipelineConfig::default())
    }

    pub fn with_config(
        engine: Box<dyn OcrEngine>,
        corrector: Corrector,
        config: PipelineConfig,
    ) -> Self {
        Self {
            sampler: Sampler::with_config(&config.sampler),
            deduplicator: FrameDeduplicator::with_config(config.dedup.clone()),
            recognizer: Recognizer::new(engine),
            corrector,
            accumulator: Accumulator::new(),
            stats: ExtractionStats::default(),
            config,
        }
    }

    /// 处理一帧，返回追加到输出的字符
    pub fn process_frame(&mut self, frame: Frame) -> Result<Option<char>, PipelineError> {
        let frame = match self.sampler.sample(frame) {
            Some(frame) => frame,
            None => return Ok(None),
        };
        self.stats.sampled_frames += 1;

        if !self.deduplicator.is_new(&frame) {
            return Ok(None);
        }
        self.stats.accepted_frames += 1;

        let recognized = match self.recognizer.recognize(&frame) {
            Some(c) => c,
            None => return Ok(None),
        };
        self.stats.recognized_frames += 1;

        let glyph = match self.corrector.correct(recognized, &frame) {
            Ok(glyph) => glyph,
            Err(CorrectionError::UnknownGlyph(c)) if self.config.miss_policy == MissPolicy::Skip => {
                warn!(
                    "⚠️ Frame #{} @ {:.3}s: no substitution for {:?}, skipped",
                    frame.frame_number,
                    frame.seconds(),
                    c
                );
                self.stats.unknown_glyphs += 1;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        debug!(
            "Frame #{} @ {:.3}s: {:?} -> {:?}",
            frame.frame_number,
            frame.seconds(),
            recognized,
            glyph
        );
        self.dump_frame(&frame);
        self.accumulator.push(glyph);
        self.stats.corrected_glyphs += 1;
        Ok(Some(glyph))
    }

    fn dump_frame(&self, frame: &Frame) {
        let Some(dir) = &self.config.dump_dir else {
            return;
        };
        let path = dir.join(format!("{}.png", self.stats.corrected_glyphs));
        let saved = frame
            .to_rgb_image()
            .map(|img| img.save(&path).map_err(|e| e.to_string()))
            .unwrap_or_else(|| Err("malformed frame buffer".to_string()));
        if let Err(e) = saved {
            debug!("Failed to dump frame to {:?}: {}", path, e);
        }
    }

    /// 在当前线程顺序处理一组帧（每次调用从干净状态开始）
    pub fn run_frames<I>(&mut self, frames: I) -> Result<DecodeReport, PipelineError>
    where
        I: IntoIterator<Item = Frame>,
    {
        self.reset();
        for frame in frames {
            self.stats.decoded_frames += 1;
            self.process_frame(frame)?;
        }
        Ok(self.report())
    }

    /// 解码线程生产帧，当前线程消费；有界队列满时生产者阻塞
    ///
    /// 每次运行前清空采样标记、去重基准和累计输出。
    pub fn run<D>(&mut self, decoder: D) -> Result<DecodeReport, PipelineError>
    where
        D: VideoDecoder + 'static,
    {
        self.reset();
        let capacity = self.config.queue_capacity.max(1);
        let (tx, rx) = mpsc::sync_channel::<Frame>(capacity);

        let producer = thread::Builder::new()
            .name("frame-source".into())
            .spawn(move || {
                let mut source = FrameSource::new(decoder);
                for frame in source.by_ref() {
                    // 接收端已关闭（消费者提前终止）
                    if tx.send(frame).is_err() {
                        break;
                    }
                }
                source.frame_count()
            })?;

        info!("🚀 GlyphPipeline: started (queue capacity {})", capacity);

        let mut outcome = Ok(());
        for frame in rx.iter() {
            if let Err(e) = self.process_frame(frame) {
                outcome = Err(e);
                break;
            }
        }
        drop(rx);

        let decoded = producer
            .join()
            .map_err(|_| PipelineError::ProducerPanicked)?;
        self.stats.decoded_frames += decoded;
        outcome?;

        let report = self.report();
        info!(
            "✅ GlyphPipeline: {} glyphs from {} decoded / {} sampled / {} accepted frames",
            report.stats.corrected_glyphs,
            report.stats.decoded_frames,
            report.stats.sampled_frames,
            report.stats.accepted_frames
        );
        Ok(report)
    }

    pub fn output(&self) -> &str {
        self.accumulator.as_str()
    }

    pub fn stats(&self) -> ExtractionStats {
        self.stats
    }

    pub fn report(&self) -> DecodeReport {
        DecodeReport::new(&self.accumulator, self.stats)
    }

    pub fn reset(&mut self) {
        self.sampler.reset();
        self.deduplicator.clear();
        self.accumulator.clear();
        self.stats = ExtractionStats::default();
    }
}
