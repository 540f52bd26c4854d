use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use vidglyph::api::{DecoderOptions, GlyphDecoder};
use vidglyph::core::ocr::OcrConfig;
use vidglyph::core::video::{DedupConfig, FirstFramePolicy, PixelDiff, SamplerConfig};
use vidglyph::glyph_decoder::{MissPolicy, PipelineConfig};

/// Decode a message spelled out one glyph per frame in a video.
#[derive(Parser, Debug)]
#[command(name = "vidglyph")]
struct Args {
    /// Input video file
    #[arg(default_value = "task.mp4")]
    video: PathBuf,

    /// Tesseract recognition-data directory
    #[arg(long, default_value = "tessdata")]
    tessdata: PathBuf,

    /// Tesseract language
    #[arg(long, default_value = "eng")]
    lang: String,

    /// Tesseract page segmentation mode
    #[arg(long, default_value_t = 10)]
    psm: u8,

    /// Let tesseract pick its own page segmentation mode
    #[arg(long)]
    psm_default: bool,

    /// Reference image for the V/W template check
    #[arg(long)]
    template: Option<PathBuf>,

    /// Sampling rate in frames per second
    #[arg(long, default_value_t = 24)]
    fps: u32,

    /// Per-channel difference at or below which pixels count as unchanged
    #[arg(long, default_value_t = 15)]
    noise_threshold: u8,

    /// OCR the first sampled frame instead of using it only as the baseline
    #[arg(long)]
    accept_first_frame: bool,

    /// Abort on a glyph outside the alphabet and substitution table
    #[arg(long)]
    strict: bool,

    /// Maximum number of decoded frames waiting for OCR
    #[arg(long, default_value_t = 1000)]
    queue_capacity: usize,

    /// Write every recognized frame here as <n>.png
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn options(&self) -> DecoderOptions {
        DecoderOptions {
            ocr: OcrConfig {
                tessdata_dir: self.tessdata.clone(),
                language: self.lang.clone(),
                page_seg_mode: (!self.psm_default).then_some(self.psm),
                ..Default::default()
            },
            template_path: self.template.clone(),
            pipeline: PipelineConfig {
                sampler: SamplerConfig { fps: self.fps },
                dedup: DedupConfig {
                    metric: PixelDiff {
                        noise_threshold: self.noise_threshold,
                        ..Default::default()
                    },
                    first_frame: if self.accept_first_frame {
                        FirstFramePolicy::Accept
                    } else {
                        FirstFramePolicy::Suppress
                    },
                },
                queue_capacity: self.queue_capacity,
                miss_policy: if self.strict {
                    MissPolicy::Abort
                } else {
                    MissPolicy::Skip
                },
                dump_dir: self.dump_dir.clone(),
            },
        }
    }
}

fn main() -> Result<()> {
    vidglyph::init_logging();
    let args = Args::parse();
    info!("Decoding {:?}", args.video);

    if let Some(dir) = &args.dump_dir {
        let _ = std::fs::create_dir_all(dir);
    }

    let mut decoder = GlyphDecoder::create(args.options());
    let report = decoder
        .decode_file(&args.video)
        .with_context(|| format!("failed to decode {}", args.video.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
