pub mod deduplicator;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod sampler;
pub mod source;

pub use deduplicator::{DedupConfig, DedupDecision, FirstFramePolicy, FrameDeduplicator, PixelDiff};
pub use error::DecodeError;
pub use ffmpeg::{FfmpegDecoder, StreamInfo};
pub use frame::{Frame, PTS_PER_SECOND};
pub use sampler::{Sampler, SamplerConfig};
pub use source::{DecodedPicture, FrameSource, MockDecoder, VideoDecoder};
