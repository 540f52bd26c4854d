//! 帧源 - 包装解码器，锁定单一视频流

use super::error::DecodeError;
use super::frame::Frame;
use log::{debug, error, info, warn};

/// 解码器输出的一帧（尚未做流过滤）
#[derive(Debug, Clone)]
pub struct DecodedPicture {
    pub stream_index: usize,
    pub timestamp_us: i64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB24
}

/// 视频解码协作者
///
/// 每次调用解码下一帧；`Ok(None)` 表示流已结束。
pub trait VideoDecoder: Send {
    fn read_picture(&mut self) -> Result<Option<DecodedPicture>, DecodeError>;
}

impl<D: VideoDecoder + ?Sized> VideoDecoder for Box<D> {
    fn read_picture(&mut self) -> Result<Option<DecodedPicture>, DecodeError> {
        (**self).read_picture()
    }
}

pub struct FrameSource<D: VideoDecoder> {
    decoder: D,
    /// 首次观察到的流索引，之后只接受该流
    video_stream_index: Option<usize>,
    frame_counter: u64,
    dropped_foreign: u64,
    consecutive_errors: u32,
    max_consecutive_errors: u32,
    finished: bool,
}

impl<D: VideoDecoder> FrameSource<D> {
    pub fn new(decoder: D) -> Self {
        Self::with_error_limit(decoder, 16)
    }

    pub fn with_error_limit(decoder: D, max_consecutive_errors: u32) -> Self {
        Self {
            decoder,
            video_stream_index: None,
            frame_counter: 0,
            dropped_foreign: 0,
            consecutive_errors: 0,
            max_consecutive_errors,
            finished: false,
        }
    }

    pub fn stream_index(&self) -> Option<usize> {
        self.video_stream_index
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn dropped_foreign(&self) -> u64 {
        self.dropped_foreign
    }

    fn accept(&mut self, picture: &DecodedPicture) -> bool {
        match self.video_stream_index {
            Some(idx) => idx == picture.stream_index,
            None => {
                info!("🎞️ FrameSource: locked to stream #{}", picture.stream_index);
                self.video_stream_index = Some(picture.stream_index);
                true
            }
        }
    }
}

impl<D: VideoDecoder> Iterator for FrameSource<D> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        while !self.finished {
            match self.decoder.read_picture() {
                Ok(Some(picture)) => {
                    self.consecutive_errors = 0;
                    if !self.accept(&picture) {
                        self.dropped_foreign += 1;
                        continue;
                    }

                    let frame = Frame {
                        width: picture.width,
                        height: picture.height,
                        data: picture.data,
                        timestamp_us: picture.timestamp_us,
                        frame_number: self.frame_counter,
                        stream_index: picture.stream_index,
                    };
                    self.frame_counter += 1;
                    return Some(frame);
                }
                Ok(None) => {
                    debug!(
                        "FrameSource: end of stream after {} frames ({} foreign dropped)",
                        self.frame_counter, self.dropped_foreign
                    );
                    self.finished = true;
                }
                Err(e) => {
                    // 单帧失败不终止整个解码
                    error!("❌ Decode error at frame {}: {}", self.frame_counter, e);
                    self.consecutive_errors += 1;
                    if self.consecutive_errors >= self.max_consecutive_errors {
                        warn!(
                            "⚠️ {} consecutive decode errors, treating stream as exhausted",
                            self.consecutive_errors
                        );
                        self.finished = true;
                    }
                }
            }
        }
        None
    }
}

/// 脚本化的解码器，用于测试
pub struct MockDecoder {
    script: std::collections::VecDeque<Result<Option<DecodedPicture>, DecodeError>>,
}

impl MockDecoder {
    pub fn new() -> Self {
        Self {
            script: std::collections::VecDeque::new(),
        }
    }

    pub fn with_pictures(pictures: Vec<DecodedPicture>) -> Self {
        let mut decoder = Self::new();
        for picture in pictures {
            decoder = decoder.push(picture);
        }
        decoder
    }

    pub fn push(mut self, picture: DecodedPicture) -> Self {
        self.script.push_back(Ok(Some(picture)));
        self
    }

    pub fn push_error(mut self, error: DecodeError) -> Self {
        self.script.push_back(Err(error));
        self
    }
}

impl Default for MockDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoDecoder for MockDecoder {
    fn read_picture(&mut self) -> Result<Option<DecodedPicture>, DecodeError> {
        self.script.pop_front().unwrap_or(Ok(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picture(stream_index: usize, timestamp_us: i64, fill: u8) -> DecodedPicture {
        DecodedPicture {
            stream_index,
            timestamp_us,
            width: 4,
            height: 4,
            data: vec![fill; 4 * 4 * 3],
        }
    }

    #[test]
    fn test_locks_first_stream() {
        let decoder = MockDecoder::with_pictures(vec![
            picture(1, 0, 10),
            picture(0, 10, 20),
            picture(1, 20, 30),
            picture(2, 30, 40),
        ]);
        let mut source = FrameSource::new(decoder);
        let frames: Vec<Frame> = source.by_ref().collect();

        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.stream_index == 1));
        assert_eq!(frames[1].frame_number, 1);
        assert_eq!(frames[1].timestamp_us, 20);
        assert_eq!(source.stream_index(), Some(1));
        assert_eq!(source.dropped_foreign(), 2);
    }

    #[test]
    fn test_decode_error_is_swallowed() {
        let decoder = MockDecoder::new()
            .push(picture(0, 0, 0))
            .push_error(DecodeError::Process("corrupt packet".into()))
            .push(picture(0, 10, 0));
        let frames: Vec<Frame> = FrameSource::new(decoder).collect();

        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_error_limit_ends_stream() {
        let mut decoder = MockDecoder::new();
        for _ in 0..3 {
            decoder = decoder.push_error(DecodeError::Process("boom".into()));
        }
        let decoder = decoder.push(picture(0, 0, 0));
        let frames: Vec<Frame> = FrameSource::with_error_limit(decoder, 3).collect();

        assert!(frames.is_empty());
    }

    #[test]
    fn test_empty_stream() {
        let mut source = FrameSource::new(MockDecoder::new());
        assert!(source.next().is_none());
        assert!(source.next().is_none());
        assert_eq!(source.stream_index(), None);
    }
}
