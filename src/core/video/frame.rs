use image::RgbImage;

/// 每秒的时间戳单位数（微秒）
pub const PTS_PER_SECOND: i64 = 1_000_000;

/// 帧数据结构
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB24 格式
    pub timestamp_us: i64,
    pub frame_number: u64,
    pub stream_index: usize,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_us: i64,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp_us,
            frame_number,
            stream_index: 0,
        }
    }

    pub fn from_image(image: RgbImage, timestamp_us: i64, frame_number: u64) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw(), timestamp_us, frame_number)
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    pub fn seconds(&self) -> f64 {
        self.timestamp_us as f64 / PTS_PER_SECOND as f64
    }

    pub fn same_dimensions(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// 转换为 image crate 的 RgbImage（缓冲区长度不匹配时返回 None）
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}
