use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffprobe output error: {0}")]
    StreamListing(#[from] serde_json::Error),
    #[error("No video stream in {0}")]
    NoVideoStream(String),
    #[error("Decoder process failed: {0}")]
    Process(String),
    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    TruncatedFrame { expected: usize, actual: usize },
}
