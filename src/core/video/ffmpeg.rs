//! ffmpeg 子进程解码器
//!
//! ffprobe 读取首个视频流的索引和尺寸，ffmpeg 以 rawvideo/rgb24 输出到 stdout，
//! 时间戳来自 stderr 上 showinfo 滤镜的 `pts_time` 字段。

use super::error::DecodeError;
use super::frame::PTS_PER_SECOND;
use super::source::{DecodedPicture, VideoDecoder};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

static SHOWINFO_PTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"Parsed_showinfo.*\bn:\s*\d+\s+pts:\s*(?:-?\d+|NOPTS)\s+pts_time:\s*(-?[0-9.]+|NOPTS)",
    )
        .expect("valid showinfo regex")
});

#[derive(Debug, Deserialize)]
struct StreamListing {
    #[serde(default)]
    streams: Vec<StreamEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamEntry {
    index: usize,
    width: u32,
    height: u32,
    #[serde(default)]
    r_frame_rate: Option<String>,
}

/// 探测到的视频流信息
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

impl StreamInfo {
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    fn fallback_timestamp_us(&self, frame_number: u64) -> i64 {
        (frame_number as f64 / self.frame_rate * PTS_PER_SECOND as f64).round() as i64
    }
}

fn parse_frame_rate(rate: Option<&str>) -> f64 {
    let parsed = rate.and_then(|r| match r.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => r.trim().parse().ok(),
    });

    match parsed {
        Some(fps) if fps > 0.0 => fps,
        _ => 25.0,
    }
}

fn parse_stream_listing(json: &str, path: &Path) -> Result<StreamInfo, DecodeError> {
    let output: StreamListing = serde_json::from_str(json)?;
    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| DecodeError::NoVideoStream(path.display().to_string()))?;

    Ok(StreamInfo {
        index: stream.index,
        width: stream.width,
        height: stream.height,
        frame_rate: parse_frame_rate(stream.r_frame_rate.as_deref()),
    })
}

/// 从 showinfo 日志行中提取时间戳（微秒）
///
/// 外层 `None` 表示不是帧信息行；`Some(None)` 表示该帧没有 pts（NOPTS），
/// 仍占用一个时间戳槽位，由调用方按帧率推算。
fn parse_showinfo_pts(line: &str) -> Option<Option<i64>> {
    let caps = SHOWINFO_PTS.captures(line)?;
    let seconds = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|s| (s * PTS_PER_SECOND as f64).round() as i64);
    Some(seconds)
}

pub struct FfmpegDecoder {
    path: PathBuf,
    stream: StreamInfo,
    child: Child,
    stdout: ChildStdout,
    pts_rx: Receiver<Option<i64>>,
    stderr_reader: Option<JoinHandle<()>>,
    frame_counter: u64,
    finished: bool,
}

impl FfmpegDecoder {
    pub fn stream_info(path: &Path) -> Result<StreamInfo, DecodeError> {
        let output = Command::new("ffprobe")
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=index,width,height,r_frame_rate"])
            .args(["-of", "json"])
            .arg(path)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(DecodeError::Process(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_stream_listing(&String::from_utf8_lossy(&output.stdout), path)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref().to_path_buf();
        let stream = Self::stream_info(&path)?;
        info!(
            "🎬 FfmpegDecoder: {:?} stream #{} {}x{} @ {:.2}fps",
            path, stream.index, stream.width, stream.height, stream.frame_rate
        );

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-nostdin", "-loglevel", "info"])
            .arg("-i")
            .arg(&path)
            .arg("-map")
            .arg(format!("0:{}", stream.index))
            .args(["-vf", "showinfo", "-fps_mode", "passthrough"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DecodeError::Process("ffmpeg stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DecodeError::Process("ffmpeg stderr unavailable".into()))?;

        let (pts_tx, pts_rx) = mpsc::channel();
        let stderr_reader = thread::Builder::new()
            .name("ffmpeg-stderr".into())
            .spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    match parse_showinfo_pts(&line) {
                        Some(pts) => {
                            if pts_tx.send(pts).is_err() {
                                break;
                            }
                        }
                        None => debug!("ffmpeg: {}", line),
                    }
                }
            })?;

        Ok(Self {
            path,
            stream,
            child,
            stdout,
            pts_rx,
            stderr_reader: Some(stderr_reader),
            frame_counter: 0,
            finished: false,
        })
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    fn next_timestamp(&mut self) -> i64 {
        match self.pts_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(Some(pts)) => pts,
            Ok(None) | Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                let ts = self.stream.fallback_timestamp_us(self.frame_counter);
                debug!(
                    "No showinfo pts for frame {}, using {}us",
                    self.frame_counter, ts
                );
                ts
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        match self.child.wait() {
            Ok(status) if !status.success() => {
                warn!("⚠️ ffmpeg exited with {} for {:?}", status, self.path)
            }
            Ok(_) => {}
            Err(e) => warn!("⚠️ Failed to wait for ffmpeg: {}", e),
        }
        if let Some(handle) = self.stderr_reader.take() {
            let _ = handle.join();
        }
        info!(
            "✅ FfmpegDecoder: {} frames decoded from {:?}",
            self.frame_counter, self.path
        );
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn read_picture(&mut self) -> Result<Option<DecodedPicture>, DecodeError> {
        if self.finished {
            return Ok(None);
        }

        let expected = self.stream.frame_size();
        let mut data = vec![0u8; expected];
        let read = self.fill(&mut data)?;

        if read == 0 {
            self.finish();
            return Ok(None);
        }
        if read < expected {
            self.finish();
            return Err(DecodeError::TruncatedFrame {
                expected,
                actual: read,
            });
        }

        let timestamp_us = self.next_timestamp();
        self.frame_counter += 1;

        Ok(Some(DecodedPicture {
            stream_index: self.stream.index,
            timestamp_us,
            width: self.stream.width,
            height: self.stream.height,
            data,
        }))
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        debug!("🗑️ FfmpegDecoder: released {:?}", self.path);
    }
}
