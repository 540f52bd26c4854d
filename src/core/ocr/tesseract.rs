//! Tesseract 命令行引擎

use super::error::OcrError;
use super::recognizer::OcrEngine;
use image::{ImageOutputFormat, RgbImage};
use log::{debug, info};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// tessdata 目录
    pub tessdata_dir: PathBuf,
    pub language: String,
    /// 页面分割模式，10 = 单字符
    pub page_seg_mode: Option<u8>,
    pub binary: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tessdata_dir: PathBuf::from("tessdata"),
            language: "eng".to_string(),
            page_seg_mode: Some(10),
            binary: PathBuf::from("tesseract"),
        }
    }
}

pub struct TesseractCli {
    config: OcrConfig,
}

impl TesseractCli {
    pub fn new(config: OcrConfig) -> Self {
        info!(
            "🔧 TesseractCli: tessdata {:?}, lang {}",
            config.tessdata_dir, config.language
        );
        Self { config }
    }

    pub fn with_tessdata(tessdata_dir: impl AsRef<Path>) -> Self {
        Self::new(OcrConfig {
            tessdata_dir: tessdata_dir.as_ref().to_path_buf(),
            ..Default::default()
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("stdin")
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&self.config.tessdata_dir)
            .arg("-l")
            .arg(&self.config.language);
        if let Some(psm) = self.config.page_seg_mode {
            cmd.arg("--psm").arg(psm.to_string());
        }
        cmd
    }
}

pub(crate) fn encode_png(image: &RgbImage) -> Result<Vec<u8>, OcrError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageOutputFormat::Png)?;
    Ok(buffer.into_inner())
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &RgbImage) -> Result<String, OcrError> {
        let png = encode_png(image)?;

        let mut child = self
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // tesseract 先读完 stdin 再输出，写完即关闭
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png),
            None => Ok(()),
        };
        if let Err(e) = written {
            // 子进程提前退出（broken pipe）时也要回收，避免僵尸进程
            let _ = child.kill();
            let _ = child.wait();
            return Err(e.into());
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(OcrError::Tesseract(format!(
                "exit {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract -> {:?}", text.trim());
        Ok(text)
    }
}
