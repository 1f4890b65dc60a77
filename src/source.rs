//! ランドマークの供給元
//!
//! 推定器本体はこのクレートの外にある。ここでは境界のトレイトと、
//! 記録済みストリームを再生するソースだけを持つ。

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::pose::PoseFrame;

pub trait LandmarkSource {
    /// 次のフレーム。`Ok(None)` はストリーム終端、`Err` は上流の失敗（終端扱い）
    fn next_frame(&mut self) -> Result<Option<PoseFrame>>;
}

/// JSON Lines の記録を1行1フレームで再生する
///
/// ```text
/// {"timestamp_us": 0, "landmarks": [[x, y, z, visibility], ...], "world_landmarks": [...]}
/// ```
pub struct ReplaySource<R> {
    reader: R,
    line_no: usize,
}

impl ReplaySource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open recording {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line_no: 0 }
    }
}

impl<R: BufRead> LandmarkSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Option<PoseFrame>> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self
                .reader
                .read_line(&mut line)
                .with_context(|| format!("Failed to read recording line {}", self.line_no + 1))?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let frame = serde_json::from_str(trimmed)
                .with_context(|| format!("Invalid frame on line {}", self.line_no))?;
            return Ok(Some(frame));
        }
    }
}
