use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::align::DEFAULT_SCALE_BIAS;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub skeleton: SkeletonConfig,
    #[serde(default)]
    pub landmarks: LandmarkConfig,
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SkeletonConfig {
    /// レストポーズのスケルトン定義 (JSON)
    #[serde(default = "default_skeleton_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LandmarkConfig {
    /// これ未満の可視性のランドマークは欠損扱い
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlignmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// スケール比の平滑化定数
    #[serde(default = "default_scale_bias")]
    pub scale_bias: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// 垂直画角（度）
    #[serde(default = "default_fov_v_deg")]
    pub fov_v_deg: f32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// カメラ位置（メートル）
    #[serde(default = "default_camera_position")]
    pub position: [f32; 3],
    /// カメラ回転 [rx, ry, rz]（度）
    #[serde(default)]
    pub rotation_deg: [f32; 3],
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// ボーン姿勢の出力先ディレクトリ
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

fn default_skeleton_path() -> String { "skeleton.json".to_string() }
fn default_visibility_threshold() -> f32 { 0.5 }
fn default_true() -> bool { true }
fn default_scale_bias() -> f32 { DEFAULT_SCALE_BIAS }
fn default_fov_v_deg() -> f32 { 60.0 }
fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_camera_position() -> [f32; 3] { [0.0, 1.0, -3.0] }
fn default_output_dir() -> String { "out".to_string() }

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self { path: default_skeleton_path() }
    }
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self { visibility_threshold: default_visibility_threshold() }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            scale_bias: default_scale_bias(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_v_deg: default_fov_v_deg(),
            width: default_width(),
            height: default_height(),
            position: default_camera_position(),
            rotation_deg: [0.0; 3],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_output_dir() }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// 読めなければデフォルト設定
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.landmarks.visibility_threshold) {
            anyhow::bail!(
                "landmarks.visibility_threshold must be within 0..=1, got {}",
                self.landmarks.visibility_threshold
            );
        }
        if !(self.camera.fov_v_deg > 0.0 && self.camera.fov_v_deg < 180.0) {
            anyhow::bail!("camera.fov_v_deg must be within (0, 180), got {}", self.camera.fov_v_deg);
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            anyhow::bail!("camera viewport must be non-empty");
        }
        if !(self.alignment.scale_bias >= 0.0) {
            anyhow::bail!("alignment.scale_bias must be >= 0, got {}", self.alignment.scale_bias);
        }
        Ok(())
    }
}
