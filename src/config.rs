use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub body: BodyConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// 利き手（スイングの向き）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    #[default]
    Right,
    Left,
}

/// ユーザーの体格（単位: インチ）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    /// 身長
    #[serde(default = "default_height_in")]
    pub height_in: f64,
    /// 腰幅
    #[serde(default = "default_hip_width_in")]
    pub hip_width_in: f64,
    /// 肩幅
    #[serde(default = "default_shoulder_width_in")]
    pub shoulder_width_in: f64,
    #[serde(default)]
    pub handedness: Handedness,
}

fn default_height_in() -> f64 { 74.0 }
fn default_hip_width_in() -> f64 { 15.4 }
fn default_shoulder_width_in() -> f64 { 18.1 }

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            height_in: default_height_in(),
            hip_width_in: default_hip_width_in(),
            shoulder_width_in: default_shoulder_width_in(),
            handedness: Handedness::default(),
        }
    }
}

/// スイング検出のしきい値（座標は画像平面単位）
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// キーポイントがフレーム内とみなされる信頼度（これより大きいこと）
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
    /// Ready判定に必要な静止フレーム数
    #[serde(default = "default_resting_frames")]
    pub resting_frames: u32,
    /// 手ブレ許容量の初期値
    #[serde(default = "default_initial_max_jiggle")]
    pub initial_max_jiggle: f32,
    /// 最高点・最低点を越えたとみなす余裕
    #[serde(default = "default_change_buffer")]
    pub change_buffer: f32,
    /// フォロースルー開始からスイング終了までの待ち時間（ミリ秒）
    #[serde(default = "default_finish_delay_ms")]
    pub finish_delay_ms: u64,
}

fn default_visibility_threshold() -> f32 { 0.5 }
fn default_resting_frames() -> u32 { 10 }
fn default_initial_max_jiggle() -> f32 { 1.5 }
fn default_change_buffer() -> f32 { 5.0 }
fn default_finish_delay_ms() -> u64 { 1500 }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: default_visibility_threshold(),
            resting_frames: default_resting_frames(),
            initial_max_jiggle: default_initial_max_jiggle(),
            change_buffer: default_change_buffer(),
            finish_delay_ms: default_finish_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_listen_addr() -> String { "0.0.0.0:9100".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 読み込みに失敗したらデフォルト値
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }
}
