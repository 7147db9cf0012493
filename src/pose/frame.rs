use serde::{Deserialize, Serialize};

use super::keypoint::Pose;

/// 1カメラフレーム分の姿勢とキャプチャ時刻
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub pose: Pose,
    /// キャプチャ時刻（エポックミリ秒）
    pub timestamp_ms: u64,
}

impl PoseFrame {
    pub fn new(pose: Pose, timestamp_ms: u64) -> Self {
        Self { pose, timestamp_ms }
    }
}
