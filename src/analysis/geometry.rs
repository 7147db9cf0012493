//! 画像平面上の2D幾何

use crate::pose::{KeypointIndex, Pose};

/// キーポイントの座標 (x, y)
pub fn point(pose: &Pose, index: KeypointIndex) -> Option<(f64, f64)> {
    pose.get(index).map(|kp| (f64::from(kp.x), f64::from(kp.y)))
}

pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// acos(ratio)
///
/// ratio が [-1, 1] 外または非有限なら None（NaN を結果に入れない）
pub fn acos_radians(ratio: f64) -> Option<f64> {
    if !ratio.is_finite() || !(-1.0..=1.0).contains(&ratio) {
        return None;
    }
    Some(ratio.acos())
}

/// acos(ratio) を度で返す
pub fn acos_degrees(ratio: f64) -> Option<f64> {
    acos_radians(ratio).map(f64::to_degrees)
}
