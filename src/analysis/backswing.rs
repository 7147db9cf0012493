use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pose::{KeypointIndex, Pose};
use crate::swing::PhaseBuffer;

use super::calibration::Calibration;
use super::geometry::{acos_degrees, acos_radians, distance, point};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("need at least 2 captured frames, got {count}")]
    InsufficientFrames { count: usize },
}

/// 正面・後方どちらのカメラでも取れる値
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct General {
    /// 度
    pub hip_turn_at_top: Option<f64>,
    /// 度
    pub shoulder_tilt_at_top: Option<f64>,
    /// ミリ秒
    pub duration_ms: i64,
}

/// 正面カメラ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facing {
    pub hip_sway_at_top: Option<f64>,
}

/// 飛球線後方カメラ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownTheLine {
    /// 度
    pub spine_tilt_at_address: Option<f64>,
    /// 度
    pub left_knee_bend_at_address: Option<f64>,
    /// 度
    pub right_knee_bend_at_address: Option<f64>,
}

/// バックスイングの解析結果。None は計算できなかった値
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackswingReport {
    pub general: General,
    pub facing: Facing,
    pub down_the_line: DownTheLine,
}

impl BackswingReport {
    /// 計算できなかった項目名
    pub fn undefined_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("hipTurnAtTop", self.general.hip_turn_at_top.is_none()),
            ("shoulderTiltAtTop", self.general.shoulder_tilt_at_top.is_none()),
            ("hipSwayAtTop", self.facing.hip_sway_at_top.is_none()),
            ("spineTiltAtAddress", self.down_the_line.spine_tilt_at_address.is_none()),
            ("leftKneeBendAtAddress", self.down_the_line.left_knee_bend_at_address.is_none()),
            ("rightKneeBendAtAddress", self.down_the_line.right_knee_bend_at_address.is_none()),
        ];
        fields.iter().filter(|(_, undefined)| *undefined).map(|(name, _)| *name).collect()
    }
}

/// バックスイングのバッファを解析する
///
/// 最初のフレーム（アドレス）と最後のフレーム（トップ）だけを使う。
/// calibration が無い場合、実寸換算が必要な項目は None になる
pub fn analyze(
    buffer: &PhaseBuffer,
    calibration: Option<&Calibration>,
) -> Result<BackswingReport, AnalysisError> {
    let frames = buffer.frames();
    if frames.len() < 2 {
        return Err(AnalysisError::InsufficientFrames { count: frames.len() });
    }
    let address = &frames[0].pose;
    let top = &frames[frames.len() - 1].pose;

    Ok(BackswingReport {
        general: General {
            hip_turn_at_top: calibration.and_then(|cal| hip_turn(address, top, cal)),
            shoulder_tilt_at_top: calibration.and_then(|cal| shoulder_tilt(top, cal)),
            duration_ms: buffer.duration_ms(),
        },
        facing: Facing {
            hip_sway_at_top: calibration.and_then(|cal| hip_sway(address, top, cal)),
        },
        down_the_line: DownTheLine {
            spine_tilt_at_address: spine_tilt(address),
            left_knee_bend_at_address: knee_bend(address, KeypointIndex::LeftHip, KeypointIndex::LeftKnee),
            right_knee_bend_at_address: knee_bend(address, KeypointIndex::RightHip, KeypointIndex::RightKnee),
        },
    })
}

/// 腰幅の見かけの縮みから求めた腰の回転角（ラジアン）
///
/// アドレスで腰がカメラに正対している前提
fn hip_angle(pose: &Pose, hip_width_units: f64) -> Option<f64> {
    let right = point(pose, KeypointIndex::RightHip)?;
    let left = point(pose, KeypointIndex::LeftHip)?;
    acos_radians(distance(right, left) / hip_width_units)
}

fn hip_turn(address: &Pose, top: &Pose, cal: &Calibration) -> Option<f64> {
    let at_address = hip_angle(address, cal.hip_width_units)?;
    let at_top = hip_angle(top, cal.hip_width_units)?;
    finite((at_address - at_top).abs().to_degrees())
}

fn shoulder_tilt(top: &Pose, cal: &Calibration) -> Option<f64> {
    let right = point(top, KeypointIndex::RightShoulder)?;
    let left = point(top, KeypointIndex::LeftShoulder)?;
    acos_degrees(cal.shoulder_width_units / distance(right, left))
}

fn hip_sway(address: &Pose, top: &Pose, cal: &Calibration) -> Option<f64> {
    let address_x = point(address, KeypointIndex::RightHip)?.0;
    let top_x = point(top, KeypointIndex::RightHip)?.0;
    // (top - top - address - top) を整理した式。トップでの実際の横移動量には依存しない
    finite((-address_x - top_x) * cal.units_per_inch)
}

/// 腰→肩の直角三角形の縦の辺から前傾角を求める
fn spine_tilt(address: &Pose) -> Option<f64> {
    let hip = point(address, KeypointIndex::RightHip)?;
    let shoulder = point(address, KeypointIndex::RightShoulder)?;
    let reference = (hip.0, shoulder.1);
    acos_degrees(distance(hip, reference) / distance(hip, shoulder))
}

/// 膝の曲がり。参照点は (腰Y, 膝X) で軸が入れ替わっている
fn knee_bend(address: &Pose, hip_index: KeypointIndex, knee_index: KeypointIndex) -> Option<f64> {
    let hip = point(address, hip_index)?;
    let knee = point(address, knee_index)?;
    let reference = (hip.1, knee.0);
    acos_degrees(distance(knee, reference) / distance(hip, knee))
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
