use thiserror::Error;

use crate::config::BodyConfig;
use crate::pose::{KeypointIndex, PoseFrame};

use super::geometry::{distance, point};

/// 頭の長さ ≒ 鼻〜目の縦距離 × 4
pub const HEAD_TO_NOSE_EYE_RATIO: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("calibration keypoint missing: {0:?}")]
    MissingLandmark(KeypointIndex),
    #[error("degenerate pose length {pose_length}")]
    DegeneratePose { pose_length: f64 },
    #[error("invalid body height {height_in} in")]
    InvalidHeight { height_in: f64 },
}

/// 身長から求めた画像平面単位と実寸（インチ）の換算
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// 足首〜頭頂までの長さ（画像平面単位）
    pub pose_length: f64,
    pub inches_per_unit: f64,
    pub units_per_inch: f64,
    pub hip_width_units: f64,
    pub shoulder_width_units: f64,
}

/// 基準フレーム1枚と体格からキャリブレーションを計算
///
/// 左半身の 足首→膝→腰→肩 の長さ、肩〜鼻の縦距離、推定した頭の長さの合計を身長とみなす
pub fn calibrate(frame: &PoseFrame, body: &BodyConfig) -> Result<Calibration, CalibrationError> {
    if !body.height_in.is_finite() || body.height_in <= 0.0 {
        return Err(CalibrationError::InvalidHeight { height_in: body.height_in });
    }

    let get = |index: KeypointIndex| {
        point(&frame.pose, index).ok_or(CalibrationError::MissingLandmark(index))
    };
    let ankle = get(KeypointIndex::LeftAnkle)?;
    let knee = get(KeypointIndex::LeftKnee)?;
    let hip = get(KeypointIndex::LeftHip)?;
    let shoulder = get(KeypointIndex::LeftShoulder)?;
    let nose = get(KeypointIndex::Nose)?;
    let eye = get(KeypointIndex::LeftEye)?;

    let shin = distance(ankle, knee);
    let femur = distance(knee, hip);
    let torso = distance(hip, shoulder);
    let shoulder_to_nose = (shoulder.1 - nose.1).abs();
    let head = (nose.1 - eye.1).abs() * HEAD_TO_NOSE_EYE_RATIO;
    let pose_length = shin + femur + torso + shoulder_to_nose + head;

    if !pose_length.is_finite() || pose_length <= 0.0 {
        return Err(CalibrationError::DegeneratePose { pose_length });
    }

    let inches_per_unit = body.height_in / pose_length;
    let units_per_inch = pose_length / body.height_in;

    Ok(Calibration {
        pose_length,
        inches_per_unit,
        units_per_inch,
        hip_width_units: body.hip_width_in * inches_per_unit,
        shoulder_width_units: body.shoulder_width_in * inches_per_unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, Pose};
    use crate::swing::trace::standing_pose;

    fn make_frame() -> PoseFrame {
        PoseFrame::new(standing_pose((150.0, 160.0), 0.0), 1_000)
    }

    #[test]
    fn test_pose_length() {
        let cal = calibrate(&make_frame(), &BodyConfig::default()).unwrap();
        // 脛20 + 大腿20 + 胴体 sqrt(10^2 + 24^2)=26 + 肩〜鼻10 + 頭 2*4=8
        assert!((cal.pose_length - 84.0).abs() < 1e-9);
        assert!((cal.inches_per_unit - 74.0 / 84.0).abs() < 1e-12);
        assert!((cal.units_per_inch - 84.0 / 74.0).abs() < 1e-12);
        assert!((cal.inches_per_unit * cal.units_per_inch - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_widths_scale_with_inches_per_unit() {
        let body = BodyConfig::default();
        let cal = calibrate(&make_frame(), &body).unwrap();
        assert!((cal.hip_width_units - 15.4 * cal.inches_per_unit).abs() < 1e-12);
        assert!((cal.shoulder_width_units - 18.1 * cal.inches_per_unit).abs() < 1e-12);
    }

    #[test]
    fn test_calibration_is_deterministic() {
        let frame = make_frame();
        let body = BodyConfig::default();
        let a = calibrate(&frame, &body).unwrap();
        let b = calibrate(&frame, &body).unwrap();
        assert_eq!(a.inches_per_unit.to_bits(), b.inches_per_unit.to_bits());
        assert_eq!(a.units_per_inch.to_bits(), b.units_per_inch.to_bits());
        assert_eq!(a.hip_width_units.to_bits(), b.hip_width_units.to_bits());
        assert_eq!(a.shoulder_width_units.to_bits(), b.shoulder_width_units.to_bits());
    }

    #[test]
    fn test_collapsed_pose_is_degenerate() {
        let kp = Keypoint::new(10.0, 10.0, 0.9);
        let pose = Pose::new([Some(kp); KeypointIndex::COUNT]);
        let err = calibrate(&PoseFrame::new(pose, 0), &BodyConfig::default()).unwrap_err();
        assert_eq!(err, CalibrationError::DegeneratePose { pose_length: 0.0 });
    }

    #[test]
    fn test_missing_landmark() {
        let mut frame = make_frame();
        frame.pose.keypoints[KeypointIndex::LeftEye as usize] = None;
        let err = calibrate(&frame, &BodyConfig::default()).unwrap_err();
        assert_eq!(err, CalibrationError::MissingLandmark(KeypointIndex::LeftEye));
    }

    #[test]
    fn test_invalid_height() {
        let body = BodyConfig { height_in: 0.0, ..BodyConfig::default() };
        assert!(matches!(
            calibrate(&make_frame(), &body),
            Err(CalibrationError::InvalidHeight { .. })
        ));
    }
}
