use serde::{Deserialize, Serialize};

/// 17 キーポイントインデックス（MoveNet / ML Kit 共通部分）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEye),
            2 => Some(Self::RightEye),
            3 => Some(Self::LeftEar),
            4 => Some(Self::RightEar),
            5 => Some(Self::LeftShoulder),
            6 => Some(Self::RightShoulder),
            7 => Some(Self::LeftElbow),
            8 => Some(Self::RightElbow),
            9 => Some(Self::LeftWrist),
            10 => Some(Self::RightWrist),
            11 => Some(Self::LeftHip),
            12 => Some(Self::RightHip),
            13 => Some(Self::LeftKnee),
            14 => Some(Self::RightKnee),
            15 => Some(Self::LeftAnkle),
            16 => Some(Self::RightAnkle),
            _ => None,
        }
    }

    /// 左右を入れ替えたインデックス（中央のNoseはそのまま）
    pub fn mirrored(self) -> Self {
        use KeypointIndex::*;
        match self {
            Nose => Nose,
            LeftEye => RightEye,
            RightEye => LeftEye,
            LeftEar => RightEar,
            RightEar => LeftEar,
            LeftShoulder => RightShoulder,
            RightShoulder => LeftShoulder,
            LeftElbow => RightElbow,
            RightElbow => LeftElbow,
            LeftWrist => RightWrist,
            RightWrist => LeftWrist,
            LeftHip => RightHip,
            RightHip => LeftHip,
            LeftKnee => RightKnee,
            RightKnee => LeftKnee,
            LeftAnkle => RightAnkle,
            RightAnkle => LeftAnkle,
        }
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    /// X座標（画像平面単位）
    pub x: f32,
    /// Y座標（画像平面単位、下が正）
    pub y: f32,
    /// フレーム内にある信頼度 (0.0〜1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 信頼度が閾値より大きいか
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.confidence > threshold
    }
}

/// 17キーポイントからなる姿勢。検出されなかった関節は None
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: [Option<Keypoint>; KeypointIndex::COUNT],
}

impl Pose {
    pub fn new(keypoints: [Option<Keypoint>; KeypointIndex::COUNT]) -> Self {
        Self { keypoints }
    }

    /// インデックスでキーポイントを取得
    pub fn get(&self, index: KeypointIndex) -> Option<&Keypoint> {
        self.keypoints[index as usize].as_ref()
    }

    /// キーポイントを差し替えた姿勢を返す
    pub fn with(mut self, index: KeypointIndex, keypoint: Keypoint) -> Self {
        self.keypoints[index as usize] = Some(keypoint);
        self
    }

    /// 指定したキーポイントがすべて存在し、閾値より高い信頼度を持つか
    pub fn all_visible(&self, indices: &[KeypointIndex], threshold: f32) -> bool {
        indices
            .iter()
            .all(|&idx| self.get(idx).is_some_and(|kp| kp.is_visible(threshold)))
    }

    /// 左右のラベルを入れ替えた姿勢（座標は変えない）
    pub fn mirrored(&self) -> Pose {
        let mut keypoints = [None; KeypointIndex::COUNT];
        for (i, slot) in keypoints.iter_mut().enumerate() {
            if let Some(idx) = KeypointIndex::from_index(i) {
                *slot = self.keypoints[idx.mirrored() as usize];
            }
        }
        Pose { keypoints }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_index_count() {
        assert_eq!(KeypointIndex::COUNT, 17);
    }

    #[test]
    fn test_keypoint_index_from_index() {
        assert_eq!(KeypointIndex::from_index(0), Some(KeypointIndex::Nose));
        assert_eq!(KeypointIndex::from_index(16), Some(KeypointIndex::RightAnkle));
        assert_eq!(KeypointIndex::from_index(17), None);
    }

    #[test]
    fn test_mirrored_index_is_involution() {
        for i in 0..KeypointIndex::COUNT {
            let idx = KeypointIndex::from_index(i).unwrap();
            assert_eq!(idx.mirrored().mirrored(), idx);
        }
        assert_eq!(KeypointIndex::LeftHip.mirrored(), KeypointIndex::RightHip);
        assert_eq!(KeypointIndex::Nose.mirrored(), KeypointIndex::Nose);
    }

    #[test]
    fn test_keypoint_is_visible_is_strict() {
        let kp = Keypoint::new(0.5, 0.5, 0.5);
        assert!(!kp.is_visible(0.5));
        assert!(kp.is_visible(0.4));
    }

    #[test]
    fn test_pose_get_missing() {
        let pose = Pose::default().with(KeypointIndex::Nose, Keypoint::new(50.0, 30.0, 0.9));
        assert_eq!(pose.get(KeypointIndex::Nose).unwrap().y, 30.0);
        assert!(pose.get(KeypointIndex::LeftEye).is_none());
    }

    #[test]
    fn test_all_visible() {
        let pose = Pose::default()
            .with(KeypointIndex::LeftHip, Keypoint::new(0.0, 0.0, 0.9))
            .with(KeypointIndex::RightHip, Keypoint::new(0.0, 0.0, 0.3));
        assert!(pose.all_visible(&[KeypointIndex::LeftHip], 0.5));
        assert!(!pose.all_visible(&[KeypointIndex::LeftHip, KeypointIndex::RightHip], 0.5));
        // 存在しないキーポイントは見えていない扱い
        assert!(!pose.all_visible(&[KeypointIndex::Nose], 0.0));
    }

    #[test]
    fn test_pose_mirrored() {
        let pose = Pose::default()
            .with(KeypointIndex::LeftHip, Keypoint::new(10.0, 40.0, 0.9))
            .with(KeypointIndex::Nose, Keypoint::new(20.0, 5.0, 0.9));
        let mirrored = pose.mirrored();
        assert_eq!(mirrored.get(KeypointIndex::RightHip).unwrap().x, 10.0);
        assert!(mirrored.get(KeypointIndex::LeftHip).is_none());
        assert_eq!(mirrored.get(KeypointIndex::Nose).unwrap().x, 20.0);
    }
}
