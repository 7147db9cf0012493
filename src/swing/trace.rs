//! Pose frame traces: JSON-lines files of [`PoseFrame`] and a synthetic
//! swing generator used for replay demos and tests.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::pose::{Keypoint, KeypointIndex, Pose, PoseFrame};

/// 1行1フレームのJSONを読み込む（空行は無視）
pub fn read_trace<P: AsRef<Path>>(path: P) -> Result<Vec<PoseFrame>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open trace {}", path.display()))?;
    let mut frames = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: PoseFrame = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid pose frame", path.display(), line_no + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

pub fn write_trace<P: AsRef<Path>>(path: P, frames: &[PoseFrame]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create trace {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for frame in frames {
        serde_json::to_writer(&mut writer, frame)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

const CENTER_X: f32 = 150.0;
const CONFIDENCE: f32 = 0.9;

/// 正面を向いて立った合成ポーズ
///
/// `turn` は 0.0（正対）〜 1.0（トップ）で腰と肩の見かけの幅を縮める。
/// 手（両手首の中点）は `hand` に置く
pub fn standing_pose(hand: (f32, f32), turn: f32) -> Pose {
    use KeypointIndex::*;
    let hip_half = (10.0 - 4.0 * turn) / 2.0;
    let shoulder_half = (30.0 - 8.0 * turn) / 2.0;
    let kp = |x: f32, y: f32| Keypoint::new(x, y, CONFIDENCE);

    Pose::default()
        .with(Nose, kp(CENTER_X, 110.0))
        .with(LeftEye, kp(CENTER_X + 2.0, 108.0))
        .with(RightEye, kp(CENTER_X - 2.0, 108.0))
        .with(LeftEar, kp(CENTER_X + 6.0, 110.0))
        .with(RightEar, kp(CENTER_X - 6.0, 110.0))
        .with(LeftShoulder, kp(CENTER_X + shoulder_half, 120.0))
        .with(RightShoulder, kp(CENTER_X - shoulder_half, 120.0))
        .with(LeftElbow, kp(CENTER_X + 12.0, 140.0))
        .with(RightElbow, kp(CENTER_X - 12.0, 140.0))
        .with(LeftWrist, kp(hand.0 + 2.0, hand.1))
        .with(RightWrist, kp(hand.0 - 2.0, hand.1))
        .with(LeftHip, kp(CENTER_X + hip_half, 144.0))
        .with(RightHip, kp(CENTER_X - hip_half, 144.0))
        .with(LeftKnee, kp(CENTER_X + 5.0, 164.0))
        .with(RightKnee, kp(CENTER_X - 5.0, 164.0))
        .with(LeftAnkle, kp(CENTER_X + 5.0, 184.0))
        .with(RightAnkle, kp(CENTER_X - 5.0, 184.0))
}

/// 合成スイングの形
#[derive(Debug, Clone)]
pub struct SyntheticSwing {
    pub start_ms: u64,
    pub frame_interval_ms: u64,
    /// アドレスでの手の高さ
    pub rest_hand_y: f32,
    pub rest_frames: usize,
    pub backswing_frames: usize,
    /// バックスイング中に1フレームで上がる量
    pub backswing_step: f32,
    pub downswing_frames: usize,
    pub downswing_step: f32,
    pub follow_through_frames: usize,
    pub follow_through_step: f32,
}

impl Default for SyntheticSwing {
    fn default() -> Self {
        Self {
            start_ms: 1_700_000_000_000,
            frame_interval_ms: 33,
            rest_hand_y: 160.0,
            // 最初の1フレームは直前の手の位置を作るだけ
            rest_frames: 11,
            backswing_frames: 15,
            backswing_step: 5.0,
            downswing_frames: 10,
            downswing_step: 10.0,
            follow_through_frames: 5,
            follow_through_step: 4.0,
        }
    }
}

impl SyntheticSwing {
    pub fn frame_count(&self) -> usize {
        self.rest_frames + self.backswing_frames + self.downswing_frames + self.follow_through_frames
    }

    pub fn frames(&self) -> Vec<PoseFrame> {
        let mut poses = Vec::with_capacity(self.frame_count());
        let mut hand_y = self.rest_hand_y;

        for _ in 0..self.rest_frames {
            poses.push(standing_pose((CENTER_X, hand_y), 0.0));
        }
        for i in 1..=self.backswing_frames {
            hand_y -= self.backswing_step;
            let turn = i as f32 / self.backswing_frames as f32;
            poses.push(standing_pose((CENTER_X, hand_y), turn));
        }
        for i in 1..=self.downswing_frames {
            hand_y += self.downswing_step;
            let turn = 1.0 - i as f32 / self.downswing_frames as f32;
            poses.push(standing_pose((CENTER_X, hand_y), turn));
        }
        for _ in 0..self.follow_through_frames {
            hand_y -= self.follow_through_step;
            poses.push(standing_pose((CENTER_X, hand_y), 0.0));
        }

        poses
            .into_iter()
            .enumerate()
            .map(|(i, pose)| PoseFrame::new(pose, self.start_ms + i as u64 * self.frame_interval_ms))
            .collect()
    }
}
