use crate::config::DetectorConfig;
use crate::pose::{KeypointIndex, Pose, PoseFrame};

use super::buffer::FullSwing;
use super::phase::SwingPhase;

/// フレーム内に必要なキーポイント（耳以外すべて）
pub const REQUIRED_KEYPOINTS: [KeypointIndex; 15] = [
    KeypointIndex::Nose,
    KeypointIndex::LeftEye,
    KeypointIndex::RightEye,
    KeypointIndex::LeftShoulder,
    KeypointIndex::RightShoulder,
    KeypointIndex::LeftElbow,
    KeypointIndex::RightElbow,
    KeypointIndex::LeftWrist,
    KeypointIndex::RightWrist,
    KeypointIndex::LeftHip,
    KeypointIndex::RightHip,
    KeypointIndex::LeftKnee,
    KeypointIndex::RightKnee,
    KeypointIndex::LeftAnkle,
    KeypointIndex::RightAnkle,
];

/// 最低点（画面上で最も下）の初期値
const LOWEST_HAND_SENTINEL: f32 = -1.0;
/// 最高点（画面上で最も上）の初期値
const HIGHEST_HAND_SENTINEL: f32 = 9000.0;

/// classify の結果
#[derive(Debug, Clone, PartialEq)]
pub enum SwingEvent {
    /// 必要なキーポイントが見えていない。状態はリセット済み
    OutOfFrame {
        /// 中断されたフェーズ（Idle だった場合は None）
        aborted: Option<SwingPhase>,
    },
    PhaseChanged {
        from: SwingPhase,
        to: SwingPhase,
        timestamp_ms: u64,
    },
}

/// スイングフェーズ判定
///
/// 両手首の中点（手）と両腰の中点の Y 座標からフェーズを進める。
/// 呼び出しは単一スレッドから直列に行うこと
pub struct SwingDetector {
    visibility_threshold: f32,
    resting_frames: u32,
    initial_max_jiggle: f32,
    change_buffer: f32,

    current_phase: SwingPhase,
    previous_phase: SwingPhase,
    /// 静止フレームのカウントダウン
    resting_counter: u32,
    /// アドレス中の手の最低点（Y最大）
    lowest_hand_y: f32,
    /// バックスイング中の手の最高点（Y最小）
    highest_hand_y: f32,
    previous_hand: (f32, f32),
    max_jiggle: f32,
    swing: Option<FullSwing>,
}

impl SwingDetector {
    pub fn new() -> Self {
        Self::from_config(&DetectorConfig::default())
    }

    /// 設定から作成
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            visibility_threshold: config.visibility_threshold,
            resting_frames: config.resting_frames,
            initial_max_jiggle: config.initial_max_jiggle,
            change_buffer: config.change_buffer,
            current_phase: SwingPhase::Idle,
            previous_phase: SwingPhase::Idle,
            resting_counter: config.resting_frames,
            lowest_hand_y: LOWEST_HAND_SENTINEL,
            highest_hand_y: HIGHEST_HAND_SENTINEL,
            previous_hand: (0.0, 0.0),
            max_jiggle: config.initial_max_jiggle,
            swing: None,
        }
    }

    pub fn phase(&self) -> SwingPhase {
        self.current_phase
    }

    /// キャプチャ中のスイング
    pub fn swing(&self) -> Option<&FullSwing> {
        self.swing.as_ref()
    }

    /// 必要なキーポイントがすべてフレーム内か
    pub fn in_frame(&self, frame: &PoseFrame) -> bool {
        frame.pose.all_visible(&REQUIRED_KEYPOINTS, self.visibility_threshold)
    }

    /// 1フレームを処理し、フェーズが変わったかフレーム外なら通知を返す
    pub fn classify(&mut self, frame: &PoseFrame) -> Option<SwingEvent> {
        if !self.in_frame(frame) {
            return Some(self.reject());
        }
        let Some((hand_x, hand_y, hip_y)) = hand_and_hip(&frame.pose) else {
            return Some(self.reject());
        };

        self.current_phase = self.progress(hand_x, hand_y, hip_y);

        match self.current_phase {
            SwingPhase::Ready => {
                let jiggle = (hand_y - self.previous_hand.1).abs();
                self.max_jiggle = self.max_jiggle.max(jiggle);
                self.lowest_hand_y = self.lowest_hand_y.max(hand_y);
            }
            SwingPhase::Backswing => {
                self.highest_hand_y = self.highest_hand_y.min(hand_y);
                if let Some(swing) = self.swing.as_mut() {
                    swing.backswing.push(frame.clone());
                }
            }
            SwingPhase::Downswing => {
                if let Some(swing) = self.swing.as_mut() {
                    swing.downswing.push(frame.clone());
                }
            }
            SwingPhase::FollowThrough => {
                if let Some(swing) = self.swing.as_mut() {
                    swing.follow_through.push(frame.clone());
                }
            }
            SwingPhase::Idle => {}
        }

        self.previous_hand = (hand_x, hand_y);

        if self.current_phase == self.previous_phase {
            return None;
        }

        // ここから下は遷移時に一度だけ
        let now = frame.timestamp_ms;
        match self.current_phase {
            SwingPhase::Ready => {
                self.swing = Some(FullSwing::new(now));
            }
            SwingPhase::Backswing => {
                if let Some(swing) = self.swing.as_mut() {
                    swing.downswing.start_time_ms = now;
                }
            }
            SwingPhase::Downswing => {
                if let Some(swing) = self.swing.as_mut() {
                    swing.backswing.end_time_ms = now;
                    swing.downswing.start_time_ms = now;
                }
            }
            SwingPhase::FollowThrough => {
                if let Some(swing) = self.swing.as_mut() {
                    swing.downswing.end_time_ms = now;
                    swing.follow_through.start_time_ms = now;
                }
            }
            SwingPhase::Idle => {}
        }

        let from = self.previous_phase;
        self.previous_phase = self.current_phase;
        tracing::debug!("swing phase: {} -> {} at {}", from, self.current_phase, now);

        Some(SwingEvent::PhaseChanged {
            from,
            to: self.current_phase,
            timestamp_ms: now,
        })
    }

    /// キャプチャ済みのスイングを渡して初期状態に戻す
    pub fn finish(&mut self) -> Option<FullSwing> {
        let swing = self.swing.take();
        self.reset();
        swing
    }

    /// 全トラッキング状態を初期値に戻す（キャプチャ中のスイングは破棄）
    pub fn reset(&mut self) {
        self.current_phase = SwingPhase::Idle;
        self.previous_phase = SwingPhase::Idle;
        self.resting_counter = self.resting_frames;
        self.lowest_hand_y = LOWEST_HAND_SENTINEL;
        self.highest_hand_y = HIGHEST_HAND_SENTINEL;
        self.previous_hand = (0.0, 0.0);
        self.max_jiggle = self.initial_max_jiggle;
        self.swing = None;
    }

    fn reject(&mut self) -> SwingEvent {
        let aborted = (self.current_phase != SwingPhase::Idle).then_some(self.current_phase);
        if let Some(phase) = aborted {
            tracing::debug!("body left the frame during {}, swing discarded", phase);
        } else {
            tracing::trace!("body not fully in frame");
        }
        self.reset();
        SwingEvent::OutOfFrame { aborted }
    }

    /// 優先順に判定し、最初に成立したフェーズを返す
    fn progress(&mut self, hand_x: f32, hand_y: f32, hip_y: f32) -> SwingPhase {
        if self.is_ready(hand_x, hand_y, hip_y) {
            SwingPhase::Ready
        } else if self.is_backswing_started(hand_y) {
            SwingPhase::Backswing
        } else if self.is_downswing_started(hand_y) {
            SwingPhase::Downswing
        } else if self.is_follow_through_started(hand_y) {
            SwingPhase::FollowThrough
        } else {
            self.current_phase
        }
    }

    /// 手が腰より下で静止したフレームが resting_frames 回続いたか
    fn is_ready(&mut self, hand_x: f32, hand_y: f32, hip_y: f32) -> bool {
        let resting = (hand_x - self.previous_hand.0).abs() <= self.max_jiggle
            && (hand_y - self.previous_hand.1).abs() <= self.max_jiggle
            && hand_y >= hip_y
            && self.current_phase == SwingPhase::Idle;

        if resting {
            self.resting_counter = self.resting_counter.saturating_sub(1);
        } else {
            self.resting_counter = self.resting_frames;
        }

        resting && self.resting_counter == 0
    }

    /// 手が最低点から change_buffer 以上上がった
    fn is_backswing_started(&self, hand_y: f32) -> bool {
        if (hand_y - self.lowest_hand_y).abs() < self.change_buffer {
            return false;
        }
        hand_y < self.lowest_hand_y && self.current_phase == SwingPhase::Ready
    }

    /// 手が最高点から change_buffer 以上下がった
    fn is_downswing_started(&self, hand_y: f32) -> bool {
        if (hand_y - self.highest_hand_y).abs() < self.change_buffer {
            return false;
        }
        hand_y > self.highest_hand_y && self.current_phase == SwingPhase::Backswing
    }

    /// 手の下降が止まった
    fn is_follow_through_started(&self, hand_y: f32) -> bool {
        let rising_again = hand_y - self.previous_hand.1 <= 0.0;
        rising_again && self.current_phase == SwingPhase::Downswing
    }
}

impl Default for SwingDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// (手X, 手Y, 腰Y)
fn hand_and_hip(pose: &Pose) -> Option<(f32, f32, f32)> {
    let left_wrist = pose.get(KeypointIndex::LeftWrist)?;
    let right_wrist = pose.get(KeypointIndex::RightWrist)?;
    let left_hip = pose.get(KeypointIndex::LeftHip)?;
    let right_hip = pose.get(KeypointIndex::RightHip)?;

    let hand_x = (left_wrist.x + right_wrist.x) / 2.0;
    let hand_y = (left_wrist.y + right_wrist.y) / 2.0;
    let hip_y = (left_hip.y + right_hip.y) / 2.0;
    Some((hand_x, hand_y, hip_y))
}
