use serde::{Deserialize, Serialize};

use crate::pose::PoseFrame;

/// 1フェーズ分のキャプチャ済みフレーム
///
/// 追加のみ。start/end は未設定なら 0
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseBuffer {
    frames: Vec<PoseFrame>,
    pub start_time_ms: u64,
    pub end_time_ms: u64,
}

impl PhaseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: PoseFrame) {
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[PoseFrame] {
        &self.frames
    }

    pub fn first(&self) -> Option<&PoseFrame> {
        self.frames.first()
    }

    pub fn last(&self) -> Option<&PoseFrame> {
        self.frames.last()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// end - start。未設定の側は 0 のまま引くので、0 や負にもなる
    pub fn duration_ms(&self) -> i64 {
        self.end_time_ms as i64 - self.start_time_ms as i64
    }
}

/// 1スイング分のフェーズバッファ。Ready 突入時に作られる
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullSwing {
    /// Ready に入ったフレームの時刻
    pub ready_at_ms: u64,
    pub backswing: PhaseBuffer,
    pub downswing: PhaseBuffer,
    pub follow_through: PhaseBuffer,
}

impl FullSwing {
    pub fn new(ready_at_ms: u64) -> Self {
        Self {
            ready_at_ms,
            ..Self::default()
        }
    }
}
