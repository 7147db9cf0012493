pub mod backswing;
pub mod calibration;
pub mod geometry;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::config::{BodyConfig, Handedness};
use crate::swing::{FullSwing, PhaseBuffer};

pub use backswing::{AnalysisError, BackswingReport, DownTheLine, Facing, General};
pub use calibration::{calibrate, Calibration, CalibrationError};

/// 1スイングの解析結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullSwingReport {
    pub swing_id: String,
    pub backswing: BackswingReport,
}

/// 確定したスイングを体格情報で解析する
pub struct SwingAnalyzer {
    body: BodyConfig,
}

impl SwingAnalyzer {
    pub fn new(body: BodyConfig) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &BodyConfig {
        &self.body
    }

    /// キャリブレーションはバックスイング最初のフレームで毎回やり直す
    pub fn analyze(&self, swing: &FullSwing) -> Result<FullSwingReport, AnalysisError> {
        // 左打ちは左右を入れ替えて右打ちと同じ式を使う
        let buffer = match self.body.handedness {
            Handedness::Right => Cow::Borrowed(&swing.backswing),
            Handedness::Left => Cow::Owned(mirrored(&swing.backswing)),
        };

        let calibration = match buffer.first().map(|frame| calibrate(frame, &self.body)) {
            Some(Ok(calibration)) => Some(calibration),
            Some(Err(e)) => {
                tracing::warn!("calibration failed: {}", e);
                None
            }
            None => None,
        };

        let report = backswing::analyze(&buffer, calibration.as_ref())?;
        let undefined = report.undefined_fields();
        if !undefined.is_empty() {
            tracing::warn!("undefined metrics: {}", undefined.join(", "));
        }

        Ok(FullSwingReport {
            swing_id: format!("swing-{}", swing.ready_at_ms),
            backswing: report,
        })
    }
}

fn mirrored(buffer: &PhaseBuffer) -> PhaseBuffer {
    let mut out = PhaseBuffer::new();
    for frame in buffer.frames() {
        let mut frame = frame.clone();
        frame.pose = frame.pose.mirrored();
        out.push(frame);
    }
    out.start_time_ms = buffer.start_time_ms;
    out.end_time_ms = buffer.end_time_ms;
    out
}
