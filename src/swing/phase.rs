use serde::{Deserialize, Serialize};

/// スイングフェーズ。Idle から FollowThrough まで前方向にのみ進む
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingPhase {
    #[default]
    Idle,
    Ready,
    Backswing,
    Downswing,
    FollowThrough,
}

impl SwingPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Backswing => "backswing",
            Self::Downswing => "downswing",
            Self::FollowThrough => "follow_through",
        }
    }

    /// 次のフェーズ（FollowThrough の次は無い）
    pub fn next(&self) -> Option<SwingPhase> {
        match self {
            Self::Idle => Some(Self::Ready),
            Self::Ready => Some(Self::Backswing),
            Self::Backswing => Some(Self::Downswing),
            Self::Downswing => Some(Self::FollowThrough),
            Self::FollowThrough => None,
        }
    }
}

impl std::fmt::Display for SwingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        assert!(SwingPhase::Idle < SwingPhase::Ready);
        assert!(SwingPhase::Ready < SwingPhase::Backswing);
        assert!(SwingPhase::Backswing < SwingPhase::Downswing);
        assert!(SwingPhase::Downswing < SwingPhase::FollowThrough);
    }

    #[test]
    fn test_next_walks_forward() {
        let mut phase = SwingPhase::Idle;
        let mut walked = vec![phase];
        while let Some(next) = phase.next() {
            assert!(next > phase);
            phase = next;
            walked.push(phase);
        }
        assert_eq!(walked.len(), 5);
        assert_eq!(phase, SwingPhase::FollowThrough);
    }

    #[test]
    fn test_serde_name() {
        let json = serde_json::to_string(&SwingPhase::FollowThrough).unwrap();
        assert_eq!(json, "\"follow_through\"");
        assert_eq!(SwingPhase::FollowThrough.to_string(), "follow_through");
    }
}
