use anyhow::{bail, Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::DetectorConfig;
use crate::pose::PoseFrame;

use super::buffer::FullSwing;
use super::detector::{SwingDetector, SwingEvent};
use super::phase::SwingPhase;

/// セッションから外部（録画・UI・解析）への通知
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// 体がフレームから外れた（外れた瞬間に一度だけ）
    GetInFrame,
    /// アドレスを検出。録画開始の合図
    SwingReady { timestamp_ms: u64 },
    PhaseChanged {
        from: SwingPhase,
        to: SwingPhase,
        timestamp_ms: u64,
    },
    /// スイング完了。バッファはこれ以降変更されない
    SwingFinished(FullSwing),
}

/// 1人分のスイング検出セッション
///
/// フォロースルー開始から finish_delay 後にスイングを確定させる。
/// 確定は予約として保持し、取り消し可能
pub struct SwingSession {
    detector: SwingDetector,
    finish_delay: Duration,
    /// 確定予定時刻
    pending_finish: Option<Instant>,
    body_in_frame: bool,
}

impl SwingSession {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            detector: SwingDetector::from_config(config),
            finish_delay: Duration::from_millis(config.finish_delay_ms),
            pending_finish: None,
            body_in_frame: true,
        }
    }

    pub fn phase(&self) -> SwingPhase {
        self.detector.phase()
    }

    pub fn pending_finish(&self) -> Option<Instant> {
        self.pending_finish
    }

    /// 予約済みの確定を取り消す。取り消した場合 true
    pub fn cancel_pending_finish(&mut self) -> bool {
        self.pending_finish.take().is_some()
    }

    /// 1フレーム処理する
    pub fn handle_frame(&mut self, frame: &PoseFrame) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        // フォロースルー中に体が外れたらスイングは破棄（classify がリセットする）
        if self.pending_finish.is_some() && !self.detector.in_frame(frame) {
            self.cancel_pending_finish();
            tracing::info!("body left the frame during follow-through, swing discarded");
        }

        match self.detector.classify(frame) {
            Some(SwingEvent::OutOfFrame { aborted }) => {
                if let Some(phase) = aborted {
                    tracing::info!("swing aborted during {}", phase);
                }
                if self.body_in_frame {
                    events.push(SessionEvent::GetInFrame);
                }
                self.body_in_frame = false;
            }
            Some(SwingEvent::PhaseChanged { from, to, timestamp_ms }) => {
                self.body_in_frame = true;
                events.push(SessionEvent::PhaseChanged { from, to, timestamp_ms });
                match to {
                    SwingPhase::Ready => {
                        tracing::info!("swing ready at {}", timestamp_ms);
                        events.push(SessionEvent::SwingReady { timestamp_ms });
                    }
                    SwingPhase::FollowThrough => {
                        self.pending_finish = Some(Instant::now() + self.finish_delay);
                    }
                    SwingPhase::Idle | SwingPhase::Backswing | SwingPhase::Downswing => {}
                }
            }
            None => self.body_in_frame = true,
        }

        events
    }

    /// 予約された確定を実行する
    pub fn fire_pending_finish(&mut self) -> Option<SessionEvent> {
        self.pending_finish = None;
        let swing = self.detector.finish()?;
        tracing::info!(
            "swing finished: {} backswing / {} downswing / {} follow-through frames",
            swing.backswing.len(),
            swing.downswing.len(),
            swing.follow_through.len()
        );
        Some(SessionEvent::SwingFinished(swing))
    }

    /// フレームを受け取り続ける処理ループ
    ///
    /// フレームの送信側が閉じたとき確定が予約されていれば、時刻まで待って確定してから終了する
    pub async fn run(
        mut self,
        mut frames: mpsc::Receiver<PoseFrame>,
        events: mpsc::Sender<SessionEvent>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        loop {
            let deadline = self.pending_finish;
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    if self.cancel_pending_finish() {
                        tracing::debug!("shutdown with a pending swing finish, dropped");
                    }
                    break;
                }
                _ = wait_until(deadline) => {
                    if let Some(event) = self.fire_pending_finish() {
                        send(&events, event).await?;
                    }
                }
                frame = frames.recv() => match frame {
                    Some(frame) => {
                        for event in self.handle_frame(&frame) {
                            send(&events, event).await?;
                        }
                    }
                    None => {
                        if let Some(deadline) = self.pending_finish {
                            tokio::select! {
                                _ = shutdown.cancelled() => {}
                                _ = sleep_until(deadline) => {
                                    if let Some(event) = self.fire_pending_finish() {
                                        send(&events, event).await?;
                                    }
                                }
                            }
                        }
                        break;
                    }
                },
            }
        }
        Ok(())
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// セッションへフレームを渡す。待たずに、キューが満杯ならそのフレームを捨てる
///
/// 渡せたら true、捨てたら false。セッションが止まっていればエラー
pub fn offer_frame(frames: &mpsc::Sender<PoseFrame>, frame: PoseFrame) -> Result<bool> {
    match frames.try_send(frame) {
        Ok(()) => Ok(true),
        Err(TrySendError::Full(_)) => Ok(false),
        Err(TrySendError::Closed(_)) => bail!("swing session stopped"),
    }
}

async fn send(events: &mpsc::Sender<SessionEvent>, event: SessionEvent) -> Result<()> {
    events.send(event).await.context("session event receiver dropped")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SwingAnalyzer;
    use crate::config::BodyConfig;
    use crate::pose::{Keypoint, KeypointIndex};
    use crate::swing::trace::SyntheticSwing;

    fn make_session() -> SwingSession {
        SwingSession::new(&DetectorConfig::default())
    }

    fn drop_wrist(frame: &PoseFrame) -> PoseFrame {
        let mut frame = frame.clone();
        let wrist = *frame.pose.get(KeypointIndex::RightWrist).unwrap();
        frame.pose = frame
            .pose
            .with(KeypointIndex::RightWrist, Keypoint::new(wrist.x, wrist.y, 0.3));
        frame
    }

    fn is_finished(event: &SessionEvent) -> bool {
        matches!(event, SessionEvent::SwingFinished(_))
    }

    #[test]
    fn test_handle_frame_event_order() {
        let mut session = make_session();
        let frames = SyntheticSwing::default().frames();
        let events: Vec<_> = frames.iter().flat_map(|f| session.handle_frame(f)).collect();

        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            SessionEvent::PhaseChanged {
                from: SwingPhase::Idle,
                to: SwingPhase::Ready,
                timestamp_ms: frames[10].timestamp_ms,
            }
        );
        assert_eq!(events[1], SessionEvent::SwingReady { timestamp_ms: frames[10].timestamp_ms });
        assert!(matches!(
            events[4],
            SessionEvent::PhaseChanged { to: SwingPhase::FollowThrough, .. }
        ));
        assert!(session.pending_finish().is_some());
        assert!(!events.iter().any(is_finished));
    }

    #[test]
    fn test_offer_frame_drops_when_full() {
        let frames = SyntheticSwing::default().frames();
        let (tx, mut rx) = mpsc::channel(1);

        assert!(offer_frame(&tx, frames[0].clone()).unwrap());
        assert!(!offer_frame(&tx, frames[1].clone()).unwrap());
        assert_eq!(rx.try_recv().unwrap().timestamp_ms, frames[0].timestamp_ms);
        assert!(offer_frame(&tx, frames[2].clone()).unwrap());

        drop(rx);
        assert!(offer_frame(&tx, frames[3].clone()).is_err());
    }

    #[test]
    fn test_get_in_frame_once_per_exit() {
        let mut session = make_session();
        let frames = SyntheticSwing::default().frames();
        let dropped = drop_wrist(&frames[0]);

        assert_eq!(session.handle_frame(&dropped), vec![SessionEvent::GetInFrame]);
        assert!(session.handle_frame(&dropped).is_empty());
        assert!(session.handle_frame(&frames[0]).is_empty());
        assert_eq!(session.handle_frame(&dropped), vec![SessionEvent::GetInFrame]);
    }

    #[test]
    fn test_cancel_pending_finish() {
        let mut session = make_session();
        for f in SyntheticSwing::default().frames() {
            session.handle_frame(&f);
        }
        assert!(session.cancel_pending_finish());
        assert!(!session.cancel_pending_finish());
        assert_eq!(session.phase(), SwingPhase::FollowThrough);
    }

    #[test]
    fn test_leaving_frame_during_follow_through_discards_swing() {
        let mut session = make_session();
        let frames = SyntheticSwing::default().frames();
        for f in &frames {
            session.handle_frame(f);
        }

        let events = session.handle_frame(&drop_wrist(frames.last().unwrap()));
        assert_eq!(events, vec![SessionEvent::GetInFrame]);
        assert!(session.pending_finish().is_none());
        assert_eq!(session.phase(), SwingPhase::Idle);
        assert!(session.fire_pending_finish().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropout_after_follow_through_never_finishes() {
        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (event_tx, mut event_rx) = mpsc::channel(64);
        let session = tokio::spawn(make_session().run(frame_rx, event_tx, CancellationToken::new()));

        let frames = SyntheticSwing::default().frames();
        for f in &frames {
            frame_tx.send(f.clone()).await.unwrap();
        }
        frame_tx.send(drop_wrist(frames.last().unwrap())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(3000)).await;
        drop(frame_tx);

        let mut events = Vec::new();
        while let Some(event) = event_rx.recv().await {
            events.push(event);
        }
        session.await.unwrap().unwrap();

        assert_eq!(events.last(), Some(&SessionEvent::GetInFrame));
        assert!(!events.iter().any(is_finished));
    }

    #[tokio::test(start_paused = true)]
    async fn test_swing_finishes_after_delay_and_analyzes() {
        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (event_tx, mut event_rx) = mpsc::channel(64);
        let shutdown = CancellationToken::new();
        let session = tokio::spawn(make_session().run(frame_rx, event_tx, shutdown.clone()));

        let started = Instant::now();
        for f in SyntheticSwing::default().frames() {
            frame_tx.send(f).await.unwrap();
        }

        let mut phases = Vec::new();
        let swing = loop {
            match event_rx.recv().await.unwrap() {
                SessionEvent::PhaseChanged { to, .. } => phases.push(to),
                SessionEvent::SwingFinished(swing) => break swing,
                _ => {}
            }
        };
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert_eq!(
            phases,
            vec![
                SwingPhase::Ready,
                SwingPhase::Backswing,
                SwingPhase::Downswing,
                SwingPhase::FollowThrough
            ]
        );
        assert_eq!(swing.backswing.len(), 15);

        let report = SwingAnalyzer::new(BodyConfig::default()).analyze(&swing).unwrap();
        let b = &report.backswing;
        for value in [
            b.general.hip_turn_at_top,
            b.general.shoulder_tilt_at_top,
            b.down_the_line.spine_tilt_at_address,
            b.down_the_line.left_knee_bend_at_address,
            b.down_the_line.right_knee_bend_at_address,
        ] {
            assert!(value.unwrap().is_finite());
        }

        shutdown.cancel();
        session.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wrist_mid_backswing_never_finishes() {
        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (event_tx, mut event_rx) = mpsc::channel(64);
        let session = tokio::spawn(make_session().run(frame_rx, event_tx, CancellationToken::new()));

        let frames = SyntheticSwing::default().frames();
        for f in &frames[..15] {
            frame_tx.send(f.clone()).await.unwrap();
        }
        frame_tx.send(drop_wrist(&frames[15])).await.unwrap();
        drop(frame_tx);

        let mut events = Vec::new();
        while let Some(event) = event_rx.recv().await {
            events.push(event);
        }
        session.await.unwrap().unwrap();

        assert_eq!(events.last(), Some(&SessionEvent::GetInFrame));
        assert!(!events.iter().any(is_finished));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_frames_waits_for_pending_finish() {
        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (event_tx, mut event_rx) = mpsc::channel(64);
        let session = tokio::spawn(make_session().run(frame_rx, event_tx, CancellationToken::new()));

        let started = Instant::now();
        for f in SyntheticSwing::default().frames() {
            frame_tx.send(f).await.unwrap();
        }
        drop(frame_tx);

        let mut finished = 0;
        while let Some(event) = event_rx.recv().await {
            if is_finished(&event) {
                finished += 1;
            }
        }
        session.await.unwrap().unwrap();
        assert_eq!(finished, 1);
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drops_pending_finish() {
        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (event_tx, mut event_rx) = mpsc::channel(64);
        let shutdown = CancellationToken::new();
        let session = tokio::spawn(make_session().run(frame_rx, event_tx, shutdown.clone()));

        for f in SyntheticSwing::default().frames() {
            frame_tx.send(f).await.unwrap();
        }
        loop {
            if let Some(SessionEvent::PhaseChanged { to: SwingPhase::FollowThrough, .. }) =
                event_rx.recv().await
            {
                break;
            }
        }
        shutdown.cancel();
        session.await.unwrap().unwrap();

        while let Some(event) = event_rx.recv().await {
            assert!(!is_finished(&event));
        }
    }
}
