//! Replays a recorded pose trace through the swing session and prints the
//! phase events and swing analyses.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use swing_tracker::analysis::SwingAnalyzer;
use swing_tracker::config::Config;
use swing_tracker::swing::{read_trace, SessionEvent, SwingSession};

#[derive(Parser, Debug)]
#[command(about = "Replay a pose trace through the swing tracker")]
struct CliArgs {
    /// JSON-lines trace, one pose frame per line.
    trace: PathBuf,

    #[clap(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Feed frames at their recorded pace instead of as fast as possible.
    #[clap(long)]
    realtime: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let config = Config::load_or_default(&args.config);
    let frames = read_trace(&args.trace)?;

    println!("Swing Replay ({})", env!("GIT_VERSION"));
    println!("Trace: {} ({} frames)", args.trace.display(), frames.len());
    println!();

    let analyzer = SwingAnalyzer::new(config.body.clone());
    let session = SwingSession::new(&config.detector);
    let (frame_tx, frame_rx) = mpsc::channel(16);
    let (event_tx, mut event_rx) = mpsc::channel(16);
    let session_task = tokio::spawn(session.run(frame_rx, event_tx, CancellationToken::new()));

    let realtime = args.realtime;
    let feeder = tokio::spawn(async move {
        let mut prev_ts: Option<u64> = None;
        for frame in frames {
            if realtime {
                if let Some(prev) = prev_ts {
                    let gap = frame.timestamp_ms.saturating_sub(prev);
                    tokio::time::sleep(Duration::from_millis(gap)).await;
                }
                prev_ts = Some(frame.timestamp_ms);
            }
            if frame_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    let mut swings = 0usize;
    while let Some(event) = event_rx.recv().await {
        match event {
            SessionEvent::GetInFrame => println!("get in frame"),
            SessionEvent::SwingReady { timestamp_ms } => {
                println!("[{}] swing ready", timestamp_ms);
            }
            SessionEvent::PhaseChanged { from, to, timestamp_ms } => {
                println!("[{}] {} -> {}", timestamp_ms, from, to);
            }
            SessionEvent::SwingFinished(swing) => {
                swings += 1;
                match analyzer.analyze(&swing) {
                    Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                    Err(e) => println!("analysis failed: {}", e),
                }
            }
        }
    }

    feeder.await?;
    session_task.await??;
    println!();
    println!("{} swing(s)", swings);
    Ok(())
}
