//! Swing server: receives pose frames over TCP, tracks swing phases and
//! sends the analysis of each finished swing back to the client.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use swing_tracker::analysis::SwingAnalyzer;
use swing_tracker::config::{Config, DetectorConfig};
use swing_tracker::protocol::{self, ClientMessage, ServerMessage};
use swing_tracker::swing::{offer_frame, SessionEvent, SwingSession};

#[derive(Parser, Debug)]
#[command(about = "Golf swing tracking server")]
struct CliArgs {
    /// Path to the config file.
    #[clap(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides [server] listen_addr.
    #[clap(long)]
    listen: Option<SocketAddr>,
}

/// Frames buffered between the socket and the session.
const FRAME_QUEUE: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let config = Config::load_or_default(&args.config);

    let bind_addr = match args.listen {
        Some(addr) => addr,
        None => config
            .server
            .listen_addr
            .parse()
            .context("invalid listen_addr")?,
    };

    tracing::info!("Swing Server ({})", env!("GIT_VERSION"));
    tracing::info!(
        "Body: height={}in hip={}in shoulder={}in {:?}",
        config.body.height_in,
        config.body.hip_width_in,
        config.body.shoulder_width_in,
        config.body.handedness
    );

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Listening on {}", bind_addr);

    let shutdown = CancellationToken::new();
    loop {
        let (tcp_stream, addr) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                shutdown.cancel();
                break;
            }
        };
        tcp_stream.set_nodelay(true)?;
        tracing::info!("Client connected: {}", addr);

        let detector = config.detector.clone();
        let analyzer = SwingAnalyzer::new(config.body.clone());
        let token = shutdown.child_token();
        tokio::spawn(async move {
            match handle_client(tcp_stream, &detector, analyzer, token).await {
                Ok(()) => tracing::info!("Client disconnected: {}", addr),
                Err(e) => tracing::error!("Client {} error: {:#}", addr, e),
            }
        });
    }
    Ok(())
}

async fn handle_client(
    stream: TcpStream,
    detector: &DetectorConfig,
    mut analyzer: SwingAnalyzer,
    shutdown: CancellationToken,
) -> Result<()> {
    let (mut sink, mut reader) = protocol::message_stream(stream).split();

    let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE);
    let (event_tx, mut event_rx) = mpsc::channel(FRAME_QUEUE);
    let session = SwingSession::new(detector);
    let session_task = tokio::spawn(session.run(frame_rx, event_tx, shutdown.clone()));

    protocol::send_to_sink(&mut sink, &ServerMessage::Ready).await?;

    // frame_tx を落とすとセッションは保留中の確定を済ませてから終わる
    let mut frame_tx = Some(frame_tx);
    let mut dropped_frames = 0u64;
    loop {
        tokio::select! {
            incoming = reader.next(), if frame_tx.is_some() => {
                let bytes = match incoming {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        frame_tx = None;
                        continue;
                    }
                };
                match protocol::decode::<ClientMessage>(&bytes)? {
                    ClientMessage::SetBody { body } => {
                        tracing::info!("Body updated: {:?}", body);
                        analyzer = SwingAnalyzer::new(body);
                    }
                    ClientMessage::PoseFrame { frame } => {
                        if let Some(tx) = &frame_tx {
                            // 送信で待つとイベントを読めなくなる
                            if !offer_frame(tx, frame)? {
                                dropped_frames += 1;
                                tracing::warn!("Session busy, frame dropped ({} total)", dropped_frames);
                            }
                        }
                    }
                }
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let msg = match event {
                    SessionEvent::SwingFinished(swing) => match analyzer.analyze(&swing) {
                        Ok(report) => {
                            tracing::info!("Swing analysed: {}", report.swing_id);
                            ServerMessage::SwingAnalyzed { report }
                        }
                        Err(e) => {
                            tracing::warn!("Swing analysis failed: {}", e);
                            ServerMessage::AnalysisFailed { error: e.to_string() }
                        }
                    },
                    other => match ServerMessage::from_event(&other) {
                        Some(msg) => msg,
                        None => continue,
                    },
                };
                // 切断後の結果は送れない
                if frame_tx.is_some() {
                    protocol::send_to_sink(&mut sink, &msg).await?;
                }
            }
        }
    }

    session_task.await??;
    Ok(())
}
