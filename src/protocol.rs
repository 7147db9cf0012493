//! TCP protocol for pose client ↔ swing server communication.
//!
//! The client streams pose frames; the server answers with swing events and
//! the analysis of every finished swing.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::analysis::FullSwingReport;
use crate::config::BodyConfig;
use crate::pose::PoseFrame;
use crate::swing::{SessionEvent, SwingPhase};

// --- Message types ---

/// Client → Server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Body dimensions used for the analysis of following swings.
    SetBody { body: BodyConfig },
    PoseFrame { frame: PoseFrame },
}

/// Server → Client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Ready,
    /// Advisory: required keypoints are not visible.
    GetInFrame,
    /// Address detected; start recording.
    SwingReady { timestamp_ms: u64 },
    PhaseChanged {
        from: SwingPhase,
        to: SwingPhase,
        timestamp_ms: u64,
    },
    SwingAnalyzed { report: FullSwingReport },
    AnalysisFailed { error: String },
}

impl ServerMessage {
    /// Session events that map directly to a message. Finished swings are
    /// analysed first and are reported as `SwingAnalyzed`/`AnalysisFailed`.
    pub fn from_event(event: &SessionEvent) -> Option<Self> {
        match event {
            SessionEvent::GetInFrame => Some(Self::GetInFrame),
            SessionEvent::SwingReady { timestamp_ms } => Some(Self::SwingReady {
                timestamp_ms: *timestamp_ms,
            }),
            SessionEvent::PhaseChanged { from, to, timestamp_ms } => Some(Self::PhaseChanged {
                from: *from,
                to: *to,
                timestamp_ms: *timestamp_ms,
            }),
            SessionEvent::SwingFinished(_) => None,
        }
    }
}

// --- TCP codec helpers ---

pub type MessageStream = Framed<TcpStream, LengthDelimitedCodec>;

/// Create a framed message stream with length-delimited framing.
pub fn message_stream(stream: TcpStream) -> MessageStream {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(1024 * 1024) // 1MB
        .new_codec();
    Framed::new(stream, codec)
}

pub fn encode<T: Serialize>(msg: &T) -> anyhow::Result<Bytes> {
    Ok(Bytes::from(bincode::serialize(msg)?))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> anyhow::Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

/// Send a serializable message (bincode + length prefix).
pub async fn send_message<T: Serialize>(
    stream: &mut MessageStream,
    msg: &T,
) -> anyhow::Result<()> {
    stream.send(encode(msg)?).await?;
    Ok(())
}

/// Send on the write half of a split stream.
pub async fn send_to_sink<S, T>(sink: &mut S, msg: &T) -> anyhow::Result<()>
where
    S: futures::Sink<Bytes, Error = std::io::Error> + Unpin,
    T: Serialize,
{
    sink.send(encode(msg)?).await?;
    Ok(())
}

/// Receive and deserialize a message. `None` when the peer closed the connection.
pub async fn recv_message<T: DeserializeOwned>(
    stream: &mut MessageStream,
) -> anyhow::Result<Option<T>> {
    match stream.next().await {
        Some(Ok(bytes)) => Ok(Some(decode(&bytes)?)),
        Some(Err(e)) => Err(e.into()),
        None => Ok(None),
    }
}
