//! Per-connection liveness management.
//!
//! Each accepted WebSocket gets one keepalive loop for the lifetime of the
//! connection. The loop repeatedly sends a JSON `{"type":"ping"}` probe and
//! waits (bounded) for any inbound frame. Any inbound frame — a structured
//! pong or unparseable garbage — counts as evidence of liveness; only
//! transport failures (probe timeout, send error, peer close) end the loop.

use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Canonical liveness probe frame.
pub const PING_FRAME: &str = r#"{"type":"ping"}"#;

/// Keepalive states. `Closed` is terminal — a reconnecting client gets a
/// fresh loop instance, never a resurrected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Connected,
    AwaitingResponse,
    Closed,
}

/// Tunables for the keepalive loop, taken from server config.
#[derive(Debug, Clone, Copy)]
pub struct KeepalivePolicy {
    /// How long to wait for any inbound frame after a probe.
    pub pong_timeout: Duration,
    /// Idle gap between probes while the peer is responsive.
    /// Zero re-probes immediately.
    pub probe_interval: Duration,
}

impl KeepalivePolicy {
    pub fn new(pong_timeout_secs: u64, probe_interval_secs: u64) -> Self {
        Self {
            pong_timeout: Duration::from_secs(pong_timeout_secs),
            probe_interval: Duration::from_secs(probe_interval_secs),
        }
    }
}

/// The transport is gone: the peer hung up or the writer task died.
#[derive(Debug)]
pub struct ChannelClosed;

/// Duplex text-frame transport as seen by the keepalive loop.
/// Implemented by the live WebSocket halves in the actor and by a mock
/// channel in tests, so the liveness contract is testable without a socket.
pub trait ProbeChannel {
    /// Send a text frame to the peer. Err means the transport failed.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), ChannelClosed>> + Send;

    /// Next inbound frame from the peer. None means the peer closed the
    /// channel or the transport errored.
    fn recv_text(&mut self) -> impl Future<Output = Option<String>> + Send;
}

#[derive(Deserialize)]
struct InboundFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Classify an inbound frame for logging. Parse failures are non-fatal:
/// the frame already proved the peer is alive.
fn note_inbound(frame: &str) {
    match serde_json::from_str::<InboundFrame>(frame) {
        Ok(f) if f.kind.as_deref() == Some("pong") => {
            tracing::trace!("Received pong from client");
        }
        Ok(_) => {
            tracing::trace!("Inbound frame counted as liveness");
        }
        Err(_) => {
            tracing::debug!("Non-JSON inbound frame counted as liveness");
        }
    }
}

/// Drive the keepalive state machine until the connection dies.
///
/// Returns the terminal state (always `Closed`). The caller owns
/// registry cleanup once this returns.
pub async fn run<C: ProbeChannel>(chan: &mut C, policy: KeepalivePolicy) -> LoopState {
    let mut state = LoopState::Connected;

    loop {
        match state {
            LoopState::Connected => {
                if !policy.probe_interval.is_zero() {
                    tokio::time::sleep(policy.probe_interval).await;
                }
                state = match chan.send_text(PING_FRAME.to_string()).await {
                    Ok(()) => LoopState::AwaitingResponse,
                    Err(ChannelClosed) => {
                        tracing::debug!("Probe send failed, closing connection");
                        LoopState::Closed
                    }
                };
            }
            LoopState::AwaitingResponse => {
                state = match timeout(policy.pong_timeout, chan.recv_text()).await {
                    Ok(Some(frame)) => {
                        note_inbound(&frame);
                        LoopState::Connected
                    }
                    Ok(None) => {
                        tracing::debug!("Peer closed the channel");
                        LoopState::Closed
                    }
                    Err(_) => {
                        tracing::warn!("Probe timeout, closing connection");
                        LoopState::Closed
                    }
                };
            }
            LoopState::Closed => return LoopState::Closed,
        }
    }
}
