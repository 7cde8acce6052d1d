use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::state::AppState;
use crate::ws::keepalive::{self, ChannelClosed, ProbeChannel};
use crate::ws::ConnectionSender;

/// Run the actor-per-connection pattern for an accepted WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Keepalive loop: owns the reader half, probes liveness until the
///   connection dies
///
/// The mpsc channel allows any part of the system (the dispense fanout in
/// particular) to push frames to this client by cloning the sender held in
/// the connection registry.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let (ws_sender, ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let conn_id = Uuid::now_v7();
    state.connections.register(conn_id, tx.clone());

    tracing::info!(
        conn_id = %conn_id,
        connections = state.connections.len(),
        "WebSocket client connected"
    );

    // Spawn writer task: forwards mpsc messages to the WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // The keepalive loop owns the reader half for the connection's lifetime.
    // Probes go through the same mpsc channel the fanout uses, so a dead
    // writer fails both paths the same way.
    let mut chan = WsChannel {
        tx,
        rx: ws_receiver,
    };
    keepalive::run(&mut chan, state.keepalive).await;

    // Terminal state reached: tear down and deregister
    writer_handle.abort();
    state.connections.unregister(conn_id);

    tracing::info!(conn_id = %conn_id, "WebSocket client disconnected");
}

/// Writer task: receives messages from the mpsc channel and forwards them
/// to the WebSocket sink.
async fn writer_task(mut ws_sender: SplitSink<WebSocket, Message>, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}

/// Live transport for the keepalive loop: probes are queued on the writer
/// channel, inbound frames come from the reader half.
struct WsChannel {
    tx: ConnectionSender,
    rx: SplitStream<WebSocket>,
}

impl ProbeChannel for WsChannel {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelClosed> {
        // Fails only once the writer task has dropped the receiver
        self.tx
            .send(Message::Text(text.into()))
            .map_err(|_| ChannelClosed)
    }

    async fn recv_text(&mut self) -> Option<String> {
        match self.rx.next().await {
            Some(Ok(Message::Text(text))) => Some(text.as_str().to_owned()),
            Some(Ok(Message::Binary(data))) => {
                Some(String::from_utf8_lossy(&data).into_owned())
            }
            Some(Ok(Message::Ping(data))) => {
                // Respond to protocol pings; the frame itself is liveness
                let _ = self.tx.send(Message::Pong(data));
                Some(String::new())
            }
            Some(Ok(Message::Pong(_))) => Some(String::new()),
            Some(Ok(Message::Close(frame))) => {
                tracing::debug!(reason = ?frame, "Client initiated close");
                None
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "WebSocket receive error");
                None
            }
            // Stream ended — client disconnected
            None => None,
        }
    }
}
