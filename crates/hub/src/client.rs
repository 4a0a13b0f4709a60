use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Idle read deadline; reset on every inbound message (including pongs).
pub const READ_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline for a single outbound write.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Keepalive ping cadence, comfortably inside [`READ_IDLE_TIMEOUT`].
pub const PING_INTERVAL: Duration = Duration::from_secs(54);

/// Maximum accepted inbound message size, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 512;

/// Drives a client's outbound half: forwards queued frames, coalescing
/// whatever is already buffered into one write, and pings on
/// [`PING_INTERVAL`]. Returns when `rx` closes or a write fails/times out.
pub async fn write_pump(
    mut sink: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
) {
    let mut ping_ticker = tokio::time::interval(PING_INTERVAL);
    ping_ticker.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(first) = frame else { return };
                let mut coalesced = first;
                while let Ok(next) = rx.try_recv() {
                    coalesced.push('\n');
                    coalesced.push_str(&next);
                }
                if send_with_deadline(&mut sink, Message::Text(coalesced)).await.is_err() {
                    return;
                }
            }
            _ = ping_ticker.tick() => {
                if send_with_deadline(&mut sink, Message::Ping(Vec::new())).await.is_err() {
                    return;
                }
            }
        }
    }
}

async fn send_with_deadline(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: Message,
) -> Result<(), ()> {
    match tokio::time::timeout(WRITE_TIMEOUT, sink.send(msg)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            warn!(error = %e, "websocket write failed");
            Err(())
        }
        Err(_) => {
            warn!("websocket write timed out");
            Err(())
        }
    }
}

/// Drives a client's inbound half: reads frames until the idle deadline
/// elapses, the peer closes the connection, or an oversized/unparseable
/// frame arrives. Each valid text frame is handed to `on_message`.
pub async fn read_pump(
    mut stream: futures::stream::SplitStream<WebSocket>,
    mut on_message: impl FnMut(String),
) {
    loop {
        let next = tokio::time::timeout(READ_IDLE_TIMEOUT, stream.next()).await;
        let Ok(Some(Ok(msg))) = next else { return };
        match msg {
            Message::Text(text) => {
                if text.len() > MAX_MESSAGE_SIZE {
                    warn!(len = text.len(), "inbound message exceeds size limit, dropping connection");
                    return;
                }
                on_message(text);
            }
            Message::Close(_) => return,
            // Pong/Ping/Binary reset the idle deadline simply by having
            // been received; nothing else to do.
            _ => {}
        }
    }
}
