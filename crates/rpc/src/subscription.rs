use crate::error::UpstreamError;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{error, info, warn};

/// How long to wait before redialing after the upstream subscription
/// drops or fails to establish.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(12);

/// A reconnecting subscription to the upstream node's `newHeads` feed.
///
/// Delivers decoded header JSON values over an internal channel; the
/// caller drives [`HeadSubscription::run`] as one long-lived task and
/// reads from [`HeadSubscription::recv`] (or owns the receiver directly).
#[derive(Debug)]
pub struct HeadSubscription {
    ws_url: url::Url,
}

impl HeadSubscription {
    /// Build a subscription against the given websocket endpoint.
    pub const fn new(ws_url: url::Url) -> Self {
        Self { ws_url }
    }

    /// Connect, subscribe to `newHeads`, and forward every decoded header
    /// onto `tx` until `tx` is dropped. Reconnects with
    /// [`RECONNECT_BACKOFF`] on any failure, forever.
    pub async fn run(self, tx: mpsc::Sender<Value>) {
        loop {
            if tx.is_closed() {
                return;
            }
            match self.run_once(&tx).await {
                Ok(()) => info!("upstream newHeads subscription closed cleanly"),
                Err(e) => error!(error = %e, "upstream newHeads subscription failed"),
            }
            if tx.is_closed() {
                return;
            }
            warn!(backoff = ?RECONNECT_BACKOFF, "reconnecting to upstream newHeads feed");
            tokio::time::sleep(RECONNECT_BACKOFF).await;
        }
    }

    async fn run_once(&self, tx: &mpsc::Sender<Value>) -> Result<(), UpstreamError> {
        let (mut stream, _) = connect_async(self.ws_url.as_str()).await?;

        let subscribe = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_subscribe",
            "params": ["newHeads"],
        });
        stream.send(Message::Text(subscribe.to_string())).await?;

        // Consume the subscription-id acknowledgement.
        let _ack = stream.next().await;

        while let Some(msg) = stream.next().await {
            let msg = msg?;
            let Message::Text(text) = msg else { continue };
            let parsed: Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "failed to decode newHeads notification, skipping");
                    continue;
                }
            };
            let Some(header) = parsed.pointer("/params/result").cloned() else { continue };
            if tx.send(header).await.is_err() {
                return Ok(());
            }
        }
        Ok(())
    }
}
