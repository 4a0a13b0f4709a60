//! Drives the subscription hub end to end over a real TCP socket: a real
//! websocket client subscribes to the `data` topic, a block is pushed onto
//! the broadcast channel the sync orchestrator would feed, and the client
//! must receive exactly one `eth_subscription` notification for it.

use feeindex_constants::NetworkConstants;
use feeindex_hub::{router, Hub, HubState, PriceWatcher};
use feeindex_indexer::{AggregationEngine, ProcessedBlock, StatsStore};
use feeindex_persist::SqliteRepository;
use feeindex_types::{BlockStats, BlockStatsPercentiles, HexU256};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

fn processed(stats: BlockStats) -> ProcessedBlock {
    ProcessedBlock {
        percentiles: BlockStatsPercentiles::from_sorted(stats.number, &[]),
        base_fee_next: HexU256::ZERO,
        stats,
    }
}

async fn spawn_hub() -> (std::net::SocketAddr, broadcast::Sender<ProcessedBlock>, Arc<Hub>) {
    let store = Arc::new(StatsStore::new(16));
    let aggregation = Arc::new(AggregationEngine::new(store.clone(), NetworkConstants::mainnet()));
    let repository = Arc::new(SqliteRepository::connect("sqlite::memory:").await.unwrap());
    let (blocks_tx, _rx) = broadcast::channel(16);
    let hub = Arc::new(Hub::new());

    let state = HubState {
        hub: hub.clone(),
        store,
        aggregation,
        repository,
        price: Arc::new(PriceWatcher::new()),
        blocks: blocks_tx.clone(),
        version: Arc::from("test"),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, blocks_tx, hub)
}

#[tokio::test]
async fn subscribed_client_receives_broadcast_block() {
    let (addr, blocks_tx, hub) = spawn_hub().await;

    let (mut ws, _) = connect_async(format!("ws://{addr}/")).await.expect("client should connect");

    let subscribe = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_subscribe",
        "params": ["data"],
    });
    ws.send(Message::Text(subscribe.to_string())).await.unwrap();

    let ack = ws.next().await.expect("connection open").expect("valid frame");
    let ack: serde_json::Value = serde_json::from_str(ack.to_text().unwrap()).unwrap();
    assert!(ack.get("result").and_then(serde_json::Value::as_str).is_some(), "expected a subscription id");

    // Give the server's registration a moment to land before broadcasting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(hub.client_count(), 1);

    let block = BlockStats::empty(12_965_005, 1_628_166_900);
    blocks_tx.send(processed(block)).expect("at least one subscriber");

    let notification =
        tokio::time::timeout(Duration::from_secs(2), ws.next()).await.expect("should not time out").unwrap().unwrap();
    let notification: serde_json::Value = serde_json::from_str(notification.to_text().unwrap()).unwrap();

    assert_eq!(notification.get("method").and_then(serde_json::Value::as_str), Some("eth_subscription"));
    let pushed_number = notification
        .pointer("/params/result/block/number")
        .and_then(serde_json::Value::as_u64)
        .expect("block number present in push");
    assert_eq!(pushed_number, 12_965_005);
}

#[tokio::test]
async fn every_subscribed_client_receives_the_same_broadcast() {
    let (addr, blocks_tx, hub) = spawn_hub().await;

    let (mut first, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
    let (mut second, _) = connect_async(format!("ws://{addr}/")).await.unwrap();

    for client in [&mut first, &mut second] {
        let subscribe =
            serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "eth_subscribe", "params": ["blockStats"]});
        client.send(Message::Text(subscribe.to_string())).await.unwrap();
        client.next().await.unwrap().unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(hub.client_count(), 2);

    blocks_tx.send(processed(BlockStats::empty(12_965_010, 1_628_166_822))).expect("at least one subscriber");

    for client in [&mut first, &mut second] {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next()).await.unwrap().unwrap().unwrap();
        let frame: serde_json::Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(frame.get("method").and_then(serde_json::Value::as_str), Some("eth_subscription"));
        assert_eq!(frame.pointer("/params/result/number").and_then(serde_json::Value::as_u64), Some(12_965_010));
    }
}
