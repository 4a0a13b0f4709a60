//! Drives [`SyncOrchestrator::startup`] against a `wiremock`-backed fake
//! upstream node, exercising the catch-up path end to end: wait-for-sync,
//! fetch two blocks, persist them, and rebuild totals/calendar buckets.

use feeindex_constants::NetworkConstants;
use feeindex_indexer::{AggregationEngine, BlockProcessor, StatsStore, SyncOrchestrator, SyncOrchestratorConfig};
use feeindex_persist::{Repository, SqliteRepository};
use feeindex_rpc::{ReceiptWorkerPool, UpstreamClient};
use std::sync::Arc;
use tokio::sync::broadcast;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn block_json(number: u64, timestamp: u64, base_fee_wei: u64) -> serde_json::Value {
    serde_json::json!({
        "number": format!("0x{number:x}"),
        "hash": format!("0x{number:064x}"),
        "timestamp": format!("0x{timestamp:x}"),
        "gasLimit": "0x1c9c380",
        "gasUsed": "0xe4e1c0",
        "baseFeePerGas": format!("0x{base_fee_wei:x}"),
        "transactions": [],
        "uncles": [],
    })
}

#[tokio::test]
async fn startup_catches_up_two_blocks_from_fake_upstream() {
    let server = MockServer::start().await;
    let network = NetworkConstants::mainnet();
    let first = network.london_block();
    let second = first + 1;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("eth_syncing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": false,
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("eth_blockNumber"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": format!("0x{second:x}"),
        })))
        .mount(&server)
        .await;

    for (number, timestamp, base_fee) in
        [(first, network.london_timestamp(), 1_000_000_000u64), (second, network.london_timestamp() + 12, 980_000_000)]
    {
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("eth_getBlockByNumber"))
            .and(body_string_contains(format!("0x{number:x}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1, "result": block_json(number, timestamp, base_fee),
            })))
            .mount(&server)
            .await;
    }

    let url: reqwest::Url = server.uri().parse().unwrap();
    let rpc = UpstreamClient::new(url);
    let receipts = ReceiptWorkerPool::new(rpc.clone(), 4);
    let processor = BlockProcessor::new(rpc.clone(), receipts, network);

    let store = Arc::new(StatsStore::new(300));
    let aggregation = Arc::new(AggregationEngine::new(store.clone(), network));
    let repository = Arc::new(SqliteRepository::connect("sqlite::memory:").await.unwrap());
    let (blocks_tx, _blocks_rx) = broadcast::channel(16);

    let orchestrator = SyncOrchestrator::new(
        rpc,
        processor,
        store.clone(),
        aggregation,
        repository.clone(),
        network,
        SyncOrchestratorConfig::default(),
        blocks_tx,
    );

    orchestrator.startup().await.expect("startup should succeed against the fake upstream");

    assert_eq!(store.stats_len(), 2);
    assert_eq!(store.highest_stats_block(), Some(second));
    assert!(store.get_stats(first).is_some());
    assert!(store.get_stats(second).is_some());

    let persisted = repository.all_block_stats().await.unwrap();
    assert_eq!(persisted.len(), 2);
    assert_eq!(persisted[0].number, first);
    assert_eq!(persisted[1].number, second);
}
