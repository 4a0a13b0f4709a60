use crate::client::{read_pump, write_pump};
use crate::error::ClientProtocolError;
use crate::hub::{Hub, Topic};
use crate::price::PriceWatcher;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use feeindex_indexer::{AggregationEngine, ProcessedBlock};
use feeindex_persist::Repository;
use feeindex_types::rpcmsg::{JsonRpcError, JsonRpcMessage};
use feeindex_types::wire::{AggregatesData, BlockData, Health, HealthStatus, InitialData};
use feeindex_types::BlockStats;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::instrument;

/// Shared state handed to every axum handler.
#[derive(Clone)]
pub struct HubState<R: Repository> {
    /// The subscription hub.
    pub hub: Arc<Hub>,
    /// The in-memory stats store.
    pub store: Arc<feeindex_indexer::StatsStore>,
    /// The aggregation engine.
    pub aggregation: Arc<AggregationEngine>,
    /// The persistence repository (used for `GetMissingBlockNumbers`-style
    /// diagnostics; not on the per-block hot path).
    pub repository: Arc<R>,
    /// The USD price watcher.
    pub price: Arc<PriceWatcher>,
    /// Broadcast of every processed block, fed by the sync orchestrator.
    pub blocks: broadcast::Sender<ProcessedBlock>,
    /// Indexer software version, reported in every `BlockData` push.
    pub version: Arc<str>,
}

/// Build the axum router: `/` for the websocket upgrade, `/health` for
/// liveness.
pub fn router<R: Repository>(state: HubState<R>) -> axum::Router {
    axum::Router::new()
        .route("/", get(ws_handler::<R>))
        .route("/health", get(health_handler::<R>))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler<R: Repository>(State(state): State<HubState<R>>) -> impl IntoResponse {
    Json(Health { status: HealthStatus::Ok, blocks: state.store.stats_len() })
}

async fn ws_handler<R: Repository>(
    ws: WebSocketUpgrade,
    State(state): State<HubState<R>>,
) -> impl IntoResponse {
    ws.max_message_size(crate::client::MAX_MESSAGE_SIZE).on_upgrade(move |socket| handle_socket(socket, state))
}

#[instrument(skip_all)]
async fn handle_socket<R: Repository>(socket: WebSocket, state: HubState<R>) {
    let (id, rx) = state.hub.register();
    let (sink, stream) = socket.split();

    let write_task = tokio::spawn(write_pump(sink, rx));
    let mut block_rx = state.blocks.subscribe();
    let hub_for_broadcast = state.hub.clone();
    let version_for_broadcast = state.version.clone();
    let store_for_broadcast = state.store.clone();
    let aggregation_for_broadcast = state.aggregation.clone();
    let price_for_broadcast = state.price.clone();
    let broadcast_task = tokio::spawn(async move {
        while let Ok(processed) = block_rx.recv().await {
            push_block_update(
                &hub_for_broadcast,
                &store_for_broadcast,
                &aggregation_for_broadcast,
                &price_for_broadcast,
                &version_for_broadcast,
                processed,
            );
        }
    });

    let hub = state.hub.clone();
    read_pump(stream, move |text| {
        let response = dispatch(&state, id, &text);
        if let Some(response) = response {
            hub.send_to(id, response);
        }
    })
    .await;

    broadcast_task.abort();
    write_task.abort();
    state.hub.unregister(id);
}

fn dispatch<R: Repository>(state: &HubState<R>, client_id: u64, text: &str) -> Option<String> {
    let request: JsonRpcMessage = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            let err: JsonRpcError = ClientProtocolError::Malformed(e.to_string()).into();
            return Some(
                serde_json::to_string(&JsonRpcMessage::error_response(None, err)).expect("serializable"),
            );
        }
    };
    let id = request.id.clone().unwrap_or(Value::Null);
    let method = request.method.clone().unwrap_or_default();
    let params = request.params.clone().unwrap_or(Value::Array(Vec::new()));

    let result = handle_method(state, client_id, &method, &params);
    let response = match result {
        Ok(value) => JsonRpcMessage::response(id, value),
        Err(err) => JsonRpcMessage::error_response(Some(id), err.into()),
    };
    Some(serde_json::to_string(&response).expect("serializable"))
}

fn handle_method<R: Repository>(
    state: &HubState<R>,
    client_id: u64,
    method: &str,
    params: &Value,
) -> Result<Value, ClientProtocolError> {
    match method {
        "eth_subscribe" => {
            let topic_name = params.get(0).and_then(Value::as_str).unwrap_or_default();
            let topic = crate::hub::Topic::parse(topic_name)
                .ok_or_else(|| ClientProtocolError::UnknownTopic(topic_name.to_owned()))?;
            let sub_id = state.hub.subscribe(client_id, topic).ok_or(ClientProtocolError::ClientGone)?;
            Ok(json!(sub_id))
        }
        "eth_unsubscribe" => {
            let sub_id = params.get(0).and_then(Value::as_str).unwrap_or_default();
            state.hub.unsubscribe(client_id, sub_id);
            Ok(json!("0x0"))
        }
        "eth_syncing" => Ok(json!(false)),
        "internal_getInitialData" => {
            let count = params.get(0).and_then(Value::as_u64).unwrap_or(300) as usize;
            Ok(serde_json::to_value(build_initial_data(state, count)).expect("serializable"))
        }
        "internal_getInitialAggregatesData" => {
            let count = params.get(0).and_then(Value::as_u64).unwrap_or(24) as usize;
            Ok(serde_json::to_value(AggregatesData {
                totals_per_hour: state.aggregation.hourly(count),
                totals_per_day: state.aggregation.daily(count),
                totals_per_month: state.aggregation.monthly(count),
            })
            .expect("serializable"))
        }
        other => Err(ClientProtocolError::UnknownMethod(other.to_owned())),
    }
}

fn build_initial_data<R: Repository>(state: &HubState<R>, count: usize) -> InitialData {
    let blocks = state.store.latest_tail(count);
    let latest_number = state.store.latest_block().get();
    let data = latest_block_data(state, latest_number);
    InitialData { block_number: latest_number, blocks, data }
}

fn latest_block_data<R: Repository>(state: &HubState<R>, number: u64) -> BlockData {
    let block = state.store.get_stats(number).unwrap_or_else(|| feeindex_types::BlockStats::empty(number, 0));
    render_block_data(state, block)
}

fn render_block_data<R: Repository>(state: &HubState<R>, block: BlockStats) -> BlockData {
    let totals = state.store.get_totals(block.number).unwrap_or(feeindex_types::CumulativeTotals::ZERO);
    let now = block.timestamp;
    let hour = state.aggregation.totals_time_delta(now.saturating_sub(3600), now).unwrap_or_else(|_| zero_window());
    let day = state.aggregation.totals_time_delta(now.saturating_sub(86_400), now).unwrap_or_else(|_| zero_window());
    let week =
        state.aggregation.totals_time_delta(now.saturating_sub(7 * 86_400), now).unwrap_or_else(|_| zero_window());
    let month =
        state.aggregation.totals_time_delta(now.saturating_sub(30 * 86_400), now).unwrap_or_else(|_| zero_window());

    let base_fee_next = feeindex_indexer::compute_base_fee_next(block.base_fee, block.gas_used, block.gas_target);

    BlockData {
        base_fee_next,
        block,
        clients: state.hub.client_count(),
        totals,
        totals_hour: hour,
        totals_day: day,
        totals_week: week,
        totals_month: month,
        usd_price: state.price.get(),
        version: state.version.to_string(),
    }
}

fn zero_window() -> feeindex_types::WindowTotals {
    feeindex_types::WindowTotals {
        id: "0:0".to_owned(),
        burned: Default::default(),
        rewards: Default::default(),
        tips: Default::default(),
        issuance: Default::default(),
        duration: 0,
    }
}

fn push_block_update(
    hub: &Hub,
    store: &feeindex_indexer::StatsStore,
    aggregation: &AggregationEngine,
    price: &PriceWatcher,
    version: &str,
    processed: ProcessedBlock,
) {
    let block = processed.stats;
    let totals = store.get_totals(block.number).unwrap_or(feeindex_types::CumulativeTotals::ZERO);
    let now = block.timestamp;
    let window = |back: u64| aggregation.totals_time_delta(now.saturating_sub(back), now).unwrap_or_else(|_| zero_window());

    let data = BlockData {
        base_fee_next: processed.base_fee_next,
        block,
        clients: hub.client_count(),
        totals,
        totals_hour: window(3600),
        totals_day: window(86_400),
        totals_week: window(7 * 86_400),
        totals_month: window(30 * 86_400),
        usd_price: price.get(),
        version: version.to_owned(),
    };

    let payload = serde_json::to_value(&data).expect("serializable");
    hub.broadcast(Topic::Data, |sub_id| {
        serde_json::to_string(&JsonRpcMessage::subscription(sub_id, payload.clone())).expect("serializable")
    });
    hub.broadcast(Topic::BlockStats, |sub_id| {
        let block_payload = serde_json::to_value(data.block).expect("serializable");
        serde_json::to_string(&JsonRpcMessage::subscription(sub_id, block_payload)).expect("serializable")
    });
}
