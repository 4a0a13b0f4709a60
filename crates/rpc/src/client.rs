use crate::error::{Result, UpstreamError};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{instrument, warn};

/// Tagged HTTP JSON-RPC client for a single upstream Ethereum node.
///
/// Every request carries three metadata tags as request headers
/// (`x-block-number`, `x-method`, `x-update-cache`). These are advisory
/// hints for any intermediating HTTP cache and never affect correctness —
/// the upstream node's JSON-RPC response is the only thing consumed.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    url: reqwest::Url,
    client: reqwest::Client,
}

/// Advisory cache-hint tags attached to a single request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestTags<'a> {
    /// The block number this request concerns, if any.
    pub block_number: Option<u64>,
    /// The JSON-RPC method name.
    pub method: &'a str,
    /// Whether the caller wants a fresh (non-cached) result.
    pub update_cache: bool,
}

impl UpstreamClient {
    /// Construct a client pointed at `url`, using a fresh [`reqwest::Client`].
    pub fn new(url: reqwest::Url) -> Self {
        Self::new_with_client(url, reqwest::Client::new())
    }

    /// Construct a client pointed at `url`, reusing an existing
    /// [`reqwest::Client`] (and its connection pool).
    pub const fn new_with_client(url: reqwest::Url, client: reqwest::Client) -> Self {
        Self { url, client }
    }

    /// The upstream endpoint this client talks to.
    pub const fn url(&self) -> &reqwest::Url {
        &self.url
    }

    #[instrument(skip_all, fields(method = tags.method))]
    async fn call_inner(&self, tags: RequestTags<'_>, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": tags.method,
            "params": params,
        });

        let mut req = self
            .client
            .post(self.url.clone())
            .header("content-type", "application/json")
            .header("x-method", tags.method)
            .header("x-update-cache", tags.update_cache.to_string());
        if let Some(n) = tags.block_number {
            req = req.header("x-block-number", n.to_string());
        }

        let resp = req
            .json(&body)
            .send()
            .await
            .inspect_err(|e| warn!(%e, method = tags.method, "upstream request failed"))?;

        let body: Value = resp
            .error_for_status()?
            .json()
            .await
            .inspect_err(|e| warn!(%e, method = tags.method, "failed to decode upstream response"))?;

        if let Some(err) = body.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or_default();
            let message = err.get("message").and_then(Value::as_str).unwrap_or_default().to_owned();
            return Err(UpstreamError::Rpc { code, message });
        }

        body.get("result").cloned().ok_or_else(|| UpstreamError::Decode("missing result field".into()))
    }

    /// Issue a call and deserialize `result` into `T`.
    async fn get_inner<T: DeserializeOwned>(&self, tags: RequestTags<'_>, params: Value) -> Result<T> {
        let result = self.call_inner(tags, params).await?;
        serde_json::from_value(result).map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    /// `eth_syncing`. Returns `None` when fully synced (`false`), or the
    /// raw sync-progress object otherwise.
    #[instrument(skip(self))]
    pub async fn eth_syncing(&self) -> Result<Option<Value>> {
        let tags = RequestTags { method: "eth_syncing", ..Default::default() };
        let result = self.call_inner(tags, json!([])).await?;
        if result.as_bool() == Some(false) {
            Ok(None)
        } else {
            Ok(Some(result))
        }
    }

    /// `eth_blockNumber`.
    #[instrument(skip(self))]
    pub async fn eth_block_number(&self) -> Result<u64> {
        let tags = RequestTags { method: "eth_blockNumber", ..Default::default() };
        let hex: String = self.get_inner(tags, json!([])).await?;
        parse_hex_u64(&hex)
    }

    /// `eth_getBlockByNumber(number, false)`.
    #[instrument(skip(self))]
    pub async fn get_block_by_number(&self, number: u64, update_cache: bool) -> Result<Option<Value>> {
        let tags = RequestTags { block_number: Some(number), method: "eth_getBlockByNumber", update_cache };
        let params = json!([format!("0x{number:x}"), false]);
        let result = self.call_inner(tags, params).await?;
        Ok(if result.is_null() { None } else { Some(result) })
    }

    /// `eth_getUncleByBlockNumberAndIndex(number, index)`.
    #[instrument(skip(self))]
    pub async fn get_uncle(&self, number: u64, index: u64, update_cache: bool) -> Result<Option<Value>> {
        let tags =
            RequestTags { block_number: Some(number), method: "eth_getUncleByBlockNumberAndIndex", update_cache };
        let params = json!([format!("0x{number:x}"), format!("0x{index:x}")]);
        let result = self.call_inner(tags, params).await?;
        Ok(if result.is_null() { None } else { Some(result) })
    }

    /// `eth_getTransactionReceipt(hash)`.
    #[instrument(skip(self))]
    pub async fn get_transaction_receipt(
        &self,
        hash: &str,
        block_number: u64,
        update_cache: bool,
    ) -> Result<Option<Value>> {
        let tags = RequestTags { block_number: Some(block_number), method: "eth_getTransactionReceipt", update_cache };
        let result = self.call_inner(tags, json!([hash])).await?;
        Ok(if result.is_null() { None } else { Some(result) })
    }
}

/// Parse a `0x`-prefixed hex integer, as returned by most `eth_*` calls.
pub fn parse_hex_u64(s: &str) -> Result<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).map_err(|e| UpstreamError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_block_number() {
        assert_eq!(parse_hex_u64("0x1").unwrap(), 1);
        assert_eq!(parse_hex_u64("0xc5b3e8").unwrap(), 12_965_000);
    }
}
