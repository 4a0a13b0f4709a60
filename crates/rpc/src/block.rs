use crate::client::parse_hex_u64;
use crate::error::{Result, UpstreamError};
use feeindex_types::{parse_hex_or_zero, HexU256};
use serde_json::Value;

/// Decoded fields of `eth_getBlockByNumber(n, false)`'s result, restricted
/// to what the block processor needs.
#[derive(Debug, Clone)]
pub struct RawBlock {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: String,
    /// Block timestamp, seconds since epoch.
    pub timestamp: u64,
    /// Gas limit.
    pub gas_limit: HexU256,
    /// Gas used.
    pub gas_used: HexU256,
    /// Base fee per gas. Absent pre-London.
    pub base_fee_per_gas: Option<HexU256>,
    /// Transaction hashes.
    pub transaction_hashes: Vec<String>,
    /// Uncle hashes, in order.
    pub uncle_hashes: Vec<String>,
}

impl RawBlock {
    /// Decode from the raw JSON-RPC result.
    pub fn decode(value: &Value) -> Result<Self> {
        let field = |name: &str| -> Result<&str> {
            value
                .get(name)
                .and_then(Value::as_str)
                .ok_or_else(|| UpstreamError::Decode(format!("missing or non-string field `{name}`")))
        };

        let number = parse_hex_u64(field("number")?)?;
        let timestamp = parse_hex_u64(field("timestamp")?)?;
        let gas_limit = parse_hex_or_zero(field("gasLimit")?).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        let gas_used = parse_hex_or_zero(field("gasUsed")?).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        let base_fee_per_gas = match value.get("baseFeePerGas").and_then(Value::as_str) {
            Some(s) if !s.is_empty() => {
                Some(parse_hex_or_zero(s).map_err(|e| UpstreamError::Decode(e.to_string()))?)
            }
            _ => None,
        };

        let transaction_hashes = value
            .get("transactions")
            .and_then(Value::as_array)
            .map(|txs| txs.iter().filter_map(Value::as_str).map(str::to_owned).collect())
            .unwrap_or_default();

        let uncle_hashes = value
            .get("uncles")
            .and_then(Value::as_array)
            .map(|uncles| uncles.iter().filter_map(Value::as_str).map(str::to_owned).collect())
            .unwrap_or_default();

        Ok(Self {
            number,
            hash: field("hash")?.to_owned(),
            timestamp,
            gas_limit,
            gas_used,
            base_fee_per_gas,
            transaction_hashes,
            uncle_hashes,
        })
    }
}

/// Decoded fields of `eth_getUncleByBlockNumberAndIndex`'s result.
#[derive(Debug, Clone, Copy)]
pub struct RawUncle {
    /// The uncle's own block number.
    pub number: u64,
}

impl RawUncle {
    /// Decode from the raw JSON-RPC result, verifying its hash matches the
    /// hash recorded in the including block's uncle list.
    pub fn decode(value: &Value, expected_hash: &str) -> Result<Self> {
        let hash = value
            .get("hash")
            .and_then(Value::as_str)
            .ok_or_else(|| UpstreamError::Decode("uncle missing hash".into()))?;
        if hash != expected_hash {
            return Err(UpstreamError::Decode(format!(
                "uncle hash mismatch: expected {expected_hash}, got {hash}"
            )));
        }
        let number = value
            .get("number")
            .and_then(Value::as_str)
            .ok_or_else(|| UpstreamError::Decode("uncle missing number".into()))?;
        Ok(Self { number: parse_hex_u64(number)? })
    }
}
