//! Bitcoin node RPC client.
//!
//! Thin wrapper around a Core-compatible JSON-RPC endpoint, used to turn
//! a txid into a [`TransactionRecord`]. On-chain inputs carry no value of
//! their own - the amount lives on the previous transaction's output - so
//! each vin costs one extra `getrawtransaction` round trip.

use crate::amount::Amount;
use crate::transaction::TransactionRecord;
use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// RPC client configuration
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// RPC URL (e.g., "http://127.0.0.1:8332")
    pub url: String,
    /// RPC username
    pub user: String,
    /// RPC password
    pub pass: String,
    /// Request timeout
    pub timeout: Duration,
}

impl RpcConfig {
    /// Read the endpoint from TXFLOW_RPC_URL / TXFLOW_RPC_USER /
    /// TXFLOW_RPC_PASS, defaulting to a local mainnet node.
    pub fn from_env() -> RpcConfig {
        RpcConfig {
            url: std::env::var("TXFLOW_RPC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8332".to_string()),
            user: std::env::var("TXFLOW_RPC_USER").unwrap_or_default(),
            pass: std::env::var("TXFLOW_RPC_PASS").unwrap_or_default(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<Value>,
}

pub struct NodeClient {
    client: Client,
    config: RpcConfig,
}

impl NodeClient {
    pub fn new(config: RpcConfig) -> Result<NodeClient> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to create HTTP client")?;
        Ok(NodeClient { client, config })
    }

    /// Make an RPC call
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(&self.config.url)
            .basic_auth(&self.config.user, Some(&self.config.pass))
            .json(&body)
            .send()
            .await
            .context("RPC request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("RPC request failed with status: {}", status);
        }

        let json: RpcResponse = response
            .json()
            .await
            .context("failed to parse RPC response")?;

        if let Some(error) = json.error {
            if !error.is_null() {
                bail!("RPC error: {}", error);
            }
        }

        json.result.context("RPC response missing result")
    }

    /// Verbose `getrawtransaction`. Requires txindex on the node for
    /// transactions outside the wallet.
    pub async fn get_raw_transaction(&self, txid: &str) -> Result<Value> {
        self.call("getrawtransaction", serde_json::json!([txid, true]))
            .await
    }

    /// Build a [`TransactionRecord`] for `txid`: one (id, amount) pair per
    /// vin, resolved through the referenced previous output, and one per
    /// vout taken directly. Ids are synthesized as `input_<i>` /
    /// `output_<i>` in insertion order.
    pub async fn fetch_transaction_record(&self, txid: &str) -> Result<TransactionRecord> {
        validate_txid(txid)?;
        let tx = self
            .get_raw_transaction(txid)
            .await
            .with_context(|| format!("failed to fetch transaction {}", txid))?;

        let mut record = TransactionRecord::new();

        let vin = tx
            .get("vin")
            .and_then(|v| v.as_array())
            .context("transaction missing vin array")?;
        for (i, input) in vin.iter().enumerate() {
            if input.get("coinbase").is_some() {
                bail!("coinbase transactions have no spendable input values to analyze");
            }
            let prev_txid = input
                .get("txid")
                .and_then(|v| v.as_str())
                .with_context(|| format!("vin[{}] missing txid", i))?;
            let vout_index = input
                .get("vout")
                .and_then(|v| v.as_u64())
                .with_context(|| format!("vin[{}] missing vout index", i))?;

            let prev = self
                .get_raw_transaction(prev_txid)
                .await
                .with_context(|| format!("failed to fetch previous transaction {}", prev_txid))?;
            let value = prev
                .get("vout")
                .and_then(|v| v.as_array())
                .and_then(|outs| outs.get(vout_index as usize))
                .and_then(|out| out.get("value"))
                .with_context(|| {
                    format!("previous output {}:{} not found", prev_txid, vout_index)
                })?;
            record.add_input(format!("input_{}", i), amount_from_json(value)?)?;
        }

        let vout = tx
            .get("vout")
            .and_then(|v| v.as_array())
            .context("transaction missing vout array")?;
        for (i, output) in vout.iter().enumerate() {
            let value = output
                .get("value")
                .with_context(|| format!("vout[{}] missing value", i))?;
            record.add_output(format!("output_{}", i), amount_from_json(value)?)?;
        }

        Ok(record)
    }
}

/// Convert a JSON amount to satoshis through its decimal text.
///
/// Relies on serde_json's arbitrary_precision feature keeping the node's
/// 8-decimal values as text, so they never round-trip through f64.
fn amount_from_json(value: &Value) -> Result<Amount> {
    match value {
        Value::Number(n) => Amount::from_btc_str(&n.to_string()),
        other => bail!("amount is not a number: {}", other),
    }
}

fn validate_txid(txid: &str) -> Result<()> {
    let bytes = hex::decode(txid).with_context(|| format!("txid is not hex: {}", txid))?;
    if bytes.len() != 32 {
        bail!("txid must be 32 bytes (64 hex characters), got {}", txid.len());
    }
    Ok(())
}
