//! Etherscan gas oracle fetcher.

use crate::FeedError;
use serde::Deserialize;

const GAS_ORACLE_URL: &str = "https://api.etherscan.io/api";

/// Current gas price tiers in gwei.
#[derive(Debug, Clone, PartialEq)]
pub struct GasOracle {
    pub safe: f64,
    pub propose: f64,
    pub fast: f64,
}

#[derive(Debug, Deserialize)]
struct GasResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GasResult {
    #[serde(rename = "SafeGasPrice")]
    safe_gas_price: String,
    #[serde(rename = "ProposeGasPrice")]
    propose_gas_price: String,
    #[serde(rename = "FastGasPrice")]
    fast_gas_price: String,
}

/// Fetch current ETH gas prices from the Etherscan gas oracle.
pub async fn fetch_eth_gas(
    client: &reqwest::Client,
    api_key: &str,
) -> Result<GasOracle, FeedError> {
    let response = client
        .get(GAS_ORACLE_URL)
        .query(&[
            ("module", "gastracker"),
            ("action", "gasoracle"),
            ("apikey", api_key),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status(status.as_u16()));
    }

    let body: GasResponse = response.json().await?;
    parse_oracle(body)
}

fn parse_oracle(body: GasResponse) -> Result<GasOracle, FeedError> {
    // Etherscan reports errors with status "0" and a string result
    if body.status != "1" {
        let detail = body
            .result
            .as_str()
            .map(str::to_string)
            .unwrap_or(body.message);
        return Err(FeedError::Upstream(detail));
    }

    let result: GasResult = serde_json::from_value(body.result)?;
    let parse = |name: &str, raw: &str| {
        raw.parse::<f64>()
            .map_err(|e| FeedError::Parse(format!("{name}: {e}")))
    };

    Ok(GasOracle {
        safe: parse("SafeGasPrice", &result.safe_gas_price)?,
        propose: parse("ProposeGasPrice", &result.propose_gas_price)?,
        fast: parse("FastGasPrice", &result.fast_gas_price)?,
    })
}

impl GasOracle {
    /// Render the oracle the way the bots report it.
    pub fn to_message(&self) -> String {
        format!(
            "⛽ <b>ETH Gas Prices</b>\n\
             🐢 Safe: {:.1} gwei\n\
             🚶 Propose: {:.1} gwei\n\
             🚀 Fast: {:.1} gwei",
            self.safe, self.propose, self.fast
        )
    }
}
