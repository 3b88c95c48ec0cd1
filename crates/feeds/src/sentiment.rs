//! Crypto Fear & Greed index (alternative.me).

use crate::FeedError;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const FNG_URL: &str = "https://api.alternative.me/fng/";

/// Latest Fear & Greed reading.
#[derive(Debug, Clone, PartialEq)]
pub struct FearGreedIndex {
    /// Score from 0 (extreme fear) to 100 (extreme greed)
    pub value: u8,
    /// Sentiment label ("Fear", "Greed", ...)
    pub classification: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct FngResponse {
    data: Vec<FngEntry>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: String,
    value_classification: String,
    timestamp: String,
}

/// Fetch the current Fear & Greed index.
pub async fn fetch_fear_and_greed(client: &reqwest::Client) -> Result<FearGreedIndex, FeedError> {
    let response = client.get(FNG_URL).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status(status.as_u16()));
    }

    let body: FngResponse = response.json().await?;
    parse_entry(body)
}

fn parse_entry(body: FngResponse) -> Result<FearGreedIndex, FeedError> {
    let entry = body
        .data
        .into_iter()
        .next()
        .ok_or_else(|| FeedError::Parse("empty fng data array".into()))?;

    let value = entry
        .value
        .parse::<u8>()
        .map_err(|e| FeedError::Parse(format!("fng value: {e}")))?;
    let ts = entry
        .timestamp
        .parse::<i64>()
        .map_err(|e| FeedError::Parse(format!("fng timestamp: {e}")))?;
    let updated_at = DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| FeedError::Parse(format!("fng timestamp out of range: {ts}")))?;

    Ok(FearGreedIndex {
        value,
        classification: entry.value_classification,
        updated_at,
    })
}

impl FearGreedIndex {
    /// Render the index the way the bots report it.
    pub fn to_message(&self) -> String {
        format!(
            "📊 <b>Crypto Fear &amp; Greed Index</b>\n\
             💡 Score: {} / 100\n\
             🔎 Sentiment: {}\n\
             🕒 Last updated: {}",
            self.value,
            self.classification,
            self.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_fng_entry() {
        let body: FngResponse = serde_json::from_str(
            r#"{"data": [{"value": "54", "value_classification": "Neutral", "timestamp": "1756252800"}]}"#,
        )
        .unwrap();

        let index = parse_entry(body).unwrap();
        assert_eq!(index.value, 54);
        assert_eq!(index.classification, "Neutral");
        assert!(index.to_message().contains("54 / 100"));
    }

    #[test]
    fn empty_data_is_an_error() {
        let body: FngResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(parse_entry(body).is_err());
    }
}
