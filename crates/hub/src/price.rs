use parking_lot::RwLock;
use std::time::Duration;
use tracing::warn;

/// Refresh cadence for the background price poll.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Per-request timeout against the spot-price endpoint.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Coinbase's public ETH/USD spot-price endpoint, matching the daemon this
/// was distilled from.
pub const DEFAULT_ENDPOINT: &str = "https://api.coinbase.com/v2/prices/ETH-USD/spot";

/// Background ETH/USD spot-price poller.
///
/// [`PriceWatcher::get`] returns the last successfully fetched price, or
/// `0.0` before the first successful fetch. A failed poll is logged and
/// ignored — the previous value is kept.
#[derive(Debug)]
pub struct PriceWatcher {
    client: reqwest::Client,
    endpoint: String,
    price: RwLock<f64>,
}

impl PriceWatcher {
    /// Build a watcher against [`DEFAULT_ENDPOINT`] with no price fetched
    /// yet.
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT.to_owned())
    }

    /// Build a watcher against a custom endpoint (used by tests to point
    /// at a mock server).
    pub fn with_endpoint(endpoint: String) -> Self {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build().expect("client builds");
        Self { client, endpoint, price: RwLock::new(0.0) }
    }

    /// Last known ETH/USD spot price. `0.0` until the first successful
    /// fetch.
    pub fn get(&self) -> f64 {
        *self.price.read()
    }

    /// Poll once immediately, then every [`REFRESH_INTERVAL`], forever.
    /// Intended to be driven as one long-lived background task.
    pub async fn run(&self) {
        self.refresh_once().await;
        let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            self.refresh_once().await;
        }
    }

    async fn refresh_once(&self) {
        match self.fetch().await {
            Ok(price) => *self.price.write() = price,
            Err(e) => warn!(error = %e, "failed to refresh ETH/USD spot price, keeping last known value"),
        }
    }

    async fn fetch(&self) -> reqwest::Result<f64> {
        let response: CoinbaseSpotResponse = self.client.get(&self.endpoint).send().await?.json().await?;
        Ok(response.data.amount.parse().unwrap_or(0.0))
    }
}

impl Default for PriceWatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, serde::Deserialize)]
struct CoinbaseSpotResponse {
    data: CoinbaseSpotData,
}

#[derive(Debug, serde::Deserialize)]
struct CoinbaseSpotData {
    amount: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let watcher = PriceWatcher::new();
        assert_eq!(watcher.get(), 0.0);
    }

    #[tokio::test]
    async fn fetch_parses_coinbase_shape() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"base": "ETH", "currency": "USD", "amount": "1234.56"}})),
            )
            .mount(&server)
            .await;

        let watcher = PriceWatcher::with_endpoint(server.uri());
        watcher.refresh_once().await;
        assert_eq!(watcher.get(), 1234.56);
    }
}
