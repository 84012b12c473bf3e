use std::time::Duration;

use super::client::HttpClient;
use async_trait::async_trait;

/// Identifies this consumer to the feed and forecast providers; the National
/// Weather Service API rejects requests without a User-Agent.
const USER_AGENT: &str = concat!("transit_board/", env!("CARGO_PKG_VERSION"));

/// Bounded wait for any single upstream request. On expiry the request
/// resolves to an error rather than blocking the run.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self(client)
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
