use std::time::Duration;

use reqwest::{Client, Url};
use tracing::{info, instrument};

use super::interface::RelayDirectory;
use super::types::RelaysResponse;
use crate::metrics::OUTGOING_REQUESTS_COUNTER;
use crate::USER_AGENT;

#[derive(Debug)]
pub struct RelayDirectoryClient {
    client: Client,
    url: Url,
}

impl RelayDirectoryClient {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, anyhow::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, url })
    }
}

impl RelayDirectory for RelayDirectoryClient {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_relays(&self) -> Result<RelaysResponse, anyhow::Error> {
        OUTGOING_REQUESTS_COUNTER
            .with_label_values(&["RELAYS", self.url.path()])
            .inc();

        let resp = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?;
        let relays = resp.json::<RelaysResponse>().await?;

        info!(msg = "Retrieved relays", entries = relays.entries().len());
        Ok(relays)
    }
}
