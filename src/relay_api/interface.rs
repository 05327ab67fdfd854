use super::types::RelaysResponse;

#[allow(async_fn_in_trait)]
pub trait RelayDirectory {
    async fn fetch_relays(&self) -> Result<RelaysResponse, anyhow::Error>;
}
