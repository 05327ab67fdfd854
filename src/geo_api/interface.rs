use std::net::Ipv4Addr;

use super::types::GeoLocation;

#[allow(async_fn_in_trait)]
pub trait GeoLookup {
    async fn lookup(&self, ip: Ipv4Addr) -> Result<GeoLocation, anyhow::Error>;
}
