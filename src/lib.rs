pub mod backup;
pub mod cli;
pub mod client_ip;
pub mod geo_api;
pub mod metrics;
pub mod prometheus;
pub mod refresh;
pub mod relay_api;
pub mod relays;
pub mod server;
pub mod tracing_setup;
pub mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use geo_api::GeoClient;
use ipnet::IpNet;
use relay_api::RelayDirectoryClient;
use relays::{RelayCache, RelaySnapshot};

pub(crate) const USER_AGENT: &str = "relay-ip-checker/v0.1.0";

pub struct App {
    relay_api: RelayDirectoryClient,
    geo: GeoClient,
    relays: RelayCache,
    config: Config,
}

pub struct Config {
    pub backup_file: PathBuf,
    pub update_period: std::time::Duration,
    pub bypass_nets: Vec<IpNet>,
}

impl App {
    pub fn new(relay_api: RelayDirectoryClient, geo: GeoClient, config: Config) -> Self {
        Self {
            relay_api,
            geo,
            relays: RelayCache::default(),
            config,
        }
    }

    pub fn relays(&self) -> Arc<RelaySnapshot> {
        self.relays.load()
    }
}
