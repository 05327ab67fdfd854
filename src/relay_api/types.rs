use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::relays::RelayList;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_addr_in: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RelayGroup {
    pub relays: Vec<RelayEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlatRelayEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// Relay directory payload. Older upstreams return a single flat list,
/// newer ones group relays by tunnel protocol.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RelaysResponse {
    Flat {
        relays: Vec<FlatRelayEntry>,
    },
    Grouped {
        openvpn: RelayGroup,
        wireguard: RelayGroup,
    },
}

impl RelaysResponse {
    /// Raw address strings across every relay group, duplicates included.
    /// Relays published without an address are `None`.
    pub fn entries(&self) -> Vec<Option<&str>> {
        match self {
            Self::Flat { relays } => relays.iter().map(|relay| relay.ip.as_deref()).collect(),
            Self::Grouped { openvpn, wireguard } => openvpn
                .relays
                .iter()
                .chain(wireguard.relays.iter())
                .map(|relay| relay.ipv4_addr_in.as_deref())
                .collect(),
        }
    }
}

impl From<&RelaysResponse> for RelayList {
    fn from(value: &RelaysResponse) -> Self {
        let (valid, invalid): (Vec<_>, Vec<_>) = value
            .entries()
            .into_iter()
            .map(|entry| match entry {
                Some(raw) => raw.trim().parse::<Ipv4Addr>().map_err(|_| raw),
                None => Err("<missing>"),
            })
            .partition(Result::is_ok);
        if !invalid.is_empty() {
            let invalid: Vec<&str> = invalid.into_iter().filter_map(Result::err).collect();
            error!(msg = "Skipping relays without a valid ipv4 address", ?invalid);
        }
        valid.into_iter().filter_map(Result::ok).collect()
    }
}
