use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use ipnet::IpNet;
use reqwest::Url;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[arg(
        long,
        env = "RELAY_API",
        default_value = "https://api.unblockvpn.io/app/v1/relays"
    )]
    pub relay_api: Url,

    #[arg(long, env = "RELAY_TIMEOUT_SECS", default_value_t = 10)]
    pub relay_timeout_secs: u64,

    #[arg(long, env = "GEOIP_API", default_value = "https://api.ipgeolocation.io/ipgeo")]
    pub geoip_api: Url,

    #[arg(long, env = "GEOIP_API_KEY", hide_env_values = true)]
    pub geoip_api_key: String,

    #[arg(long, env = "GEOIP_TIMEOUT_SECS", default_value_t = 5)]
    pub geoip_timeout_secs: u64,

    /// Last known relay list, used when the relay api is unreachable
    #[arg(long, env = "BACKUP_FILE", default_value = "relays.json")]
    pub backup_file: PathBuf,

    #[arg(
        long,
        env = "UPDATE_PERIOD_SECS",
        default_value_t = 30 * 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub update_period_secs: u64,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: SocketAddr,

    #[arg(long, env = "METRICS_ADDR", default_value = "127.0.0.1:9090")]
    pub metrics_addr: SocketAddr,

    /// Networks answered as protected without a relay lookup, on top of loopback
    #[arg(long = "bypass-nets", env = "BYPASS_NETS", num_args = 1.., value_delimiter = ',')]
    pub bypass_nets: Option<Vec<IpNet>>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["relay-ip-checker", "--geoip-api-key", "secret"])
            .expect("valid args");
        assert_eq!(cli.geoip_api_key, "secret");
        assert_eq!(cli.update_period_secs, 1800);
        assert_eq!(cli.listen_addr.port(), 3000);
        assert_eq!(cli.backup_file.to_str(), Some("relays.json"));
        assert_eq!(cli.relay_api.host_str(), Some("api.unblockvpn.io"));
    }

    #[test]
    fn parses_bypass_nets() {
        let cli = Cli::try_parse_from([
            "relay-ip-checker",
            "--geoip-api-key",
            "secret",
            "--bypass-nets",
            "10.0.0.0/8,192.168.1.0/24",
        ])
        .expect("valid args");
        assert_eq!(cli.bypass_nets.map(|nets| nets.len()), Some(2));
    }

    #[test]
    fn rejects_zero_update_period() {
        let cli = Cli::try_parse_from([
            "relay-ip-checker",
            "--geoip-api-key",
            "secret",
            "--update-period-secs",
            "0",
        ]);
        assert!(cli.is_err());
    }

    #[test]
    fn rejects_invalid_bypass_net() {
        let cli = Cli::try_parse_from([
            "relay-ip-checker",
            "--geoip-api-key",
            "secret",
            "--bypass-nets",
            "10.0.0.0/33",
        ]);
        assert!(cli.is_err());
    }
}
