use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use relay_ip_checker::cli::Cli;
use relay_ip_checker::geo_api::GeoClient;
use relay_ip_checker::prometheus::Prometheus;
use relay_ip_checker::refresh::refresh_loop;
use relay_ip_checker::relay_api::RelayDirectoryClient;
use relay_ip_checker::server::ApiServer;
use relay_ip_checker::tracing_setup::{get_subscriber, init_subscriber};
use relay_ip_checker::{App, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Cli::parse();

    let subscriber = get_subscriber(String::from("relay-ip-checker"), args.log_level.clone());
    init_subscriber(subscriber)?;

    let relay_api = RelayDirectoryClient::new(
        args.relay_api.clone(),
        Duration::from_secs(args.relay_timeout_secs),
    )?;
    let geo = GeoClient::new(
        args.geoip_api.clone(),
        args.geoip_api_key.clone(),
        Duration::from_secs(args.geoip_timeout_secs),
    )?;
    let config = Config {
        backup_file: args.backup_file,
        update_period: Duration::from_secs(args.update_period_secs),
        bypass_nets: args.bypass_nets.unwrap_or_default(),
    };
    let app = Arc::new(App::new(relay_api, geo, config));

    info!(msg = "Listening", addr = %args.listen_addr, metrics = %args.metrics_addr);
    let api = ApiServer::new(args.listen_addr).serve(app.clone());
    let metrics = Prometheus::new(args.metrics_addr).serve();

    let mut task_set = tokio::task::JoinSet::new();
    task_set.spawn(async move { refresh_loop(app).await });
    task_set.spawn(async move { Ok(api.await?) });
    task_set.spawn(async move { Ok(metrics.await?) });

    while let Some(res) = task_set.join_next().await {
        res??;
    }

    info!("Exit!");

    Ok(())
}
