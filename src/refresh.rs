use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use crate::backup;
use crate::metrics::{ALLOWED_RELAYS, RELAY_REFRESH_COUNTER};
use crate::relay_api::RelayDirectory;
use crate::relays::{RelayList, RelaySource};
use crate::App;

async fn load_relays(app: &App, source: RelaySource) -> Result<RelayList, anyhow::Error> {
    match source {
        RelaySource::Remote => {
            let resp = app.relay_api.fetch_relays().await?;
            let relays = RelayList::from(&resp);
            if let Err(err) = backup::store(&app.config.backup_file, &resp).await {
                error!(msg = "Failed to update relay backup", ?err);
            }
            Ok(relays)
        }
        RelaySource::Backup => {
            let resp = backup::load(&app.config.backup_file).await?;
            Ok(RelayList::from(&resp))
        }
    }
}

/// Loads relays from the first source that answers. When none does the
/// cached list is kept as is. Each failed source is logged exactly once.
#[instrument(skip(app))]
pub async fn refresh_relays(app: &App) -> Option<RelaySource> {
    info!("Refreshing allowed relays");
    app.relays.begin_refresh();

    let mut failures: Vec<(RelaySource, anyhow::Error)> = Vec::new();
    for source in RelaySource::ORDERED {
        match load_relays(app, source).await {
            Ok(relays) => {
                if !failures.is_empty() {
                    warn!(msg = "Loaded relays from fallback source", %source, ?failures);
                }
                info!(msg = "Updated allowed relays", %source, relays = relays.len());
                RELAY_REFRESH_COUNTER
                    .with_label_values(&[source.as_str(), "success"])
                    .inc();
                ALLOWED_RELAYS.set(relays.len() as i64);
                app.relays.finish_refresh(Some((relays, source)));
                return Some(source);
            }
            Err(err) => {
                RELAY_REFRESH_COUNTER
                    .with_label_values(&[source.as_str(), "failure"])
                    .inc();
                failures.push((source, err));
            }
        }
    }

    app.relays.finish_refresh(None);
    let current = app.relays.load();
    error!(
        msg = "No relay source available, keeping cached relays",
        ?failures,
        cached = current.relays.len(),
        updated_at = ?current.updated_at
    );
    None
}

pub async fn refresh_loop(app: Arc<App>) -> Result<(), anyhow::Error> {
    info!(
        msg = "Starting relay refresh loop",
        period_secs = app.config.update_period.as_secs()
    );
    let mut interval = tokio::time::interval(app.config.update_period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        refresh_relays(&app).await;
    }
}
