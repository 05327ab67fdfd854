use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, instrument};

use crate::relay_api::RelaysResponse;

#[instrument]
pub async fn load(path: &Path) -> Result<RelaysResponse, anyhow::Error> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read backup {}", path.display()))?;
    let relays = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse backup {}", path.display()))?;
    Ok(relays)
}

/// Writes the snapshot next to `path` first and renames it over, so a
/// partially written backup is never picked up by `load`.
#[instrument(skip(relays))]
pub async fn store(path: &Path, relays: &RelaysResponse) -> Result<(), anyhow::Error> {
    let payload = serde_json::to_vec_pretty(relays)?;
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, &payload)
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if let Err(err) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(anyhow::Error::from(err)
            .context(format!("failed to replace backup {}", path.display())));
    }
    debug!(msg = "Stored relay backup", bytes = payload.len());
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
