//! The run lifecycle: hydrate, fan out sources, reap orphans.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info};

use nbsync_netbox::{NetboxClient, NetboxInventory, RemoteError};
use nbsync_source::new_source;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("netbox client: {0}")]
    Client(#[from] RemoteError),
    #[error("inventory init: {0}")]
    Init(#[from] nbsync_netbox::InventoryError),
    #[error("{failed} of {total} sources failed")]
    SourcesFailed { failed: usize, total: usize },
}

pub async fn run(config: Config) -> Result<(), RunError> {
    let ca_file = (!config.netbox.ca_file.is_empty())
        .then(|| Path::new(&config.netbox.ca_file).to_path_buf());
    let client = Arc::new(NetboxClient::new(
        &config.netbox.base_url(),
        &config.netbox.api_token,
        config.netbox.validate_cert,
        config.netbox.timeout_secs(),
        ca_file.as_deref(),
    )?);

    let nbi = Arc::new(NetboxInventory::new(
        config.netbox.inventory_config(),
        client,
    ));
    nbi.init().await?;

    let total = config.sources.len();
    let mut workers = JoinSet::new();
    for source_config in config.sources {
        let nbi = nbi.clone();
        workers.spawn(async move {
            let name = source_config.name.clone();
            let result = async {
                let mut source = new_source(&source_config, &nbi).await?;
                source.init().await?;
                source.sync(&nbi).await
            }
            .await;
            (name, result)
        });
    }

    let mut failed = 0usize;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((name, Ok(()))) => info!(source = %name, "source synced"),
            Ok((name, Err(e))) => {
                failed += 1;
                error!(source = %name, error = %e, "source failed");
            }
            Err(e) => {
                failed += 1;
                error!(error = %e, "source worker panicked");
            }
        }
    }

    if failed > 0 {
        // Orphan deletion on a partial view would reap objects the
        // failed sources still own.
        info!("skipping orphan deletion after source failures");
        return Err(RunError::SourcesFailed { failed, total });
    }

    info!(
        orphans = nbi.orphan_count().await,
        hard = config.netbox.remove_orphans,
        "reaping orphans"
    );
    nbi.delete_orphans(config.netbox.remove_orphans).await;
    Ok(())
}
