//! Headless stand-in for the desktop shell: decides what to tell the operator
//! at startup, runs the service, and accepts new key selections.

use std::{future::Future, net::SocketAddr, path::Path};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{ConfigStore, Configuration};
use crate::keys;
use crate::server::{AppState, ServiceHandle};

/// Starts the service on `addr` and keeps it up until `shutdown` resolves.
///
/// The service starts whether or not keys have been selected; requests made
/// before then get error responses.
pub async fn serve<F>(addr: SocketAddr, store: ConfigStore, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    report_readiness(&store);
    let handle = ServiceHandle::start(addr, AppState::new(store)).await?;
    handle.run_until(shutdown).await
}

fn report_readiness(store: &ConfigStore) {
    match store.load() {
        Ok(config) if config.is_complete() => {
            info!(config = %store.path().display(), "key configuration complete");
        }
        Ok(_) => {
            warn!(
                config = %store.path().display(),
                "key configuration incomplete; select keys with `configure`"
            );
        }
        Err(error) => {
            warn!(%error, "key configuration unreadable");
        }
    }
}

/// Validates the pair of key files and, if accepted, replaces the stored
/// configuration with them. A running service picks them up on its next request.
pub fn configure(store: &ConfigStore, public_key: &Path, private_key: &Path) -> Result<Configuration> {
    let config = keys::validate_selection(public_key, private_key)
        .context("rejecting key selection")?;
    store.save(&config)?;
    info!(config = %store.path().display(), "key configuration saved");
    Ok(config)
}
