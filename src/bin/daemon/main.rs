mod paste_daemon;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use pastemd::config::{self, ConfigStore};
use pastemd::convert::Pandoc;
use pastemd::router::{Collaborators, Router};
use pastemd::CONTROL_PORT;
use paste_daemon::PasteDaemon;

fn main() -> Result<()> {
    // Logging to the data dir is best effort, stderr always works.
    let log_path = config::log_path().ok();
    let _log_guard = pastemd::logging::init(log_path.as_deref())?;

    let store = ConfigStore::default_location()?;
    let (config, rewritten) = store.load_reconciled()?;
    tracing::info!(
        "Loaded config from {}{}",
        store.path().display(),
        if rewritten { " (updated)" } else { "" }
    );

    if let Err(e) = Pandoc::verify(&config.pandoc_path) {
        tracing::warn!("Converter check failed, conversions will fail until it is fixed: {e}");
    }

    let router = Router::new(config, Some(store), Collaborators::system()?);
    let daemon = Arc::new(PasteDaemon::new(router));

    tracing::info!("PasteMD listening for triggers on 127.0.0.1:{CONTROL_PORT} ...");
    Arc::clone(&daemon)
        .listen_for_triggers()
        .join()
        .map_err(|_| anyhow!("Trigger listener thread panicked"))?
}
