//! Background refresh of installation metadata.
//!
//! After a random delay in `[0, splay)` the refresher rewrites the runtime
//! metadata values, then repeats every `interval` until shut down. The
//! random delay spreads the first refresh of many instances started at
//! once. Refresh failures are logged and the loop carries on.
//!
//! Services may block; each refresh runs on tokio's blocking pool.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::config::RefresherConfig;
use crate::error::{MetaError, MetaResult};
use crate::metadata::{write_values, INSTALLATION_ID};
use crate::service::MetadataService;

struct Running {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Periodic metadata refresher running on the ambient tokio runtime.
pub struct MetadataRefresher {
    service: Arc<dyn MetadataService>,
    config: RefresherConfig,
    running: Option<Running>,
}

impl std::fmt::Debug for MetadataRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataRefresher")
            .field("config", &self.config)
            .field("running", &self.running.is_some())
            .finish()
    }
}

impl MetadataRefresher {
    pub fn new(service: Arc<dyn MetadataService>, config: RefresherConfig) -> Self {
        Self {
            service,
            config,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Spawn the refresh loop. Must be called from within a tokio runtime.
    pub fn start(&mut self) -> MetaResult<()> {
        if self.running.is_some() {
            return Err(MetaError::AlreadyStarted);
        }
        self.config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MetaError::NoRuntime)?;

        let (stop, stopped) = oneshot::channel();
        let service = Arc::clone(&self.service);
        let config = self.config.clone();
        let handle = runtime.spawn(run(service, config, stopped));
        self.running = Some(Running { stop, handle });
        Ok(())
    }

    /// Signal the loop to stop and wait up to `timeout` for it to finish.
    ///
    /// On timeout the task is left to finish on its own.
    pub async fn shutdown(&mut self, timeout: Duration) -> MetaResult<()> {
        let Running { stop, handle } = self.running.take().ok_or(MetaError::NotRunning)?;
        // The loop may already be gone; the join below reports how it ended.
        let _ = stop.send(());
        match time::timeout(timeout, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(MetaError::Task(e.to_string())),
            Err(_) => Err(MetaError::ShutdownTimeout(timeout)),
        }
    }
}

async fn run(
    service: Arc<dyn MetadataService>,
    config: RefresherConfig,
    mut stopped: oneshot::Receiver<()>,
) {
    let splay = random_splay(config.splay_ms);
    debug!(
        splay_ms = splay.as_millis() as u64,
        interval_ms = config.interval_ms,
        "starting metadata refresher"
    );

    tokio::select! {
        biased;
        _ = &mut stopped => {
            debug!("metadata refresher stopped before first refresh");
            return;
        }
        _ = time::sleep(splay) => refresh(&service, &config).await,
    }

    let interval = config.interval();
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = &mut stopped => break,
            _ = ticker.tick() => refresh(&service, &config).await,
        }
    }
    debug!("metadata refresher stopped");
}

async fn refresh(service: &Arc<dyn MetadataService>, config: &RefresherConfig) {
    let service = Arc::clone(service);
    let include_store = config.include_store_metadata;
    let outcome = task::spawn_blocking(move || {
        if let Err(e) = write_values(service.as_ref(), include_store) {
            debug!(error = %e, "failed refreshing local metadata values");
            return;
        }
        if let Err(e) = service.get_metadata_key(INSTALLATION_ID) {
            debug!(error = %e, "failed fetching installation id");
            return;
        }
        trace!("local metadata refreshed");
    })
    .await;
    if let Err(e) = outcome {
        debug!(error = %e, "metadata refresh task failed");
    }
}

fn random_splay(splay_ms: u64) -> Duration {
    if splay_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..splay_ms))
}
