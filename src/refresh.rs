//! Periodic rebuild loop for serve mode.
//!
//! The loop alternates between two states:
//!
//! - **Rebuilding**: run the builder and install the result, together with
//!   the time of the next rebuild, as one snapshot.
//! - **Waiting**: sleep for the refresh interval.
//!
//! The first rebuild happens before the server starts. A failed rebuild ends
//! the loop with the error; serving a silently stale list is never an option.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::builder::BlocklistBuilder;
use crate::config::Sources;
use crate::fetcher::SourceFetcher;
use crate::snapshot::{http_date, Snapshot};
use crate::state::SharedBlocklist;
use crate::{Error, Result};

/// Drives the builder on a fixed interval.
pub struct Refresher<F> {
    builder: Arc<BlocklistBuilder<F>>,
    sources: Arc<Sources>,
    compress: bool,
    interval: Duration,
}

impl<F> Clone for Refresher<F> {
    fn clone(&self) -> Self {
        Self {
            builder: Arc::clone(&self.builder),
            sources: Arc::clone(&self.sources),
            compress: self.compress,
            interval: self.interval,
        }
    }
}

impl<F: SourceFetcher + 'static> Refresher<F> {
    pub fn new(
        builder: BlocklistBuilder<F>,
        sources: Sources,
        compress: bool,
        interval: Duration,
    ) -> Self {
        Self {
            builder: Arc::new(builder),
            sources: Arc::new(sources),
            compress,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Build a snapshot whose next refresh is one interval from now.
    fn build_snapshot(&self) -> Result<Snapshot> {
        let blocklist = self.builder.build(&self.sources, self.compress)?;
        let next_refresh_at = SystemTime::now()
            .checked_add(self.interval)
            .ok_or_else(|| Error::Config("refresh interval overflows the clock".to_string()))?;
        log::info!("Next update at {}", http_date(next_refresh_at));
        Ok(Snapshot::new(blocklist, next_refresh_at))
    }

    /// Perform the first build and create the shared state from it.
    ///
    /// Blocking; call before the server is started.
    pub fn initial(&self) -> Result<SharedBlocklist> {
        Ok(SharedBlocklist::new(self.build_snapshot()?))
    }

    /// Rebuild and install a new snapshot. Blocking.
    ///
    /// On failure the current snapshot is left untouched.
    pub fn rebuild(&self, state: &SharedBlocklist) -> Result<()> {
        let snapshot = self.build_snapshot()?;
        state.set(snapshot);
        Ok(())
    }

    /// Run forever, rebuilding once per interval.
    ///
    /// Only returns on a failed rebuild. Builds run on the blocking pool so
    /// request handling is not stalled by source downloads.
    pub async fn run(self, state: SharedBlocklist) -> Result<Infallible> {
        loop {
            tokio::time::sleep(self.interval).await;

            log::info!("Starting update");
            let this = self.clone();
            let target = state.clone();
            tokio::task::spawn_blocking(move || this.rebuild(&target))
                .await
                .map_err(|e| Error::Task(e.to_string()))??;
            log::info!("Finished update");
        }
    }
}
