use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::models::SyncState;
use crate::state::{StateEvent, ViewState};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Drives one synchronization job to completion.
///
/// Creates the job, then polls its status on a fixed interval, applying a
/// view-state transition per observed phase. At most one status request is
/// in flight at any time; the chain stops on SUCCESS, on any error, or when
/// the cancellation token fires.
pub struct SyncPoller<'a> {
    api: &'a ApiClient,
    interval: Duration,
    cancel: CancellationToken,
}

impl<'a> SyncPoller<'a> {
    pub fn new(api: &'a ApiClient, interval: Duration, cancel: CancellationToken) -> Self {
        SyncPoller {
            api,
            interval,
            cancel,
        }
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    pub async fn run(&self, state: &Mutex<ViewState>) -> Result<()> {
        let job = self.api.create_synchronization().await?;
        tracing::info!(job = %job.id, "synchronization job created");
        state
            .lock()
            .await
            .apply(StateEvent::SyncStarted { id: job.id.clone() });

        loop {
            let status = self.api.synchronization(&job.id).await?;
            match status.phase()? {
                SyncState::Pending => {
                    state.lock().await.apply(StateEvent::SyncPending);
                }
                SyncState::Progress => {
                    let progress = status.progress().ok_or_else(|| Error::MalformedProgress {
                        id: job.id.clone(),
                    })?;
                    tracing::debug!(
                        current = progress.current,
                        total = progress.total,
                        "synchronization progress"
                    );
                    state.lock().await.apply(StateEvent::SyncProgressed {
                        current: progress.current,
                        total: progress.total,
                    });
                }
                SyncState::Success => {
                    let repositories = self.api.repositories().await?;
                    state
                        .lock()
                        .await
                        .apply(StateEvent::SyncCompleted { repositories });
                    tracing::info!(job = %job.id, "synchronization finished");
                    return Ok(());
                }
                SyncState::Failure => {
                    return Err(Error::SyncFailed {
                        id: job.id.clone(),
                    });
                }
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
