use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    config::SleepConfig,
    runtime::handle::SleepDatabaseDao,
    types::{NightId, Quality},
};

use super::ControllerError;

/// One-shot signals raised by [`SleepQualityRater`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityEvent {
    /// The rating step is finished; return to the tracker.
    NavigateToTracker,
}

struct Rate {
    quality: Quality,
    resp: oneshot::Sender<Result<(), ControllerError>>,
}

/// Records a quality rating against one night.
pub struct SleepQualityRater {
    night_id: NightId,
    action_tx: mpsc::Sender<Rate>,
    events_rx: mpsc::UnboundedReceiver<QualityEvent>,
    task: JoinHandle<()>,
}

impl SleepQualityRater {
    /// Spawns a rater for `night_id`. Must be called from within a tokio runtime.
    pub fn spawn(night_id: NightId, dao: SleepDatabaseDao, config: &SleepConfig) -> Self {
        let (action_tx, mut action_rx) = mpsc::channel::<Rate>(config.action_queue_bound.max(1));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Some(Rate { quality, resp }) = action_rx.recv().await {
                let res = rate(&dao, night_id, quality).await;
                match &res {
                    // Fires even when the night no longer exists.
                    Ok(()) => {
                        let _ = events_tx.send(QualityEvent::NavigateToTracker);
                    }
                    Err(err) => warn!(night_id, error = %err, "rating failed"),
                }
                let _ = resp.send(res);
            }
        });

        Self {
            night_id,
            action_tx,
            events_rx,
            task,
        }
    }

    pub fn night_id(&self) -> NightId {
        self.night_id
    }

    /// Stores `quality` on the night and raises [`QualityEvent::NavigateToTracker`].
    ///
    /// A night that does not exist is left alone; the navigation signal is
    /// still raised.
    pub async fn rate(&self, quality: Quality) -> Result<(), ControllerError> {
        let (tx, rx) = oneshot::channel();
        self.action_tx
            .send(Rate { quality, resp: tx })
            .await
            .map_err(|_| ControllerError::Closed)?;
        rx.await.map_err(|_| ControllerError::Closed)?
    }

    pub async fn next_event(&mut self) -> Option<QualityEvent> {
        self.events_rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<QualityEvent> {
        self.events_rx.try_recv().ok()
    }

    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for SleepQualityRater {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn rate(dao: &SleepDatabaseDao, id: NightId, quality: Quality) -> Result<(), ControllerError> {
    let Some(mut night) = dao.get(id).await? else {
        debug!(id, "rating skipped, no such night");
        return Ok(());
    };
    night.sleep_quality = quality;
    dao.update(night).await?;
    debug!(id, quality, "night rated");
    Ok(())
}
