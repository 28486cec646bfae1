use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    config::SleepConfig,
    format::{HistoryResources, format_nights},
    night::SleepNight,
    runtime::handle::{NightList, SleepDatabaseDao},
};

use super::{Clock, ControllerError, SystemClock};

/// One-shot signals raised by [`SleepTracker`].
///
/// Each emission is received exactly once through
/// [`SleepTracker::next_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    /// A session was stopped; the UI should ask for its rating.
    NavigateToQuality {
        /// The night that was just closed.
        night: SleepNight,
    },
    /// All nights were deleted; the UI should confirm it.
    ShowClearConfirmation,
}

/// Observable state bound by the tracker screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerView {
    /// False until the current night has been read from storage. Start and
    /// stop stay disabled while not ready.
    pub ready: bool,
    /// The open session, if any.
    pub tonight: Option<SleepNight>,
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub clear_enabled: bool,
    /// Every stored night, id descending.
    pub nights: NightList,
    /// `nights` rendered for display.
    pub history: String,
}

impl TrackerView {
    fn derive(
        ready: bool,
        tonight: Option<SleepNight>,
        nights: NightList,
        resources: &HistoryResources,
    ) -> Self {
        Self {
            ready,
            start_enabled: ready && tonight.is_none(),
            stop_enabled: ready && tonight.is_some(),
            clear_enabled: !nights.is_empty(),
            history: format_nights(&nights, resources),
            tonight,
            nights,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ActionKind {
    Start,
    Stop,
    Clear,
}

struct Action {
    kind: ActionKind,
    resp: oneshot::Sender<Result<(), ControllerError>>,
}

/// Drives the start/stop/clear workflow of the tracker screen.
pub struct SleepTracker {
    action_tx: mpsc::Sender<Action>,
    view_rx: watch::Receiver<TrackerView>,
    events_rx: mpsc::UnboundedReceiver<TrackerEvent>,
    task: JoinHandle<()>,
}

impl SleepTracker {
    /// Spawns the controller using the wall clock.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(dao: SleepDatabaseDao, resources: HistoryResources, config: &SleepConfig) -> Self {
        Self::spawn_with_clock(dao, resources, config, Arc::new(SystemClock))
    }

    pub fn spawn_with_clock(
        dao: SleepDatabaseDao,
        resources: HistoryResources,
        config: &SleepConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let nights_rx = dao.observe_all();
        let initial = TrackerView::derive(false, None, Arc::clone(&nights_rx.borrow()), &resources);
        let (view_tx, view_rx) = watch::channel(initial);
        let (action_tx, action_rx) = mpsc::channel(config.action_queue_bound.max(1));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let sequencer = Sequencer {
            dao,
            resources,
            clock,
            tonight: None,
            ready: false,
            view_tx,
            events_tx,
        };
        let task = tokio::spawn(sequencer.run(action_rx, nights_rx));

        Self {
            action_tx,
            view_rx,
            events_rx,
            task,
        }
    }

    /// Opens a new session and makes it the current one.
    pub async fn start(&self) -> Result<(), ControllerError> {
        self.request(ActionKind::Start).await
    }

    /// Closes the current session and raises [`TrackerEvent::NavigateToQuality`].
    ///
    /// Does nothing when no session is open.
    pub async fn stop(&self) -> Result<(), ControllerError> {
        self.request(ActionKind::Stop).await
    }

    /// Deletes every night and raises [`TrackerEvent::ShowClearConfirmation`].
    pub async fn clear(&self) -> Result<(), ControllerError> {
        self.request(ActionKind::Clear).await
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerView> {
        self.view_rx.clone()
    }

    pub fn view(&self) -> TrackerView {
        self.view_rx.borrow().clone()
    }

    /// Waits for the next one-shot signal. `None` once the controller is closed.
    pub async fn next_event(&mut self) -> Option<TrackerEvent> {
        self.events_rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<TrackerEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Aborts the sequencer. Pending and later actions fail with
    /// [`ControllerError::Closed`].
    pub fn close(&self) {
        self.task.abort();
    }

    async fn request(&self, kind: ActionKind) -> Result<(), ControllerError> {
        let (tx, rx) = oneshot::channel();
        self.action_tx
            .send(Action { kind, resp: tx })
            .await
            .map_err(|_| ControllerError::Closed)?;
        rx.await.map_err(|_| ControllerError::Closed)?
    }
}

impl Drop for SleepTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Sequencer {
    dao: SleepDatabaseDao,
    resources: HistoryResources,
    clock: Arc<dyn Clock>,
    tonight: Option<SleepNight>,
    ready: bool,
    view_tx: watch::Sender<TrackerView>,
    events_tx: mpsc::UnboundedSender<TrackerEvent>,
}

impl Sequencer {
    async fn run(mut self, mut action_rx: mpsc::Receiver<Action>, mut nights_rx: watch::Receiver<NightList>) {
        if let Err(err) = self.load_tonight().await {
            warn!(error = %err, "failed to load current night, retrying on next action");
        }
        self.publish(&nights_rx);

        let mut watching = true;
        loop {
            tokio::select! {
                action = action_rx.recv() => {
                    let Some(action) = action else { break; };
                    self.handle(action, &nights_rx).await;
                }
                changed = nights_rx.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                        continue;
                    }
                    self.publish(&nights_rx);
                }
            }
        }
        debug!("sleep tracker stopped");
    }

    async fn handle(&mut self, action: Action, nights_rx: &watch::Receiver<NightList>) {
        let Action { kind, resp } = action;
        let res = self.apply(kind).await;

        self.publish(nights_rx);
        let res = res.map(|event| {
            if let Some(event) = event {
                let _ = self.events_tx.send(event);
            }
        });
        if let Err(err) = &res {
            warn!(action = ?kind, error = %err, "tracker action failed");
        }
        let _ = resp.send(res);
    }

    async fn ensure_ready(&mut self) -> Result<(), ControllerError> {
        if self.ready {
            return Ok(());
        }
        self.load_tonight().await
    }

    async fn load_tonight(&mut self) -> Result<(), ControllerError> {
        self.tonight = self.tonight_from_database().await?;
        self.ready = true;
        Ok(())
    }

    async fn apply(&mut self, kind: ActionKind) -> Result<Option<TrackerEvent>, ControllerError> {
        match kind {
            // Start and stop act on the current night, which must have been read.
            ActionKind::Start => {
                self.ensure_ready().await?;
                self.start().await
            }
            ActionKind::Stop => {
                self.ensure_ready().await?;
                self.stop().await
            }
            ActionKind::Clear => self.clear().await,
        }
    }

    async fn start(&mut self) -> Result<Option<TrackerEvent>, ControllerError> {
        let id = self.dao.insert(SleepNight::starting_at(self.clock.now_ms())).await?;
        self.tonight = self.tonight_from_database().await?;
        debug!(id, "sleep tracking started");
        Ok(None)
    }

    async fn stop(&mut self) -> Result<Option<TrackerEvent>, ControllerError> {
        let Some(mut night) = self.tonight.clone() else {
            debug!("stop ignored, no open night");
            return Ok(None);
        };

        // An end equal to the start would leave the night open.
        night.end_time_ms = self.clock.now_ms().max(night.start_time_ms + 1);
        self.dao.update(night.clone()).await?;
        // Storage already holds the closed night even if the re-read fails.
        self.tonight = None;
        self.tonight = self.tonight_from_database().await?;
        debug!(id = night.id, "sleep tracking stopped");
        Ok(Some(TrackerEvent::NavigateToQuality { night }))
    }

    async fn clear(&mut self) -> Result<Option<TrackerEvent>, ControllerError> {
        let removed = self.dao.clear().await?;
        self.tonight = None;
        self.ready = true;
        debug!(removed, "sleep history cleared");
        Ok(Some(TrackerEvent::ShowClearConfirmation))
    }

    /// Most recent night if it is still open.
    async fn tonight_from_database(&self) -> Result<Option<SleepNight>, ControllerError> {
        Ok(self.dao.most_recent().await?.filter(SleepNight::is_open))
    }

    fn publish(&self, nights_rx: &watch::Receiver<NightList>) {
        let nights = Arc::clone(&nights_rx.borrow());
        let next = TrackerView::derive(self.ready, self.tonight.clone(), nights, &self.resources);
        self.view_tx.send_if_modified(|view| {
            if *view == next {
                return false;
            }
            *view = next;
            true
        });
    }
}
