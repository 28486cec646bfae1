use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::{
    config::SleepConfig,
    night::SleepNight,
    persist::{NightStore, PersistError, PersistResult},
    types::NightId,
};

use super::events::NightEvent;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("sleep database task is not running")]
    ChannelClosed,
}

/// Snapshot of every stored night, id descending.
pub type NightList = Arc<Vec<SleepNight>>;

type SharedStore = Arc<Mutex<Box<dyn NightStore>>>;

/// Cloneable handle onto the single-writer database task.
#[derive(Clone)]
pub struct SleepDatabaseDao {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<NightEvent>,
    nights_rx: watch::Receiver<NightList>,
}

enum Command {
    Insert {
        night: SleepNight,
        resp: oneshot::Sender<Result<NightId, RuntimeError>>,
    },
    Update {
        night: SleepNight,
        resp: oneshot::Sender<Result<bool, RuntimeError>>,
    },
    Get {
        id: NightId,
        resp: oneshot::Sender<Result<Option<SleepNight>, RuntimeError>>,
    },
    MostRecent {
        resp: oneshot::Sender<Result<Option<SleepNight>, RuntimeError>>,
    },
    Clear {
        resp: oneshot::Sender<Result<usize, RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

/// Starts the database task that owns `store`.
///
/// Loads the current table into the list snapshot on the blocking pool before
/// returning, so [`SleepDatabaseDao::observe_all`] is populated from the first
/// call. Must be called from within a tokio runtime.
pub async fn spawn_dao(store: Box<dyn NightStore>, config: &SleepConfig) -> Result<SleepDatabaseDao, RuntimeError> {
    let (store, initial) = tokio::task::spawn_blocking(
        move || -> PersistResult<(Box<dyn NightStore>, Vec<SleepNight>)> {
            let initial = store.all_desc()?;
            Ok((store, initial))
        },
    )
    .await
    .map_err(|e| PersistError::Join(e.to_string()))??;
    debug!(nights = initial.len(), "starting sleep database task");

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<NightEvent>(config.event_capacity.max(1));
    let (nights_tx, nights_rx) = watch::channel::<NightList>(Arc::new(initial));

    let store: SharedStore = Arc::new(Mutex::new(store));
    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            if handle_command(cmd, &store, &events_tx_loop, &nights_tx).await {
                break;
            }
        }
        debug!("sleep database task stopped");
    });

    Ok(SleepDatabaseDao {
        cmd_tx,
        events_tx,
        nights_rx,
    })
}

impl SleepDatabaseDao {
    /// Inserts `night` and returns its id.
    pub async fn insert(&self, night: SleepNight) -> Result<NightId, RuntimeError> {
        self.request(|resp| Command::Insert { night, resp }).await
    }

    /// Overwrites the stored night with `night.id`.
    ///
    /// Returns `false`, without notifying observers, when no such night exists.
    pub async fn update(&self, night: SleepNight) -> Result<bool, RuntimeError> {
        self.request(|resp| Command::Update { night, resp }).await
    }

    pub async fn get(&self, id: NightId) -> Result<Option<SleepNight>, RuntimeError> {
        self.request(|resp| Command::Get { id, resp }).await
    }

    /// Night with the greatest id, if any.
    pub async fn most_recent(&self) -> Result<Option<SleepNight>, RuntimeError> {
        self.request(|resp| Command::MostRecent { resp }).await
    }

    /// Deletes every night and returns how many were removed.
    pub async fn clear(&self) -> Result<usize, RuntimeError> {
        self.request(|resp| Command::Clear { resp }).await
    }

    /// Live list of all nights, id descending.
    ///
    /// The receiver is refreshed after every committed insert, matched update
    /// and clear, before the mutating call returns.
    pub fn observe_all(&self) -> watch::Receiver<NightList> {
        let mut rx = self.nights_rx.clone();
        rx.borrow_and_update();
        rx
    }

    /// Current list snapshot.
    pub fn nights(&self) -> NightList {
        Arc::clone(&self.nights_rx.borrow())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NightEvent> {
        self.events_tx.subscribe()
    }

    /// True when both handles drive the same database task.
    pub fn same_instance(&self, other: &Self) -> bool {
        self.cmd_tx.same_channel(&other.cmd_tx)
    }

    /// Stops the task after the commands queued ahead of this one.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Shutdown { resp }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, RuntimeError>>) -> Command,
    ) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }
}

async fn handle_command(
    cmd: Command,
    store: &SharedStore,
    events_tx: &broadcast::Sender<NightEvent>,
    nights_tx: &watch::Sender<NightList>,
) -> bool {
    match cmd {
        Command::Insert { night, resp } => {
            let res = insert(store, events_tx, nights_tx, night).await;
            log_failure("insert", &res);
            let _ = resp.send(res);
        }
        Command::Update { night, resp } => {
            let res = update(store, events_tx, nights_tx, night).await;
            log_failure("update", &res);
            let _ = resp.send(res);
        }
        Command::Get { id, resp } => {
            let res = run_blocking(store, move |s| s.get(id)).await;
            log_failure("get", &res);
            let _ = resp.send(res);
        }
        Command::MostRecent { resp } => {
            let res = run_blocking(store, |s| s.most_recent()).await;
            log_failure("most_recent", &res);
            let _ = resp.send(res);
        }
        Command::Clear { resp } => {
            let res = clear(store, events_tx, nights_tx).await;
            log_failure("clear", &res);
            let _ = resp.send(res);
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(Ok(()));
            return true;
        }
    }

    false
}

async fn insert(
    store: &SharedStore,
    events_tx: &broadcast::Sender<NightEvent>,
    nights_tx: &watch::Sender<NightList>,
    night: SleepNight,
) -> Result<NightId, RuntimeError> {
    let id = run_blocking(store, move |s| s.insert(&night)).await?;
    publish_nights(store, nights_tx).await?;
    debug!(id, "night inserted");
    let _ = events_tx.send(NightEvent::Inserted { id });
    Ok(id)
}

async fn update(
    store: &SharedStore,
    events_tx: &broadcast::Sender<NightEvent>,
    nights_tx: &watch::Sender<NightList>,
    night: SleepNight,
) -> Result<bool, RuntimeError> {
    let id = night.id;
    let matched = run_blocking(store, move |s| s.update(&night)).await?;
    if !matched {
        debug!(id, "update ignored, no such night");
        return Ok(false);
    }
    publish_nights(store, nights_tx).await?;
    debug!(id, "night updated");
    let _ = events_tx.send(NightEvent::Updated { id });
    Ok(true)
}

async fn clear(
    store: &SharedStore,
    events_tx: &broadcast::Sender<NightEvent>,
    nights_tx: &watch::Sender<NightList>,
) -> Result<usize, RuntimeError> {
    let removed = run_blocking(store, |s| s.clear()).await?;
    publish_nights(store, nights_tx).await?;
    debug!(removed, "nights cleared");
    let _ = events_tx.send(NightEvent::Cleared { removed });
    Ok(removed)
}

async fn publish_nights(store: &SharedStore, nights_tx: &watch::Sender<NightList>) -> Result<(), RuntimeError> {
    let nights = run_blocking(store, |s| s.all_desc()).await?;
    nights_tx.send_replace(Arc::new(nights));
    Ok(())
}

async fn run_blocking<T, F>(store: &SharedStore, f: F) -> Result<T, RuntimeError>
where
    T: Send + 'static,
    F: FnOnce(&mut Box<dyn NightStore>) -> PersistResult<T> + Send + 'static,
{
    let store = Arc::clone(store);
    let out = tokio::task::spawn_blocking(move || {
        let mut guard = store.blocking_lock();
        f(&mut *guard)
    })
    .await
    .map_err(|e| PersistError::Join(e.to_string()))??;
    Ok(out)
}

fn log_failure<T>(op: &'static str, res: &Result<T, RuntimeError>) {
    if let Err(err) = res {
        warn!(op, error = %err, "sleep database command failed");
    }
}
