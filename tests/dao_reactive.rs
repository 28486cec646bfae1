use std::{
    sync::{Arc, Mutex},
    thread::{self, ThreadId},
    time::Duration,
};

use sleeplog::{
    config::SleepConfig,
    night::SleepNight,
    persist::{NightStore, PersistResult, memory::MemoryNightStore, sqlite::SqliteNightStore},
    runtime::{
        events::NightEvent,
        handle::{RuntimeError, SleepDatabaseDao, spawn_dao},
    },
    types::NightId,
};

/// Memory store that remembers which thread ran the first listing.
struct ListingThreadStore {
    inner: MemoryNightStore,
    first_listing: Arc<Mutex<Option<ThreadId>>>,
}

impl NightStore for ListingThreadStore {
    fn insert(&mut self, night: &SleepNight) -> PersistResult<NightId> {
        self.inner.insert(night)
    }

    fn update(&mut self, night: &SleepNight) -> PersistResult<bool> {
        self.inner.update(night)
    }

    fn get(&self, id: NightId) -> PersistResult<Option<SleepNight>> {
        self.inner.get(id)
    }

    fn most_recent(&self) -> PersistResult<Option<SleepNight>> {
        self.inner.most_recent()
    }

    fn clear(&mut self) -> PersistResult<usize> {
        self.inner.clear()
    }

    fn all_desc(&self) -> PersistResult<Vec<SleepNight>> {
        self.first_listing
            .lock()
            .expect("lock")
            .get_or_insert_with(|| thread::current().id());
        self.inner.all_desc()
    }
}

async fn sqlite_dao() -> SleepDatabaseDao {
    let store = SqliteNightStore::open_in_memory().expect("open sqlite");
    spawn_dao(Box::new(store), &SleepConfig::default()).await.expect("spawn")
}

fn ids(list: &[SleepNight]) -> Vec<i64> {
    list.iter().map(|n| n.id).collect()
}

#[tokio::test]
async fn observe_all_tracks_every_mutation() {
    let dao = sqlite_dao().await;
    let mut rx = dao.observe_all();
    assert!(rx.borrow().is_empty());

    let id1 = dao.insert(SleepNight::starting_at(10)).await.expect("insert");
    let id2 = dao.insert(SleepNight::starting_at(20)).await.expect("insert");
    assert!(rx.has_changed().expect("open"));
    assert_eq!(ids(&rx.borrow_and_update()), vec![id2, id1]);

    let mut rec = dao.get(id1).await.expect("get").expect("present");
    rec.sleep_quality = 4;
    assert!(dao.update(rec).await.expect("update"));
    assert!(rx.has_changed().expect("open"));
    assert_eq!(rx.borrow_and_update()[1].sleep_quality, 4);

    assert_eq!(dao.clear().await.expect("clear"), 2);
    assert!(rx.has_changed().expect("open"));
    assert!(rx.borrow_and_update().is_empty());
    assert!(dao.most_recent().await.expect("recent").is_none());

    dao.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn subscriber_is_notified_without_requerying() {
    let dao = sqlite_dao().await;
    let mut rx = dao.observe_all();

    let writer = dao.clone();
    tokio::spawn(async move {
        writer.insert(SleepNight::starting_at(5)).await.expect("insert");
    });

    tokio::time::timeout(Duration::from_secs(1), rx.changed())
        .await
        .expect("change within timeout")
        .expect("sender alive");
    assert_eq!(rx.borrow().len(), 1);
}

#[tokio::test]
async fn initial_snapshot_reflects_existing_rows() {
    let mut store = MemoryNightStore::new();
    for start in [1, 2, 3] {
        store.insert(&SleepNight::starting_at(start)).expect("insert");
    }
    let dao = spawn_dao(Box::new(store), &SleepConfig::default()).await.expect("spawn");

    assert_eq!(ids(&dao.nights()), vec![3, 2, 1]);
    assert_eq!(dao.most_recent().await.expect("recent").map(|n| n.id), Some(3));
}

#[tokio::test]
async fn events_follow_commits_and_skip_missed_updates() {
    let dao = sqlite_dao().await;
    let mut events = dao.subscribe();

    let id = dao.insert(SleepNight::starting_at(1)).await.expect("insert");
    let ghost = SleepNight { id: 99, ..SleepNight::starting_at(1) };
    assert!(!dao.update(ghost).await.expect("update"));
    let mut rec = dao.get(id).await.expect("get").expect("present");
    rec.end_time_ms = 50;
    dao.update(rec).await.expect("update");
    dao.clear().await.expect("clear");

    let mut seen = Vec::new();
    for _ in 0..3 {
        let evt = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("event")
            .expect("recv");
        seen.push(evt);
    }
    assert_eq!(
        seen,
        vec![
            NightEvent::Inserted { id },
            NightEvent::Updated { id },
            NightEvent::Cleared { removed: 1 },
        ]
    );
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn duplicate_explicit_id_surfaces_storage_error() {
    let dao = sqlite_dao().await;
    let rec = SleepNight { id: 4, ..SleepNight::starting_at(1) };
    dao.insert(rec.clone()).await.expect("insert");

    let err = dao.insert(rec).await.expect_err("duplicate");
    assert!(matches!(err, RuntimeError::Persist(_)));
    assert_eq!(dao.nights().len(), 1);
}

#[tokio::test]
async fn commands_after_shutdown_report_closed_channel() {
    let dao = sqlite_dao().await;
    dao.shutdown().await.expect("shutdown");

    let err = dao.get(1).await.expect_err("closed");
    assert!(matches!(err, RuntimeError::ChannelClosed));
}

#[tokio::test]
async fn initial_listing_runs_off_the_runtime_thread() {
    let mut inner = MemoryNightStore::new();
    inner.insert(&SleepNight::starting_at(1)).expect("insert");
    let first_listing = Arc::new(Mutex::new(None));
    let store = ListingThreadStore {
        inner,
        first_listing: Arc::clone(&first_listing),
    };

    let dao = spawn_dao(Box::new(store), &SleepConfig::default()).await.expect("spawn");
    assert_eq!(dao.nights().len(), 1);

    let listed_on = first_listing.lock().expect("lock").expect("listed once");
    assert_ne!(listed_on, thread::current().id());
}
