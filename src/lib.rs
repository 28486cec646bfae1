//! Sleep-session tracking over a single SQLite table with reactive controllers.
//!
//! # Examples
//!
//! Direct store usage with [`persist::memory::MemoryNightStore`]:
//! ```
//! use sleeplog::{
//!     night::SleepNight,
//!     persist::{memory::MemoryNightStore, NightStore},
//! };
//!
//! let mut store = MemoryNightStore::new();
//! let id = store.insert(&SleepNight::starting_at(1_000)).expect("insert");
//! assert_eq!(id, 1);
//! assert!(store.most_recent().expect("query").is_some_and(|n| n.is_open()));
//! ```
//!
//! Controllers over a lazily opened database:
//! ```no_run
//! use sleeplog::{
//!     config::SleepConfig,
//!     controller::{quality::SleepQualityRater, tracker::{SleepTracker, TrackerEvent}},
//!     format::HistoryResources,
//!     runtime::database::SleepDatabase,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = SleepConfig::with_path("sleep.db");
//! let database = SleepDatabase::new(config.clone());
//! let dao = database.instance().await.expect("open database");
//!
//! let mut tracker = SleepTracker::spawn(dao.clone(), HistoryResources::default(), &config);
//! tracker.start().await.expect("start");
//! tracker.stop().await.expect("stop");
//! if let Some(TrackerEvent::NavigateToQuality { night }) = tracker.next_event().await {
//!     let rater = SleepQualityRater::spawn(night.id, dao.clone(), &config);
//!     rater.rate(4).await.expect("rate");
//! }
//! println!("{}", tracker.view().history);
//! # }
//! ```

/// Runtime configuration.
pub mod config;
/// Tracker and rating controllers.
pub mod controller;
/// History rendering and export.
pub mod format;
/// Sleep night record.
pub mod night;
/// Storage abstraction with SQLite and in-memory backends.
pub mod persist;
/// Database task, shared handle, and change events.
pub mod runtime;
/// Shared primitive types and constants.
pub mod types;
