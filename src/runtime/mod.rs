//! Database task, lazily opened handle, and change events.

/// Lazily opened, shared database handle.
pub mod database;
/// Change events emitted by the database task.
pub mod events;
/// Handle and command loop implementation.
pub mod handle;
