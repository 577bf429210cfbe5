//! Async job dispatcher and status tracker.
//!
//! [`InMemoryScheduler`] creates a `Pending` record, hands the work to a fixed pool of tokio
//! workers through a bounded queue, and returns the job id without waiting. Records live in a
//! [`JobStore`]: an in-memory map by default, or a SQLite table with the `sqlite` feature.

mod memory;
mod store;
mod trait_;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::{InMemoryScheduler, SchedulerConfig};
pub use store::{now_rfc3339, InMemoryJobStore, JobStore, JobStoreError};
pub use trait_::{JobWork, Scheduler, SchedulerError};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteJobStore;
