//! Resumable crawl state.
//!
//! [`CheckpointStore`] persists a [`CheckpointState`] after every repository so
//! an interrupted or quota-limited crawl can pick up where it stopped. A lock
//! file next to the checkpoint keeps concurrent runs apart.

mod lock;
mod store;

pub use lock::{CrawlLockGuard, acquire_crawl_lock, lock_path};
pub use store::{CheckpointState, CheckpointStore, LoadOutcome};
