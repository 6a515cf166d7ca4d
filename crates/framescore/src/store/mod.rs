//! Storage and locking interface.
//!
//! The scoring core does not persist or distribute data itself. It talks to a
//! [`Store`] that hands out frames, registers and releases materialized
//! columns, keeps finalized metrics, and arbitrates shared read locks keyed
//! by job.
//!
//! # Key Types
//!
//! - [`Store`]: The storage/locking contract
//! - [`MemStore`]: Thread-safe in-memory implementation
//! - [`Key`] / [`ColumnKey`]: Object and column identities
//! - [`ReadLocks`]: RAII guard over a set of read locks

mod keys;
mod memory;

use std::sync::Arc;

pub use keys::{ColumnKey, Key};
pub use memory::{MemStore, DEFAULT_CHUNK_ROWS};

use crate::error::Result;
use crate::frame::{Column, Frame};
use crate::metrics::ModelMetrics;

/// Storage substrate consumed by the scoring core.
pub trait Store: Send + Sync {
    /// Rows per chunk, the unit of parallel work.
    fn chunk_rows(&self) -> usize;

    /// Take ownership of a freshly built column and make it live.
    fn register_column(&self, column: Column) -> Arc<Column>;

    /// Release a live column. Returns `false` if it was not live.
    fn release_column(&self, key: ColumnKey) -> bool;

    /// Whether the column is currently live.
    fn is_live(&self, key: ColumnKey) -> bool;

    /// Insert or replace a frame. Its columns become live.
    ///
    /// Fails with [`ScoreError::Locked`](crate::ScoreError::Locked) if an
    /// existing frame under the same key is read-locked.
    fn put_frame(&self, frame: Frame) -> Result<()>;

    /// Look up a frame.
    fn get_frame(&self, key: &Key) -> Option<Frame>;

    /// Remove a frame and release its columns.
    fn delete_frame(&self, key: &Key) -> Result<Frame>;

    /// Take a shared read lock on a frame for `job`.
    fn read_lock(&self, frame: &Key, job: &Key) -> Result<()>;

    /// Drop one read lock held by `job` on a frame.
    fn unlock(&self, frame: &Key, job: &Key);

    /// Number of read locks currently held on a frame.
    fn readers(&self, frame: &Key) -> usize;

    /// Insert or replace finalized metrics under their own key.
    fn put_metrics(&self, metrics: ModelMetrics);

    fn get_metrics(&self, key: &Key) -> Option<ModelMetrics>;

    fn remove_metrics(&self, key: &Key) -> bool;
}

// =============================================================================
// RAII Guards
// =============================================================================

/// Read locks held by one job, released on drop.
pub struct ReadLocks<'s> {
    store: &'s dyn Store,
    job: Key,
    frames: Vec<Key>,
}

impl<'s> ReadLocks<'s> {
    /// Lock each frame in order. Already acquired locks are released if a
    /// later one fails.
    pub fn acquire(store: &'s dyn Store, job: &Key, frames: &[Key]) -> Result<Self> {
        let mut locks = Self {
            store,
            job: job.clone(),
            frames: Vec::with_capacity(frames.len()),
        };
        for frame in frames {
            store.read_lock(frame, job)?;
            locks.frames.push(frame.clone());
        }
        Ok(locks)
    }

    pub fn frames(&self) -> &[Key] {
        &self.frames
    }
}

impl Drop for ReadLocks<'_> {
    fn drop(&mut self) {
        for frame in self.frames.drain(..) {
            self.store.unlock(&frame, &self.job);
        }
    }
}

/// Columns materialized during one call, released on drop unless committed.
pub(crate) struct TempColumns<'s> {
    store: &'s dyn Store,
    keys: Vec<ColumnKey>,
}

impl<'s> TempColumns<'s> {
    pub(crate) fn new(store: &'s dyn Store) -> Self {
        Self {
            store,
            keys: Vec::new(),
        }
    }

    /// Register a new column with the store and track it.
    pub(crate) fn create(&mut self, column: Column) -> Arc<Column> {
        let column = self.store.register_column(column);
        self.keys.push(column.key());
        column
    }

    /// Hand ownership of the tracked columns to the caller.
    pub(crate) fn commit(mut self) {
        self.keys.clear();
    }
}

impl Drop for TempColumns<'_> {
    fn drop(&mut self) {
        for key in self.keys.drain(..) {
            self.store.release_column(key);
        }
    }
}
