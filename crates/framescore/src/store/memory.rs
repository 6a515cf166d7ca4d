//! In-memory store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use super::{ColumnKey, Key, Store};
use crate::error::{Result, ScoreError};
use crate::frame::{Column, Frame};
use crate::metrics::ModelMetrics;

/// Default rows per chunk.
pub const DEFAULT_CHUNK_ROWS: usize = 4096;

/// Thread-safe in-memory [`Store`].
///
/// Tracks every live column so callers can check that temporary columns
/// were released, and keeps a per-frame multiset of reader jobs.
#[derive(Debug)]
pub struct MemStore {
    chunk_rows: usize,
    frames: RwLock<HashMap<Key, Frame>>,
    columns: RwLock<HashMap<ColumnKey, Arc<Column>>>,
    locks: Mutex<LockTable>,
    metrics: RwLock<HashMap<Key, ModelMetrics>>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::with_chunk_rows(DEFAULT_CHUNK_ROWS)
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with a custom chunk size (clamped to at least one row).
    pub fn with_chunk_rows(chunk_rows: usize) -> Self {
        Self {
            chunk_rows: chunk_rows.max(1),
            frames: RwLock::default(),
            columns: RwLock::default(),
            locks: Mutex::default(),
            metrics: RwLock::default(),
        }
    }

    /// Number of live columns.
    pub fn live_columns(&self) -> usize {
        self.columns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of stored metrics objects.
    pub fn n_metrics(&self) -> usize {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_table(&self) -> MutexGuard<'_, LockTable> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Readers per frame, as a multiset of job keys.
type LockTable = HashMap<Key, HashMap<Key, usize>>;

fn ensure_unlocked(locks: &LockTable, frame: &Key) -> Result<()> {
    let readers = count_readers(locks, frame);
    if readers > 0 {
        return Err(ScoreError::Locked {
            frame: frame.clone(),
            readers,
        });
    }
    Ok(())
}

fn count_readers(locks: &LockTable, frame: &Key) -> usize {
    locks
        .get(frame)
        .map(|readers| readers.values().sum())
        .unwrap_or(0)
}

impl Store for MemStore {
    fn chunk_rows(&self) -> usize {
        self.chunk_rows
    }

    fn register_column(&self, column: Column) -> Arc<Column> {
        let column = Arc::new(column);
        self.columns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(column.key(), Arc::clone(&column));
        column
    }

    fn release_column(&self, key: ColumnKey) -> bool {
        self.columns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some()
    }

    fn is_live(&self, key: ColumnKey) -> bool {
        self.columns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
    }

    // Lock order: `locks`, then `frames`, then `columns`.

    fn put_frame(&self, frame: Frame) -> Result<()> {
        let locks = self.lock_table();
        ensure_unlocked(&locks, frame.key())?;
        let mut frames = self.frames.write().unwrap_or_else(PoisonError::into_inner);
        let mut columns = self.columns.write().unwrap_or_else(PoisonError::into_inner);
        for column in frame.columns() {
            columns
                .entry(column.key())
                .or_insert_with(|| Arc::clone(column));
        }
        if let Some(old) = frames.insert(frame.key().clone(), frame) {
            let current = &frames[old.key()];
            for column in old.columns() {
                if !current.contains_column(column.key()) {
                    columns.remove(&column.key());
                }
            }
        }
        Ok(())
    }

    fn get_frame(&self, key: &Key) -> Option<Frame> {
        self.frames
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn delete_frame(&self, key: &Key) -> Result<Frame> {
        let locks = self.lock_table();
        ensure_unlocked(&locks, key)?;
        let frame = self
            .frames
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .ok_or_else(|| ScoreError::UnknownFrame(key.clone()))?;
        let mut columns = self.columns.write().unwrap_or_else(PoisonError::into_inner);
        for column in frame.columns() {
            columns.remove(&column.key());
        }
        Ok(frame)
    }

    fn read_lock(&self, frame: &Key, job: &Key) -> Result<()> {
        let mut locks = self.lock_table();
        let known = self
            .frames
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(frame);
        if !known {
            return Err(ScoreError::UnknownFrame(frame.clone()));
        }
        *locks
            .entry(frame.clone())
            .or_default()
            .entry(job.clone())
            .or_insert(0) += 1;
        Ok(())
    }

    fn unlock(&self, frame: &Key, job: &Key) {
        let mut locks = self.lock_table();
        if let Some(readers) = locks.get_mut(frame) {
            if let Some(count) = readers.get_mut(job) {
                *count -= 1;
                if *count == 0 {
                    readers.remove(job);
                }
            }
            if readers.is_empty() {
                locks.remove(frame);
            }
        }
    }

    fn readers(&self, frame: &Key) -> usize {
        count_readers(&self.lock_table(), frame)
    }

    fn put_metrics(&self, metrics: ModelMetrics) {
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(metrics.key.clone(), metrics);
    }

    fn get_metrics(&self, key: &Key) -> Option<ModelMetrics> {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn remove_metrics(&self, key: &Key) -> bool {
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_frame(key: &str) -> Frame {
        Frame::from_columns(
            Key::new(key),
            vec![("x".to_string(), Column::numeric(vec![1.0, 2.0, 3.0]))],
        )
        .unwrap()
    }

    #[test]
    fn chunk_rows_is_at_least_one() {
        assert_eq!(MemStore::with_chunk_rows(0).chunk_rows(), 1);
        assert_eq!(MemStore::new().chunk_rows(), DEFAULT_CHUNK_ROWS);
    }

    #[test]
    fn register_and_release_once() {
        let store = MemStore::new();
        let column = store.register_column(Column::numeric(vec![1.0]));
        assert!(store.is_live(column.key()));
        assert!(store.release_column(column.key()));
        assert!(!store.release_column(column.key()));
        assert_eq!(store.live_columns(), 0);
    }

    #[test]
    fn frames_register_their_columns() {
        let store = MemStore::new();
        store.put_frame(numeric_frame("train")).unwrap();
        assert_eq!(store.live_columns(), 1);

        store.delete_frame(&Key::new("train")).unwrap();
        assert_eq!(store.live_columns(), 0);
        assert!(store.get_frame(&Key::new("train")).is_none());
    }

    #[test]
    fn read_locks_are_shared_and_exclude_mutation() {
        let store = MemStore::new();
        store.put_frame(numeric_frame("train")).unwrap();
        let frame = Key::new("train");

        store.read_lock(&frame, &Key::new("job_a")).unwrap();
        store.read_lock(&frame, &Key::new("job_b")).unwrap();
        assert_eq!(store.readers(&frame), 2);

        let err = store.put_frame(numeric_frame("train")).unwrap_err();
        assert!(matches!(err, ScoreError::Locked { readers: 2, .. }));
        assert!(store.delete_frame(&frame).is_err());

        store.unlock(&frame, &Key::new("job_a"));
        store.unlock(&frame, &Key::new("job_b"));
        assert_eq!(store.readers(&frame), 0);
        assert!(store.delete_frame(&frame).is_ok());
    }

    #[test]
    fn replacing_a_frame_releases_unshared_columns() {
        let store = MemStore::new();
        let first = numeric_frame("train");
        let shared = Arc::clone(&first.columns()[0]);
        store.put_frame(first).unwrap();

        let mut second = Frame::new("train");
        second.add("x", Arc::clone(&shared)).unwrap();
        second
            .add("z", Arc::new(Column::numeric(vec![4.0, 5.0, 6.0])))
            .unwrap();
        store.put_frame(second).unwrap();
        assert_eq!(store.live_columns(), 2);
        assert!(store.is_live(shared.key()));

        store.put_frame(numeric_frame("train")).unwrap();
        assert_eq!(store.live_columns(), 1);
        assert!(!store.is_live(shared.key()));

        store.delete_frame(&Key::new("train")).unwrap();
        assert_eq!(store.live_columns(), 0);
    }

    #[test]
    fn delete_never_races_a_read_lock() {
        let store = MemStore::new();
        store.put_frame(numeric_frame("train")).unwrap();
        let frame = Key::new("train");

        std::thread::scope(|s| {
            for i in 0..4 {
                let (store, frame) = (&store, &frame);
                s.spawn(move || {
                    let job = Key::new(format!("job_{i}"));
                    for _ in 0..200 {
                        if store.read_lock(frame, &job).is_ok() {
                            assert!(store.get_frame(frame).is_some());
                            store.unlock(frame, &job);
                        }
                    }
                });
            }
            while store.delete_frame(&frame).is_err() {
                std::thread::yield_now();
            }
        });

        assert!(store.get_frame(&frame).is_none());
        assert_eq!(store.readers(&frame), 0);
        assert_eq!(store.live_columns(), 0);
    }

    #[test]
    fn lock_unknown_frame_fails() {
        let store = MemStore::new();
        let err = store
            .read_lock(&Key::new("missing"), &Key::new("job"))
            .unwrap_err();
        assert!(matches!(err, ScoreError::UnknownFrame(_)));
    }
}
