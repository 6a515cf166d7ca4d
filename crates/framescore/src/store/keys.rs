//! Identifiers for stored objects.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);
static NEXT_COLUMN: AtomicU64 = AtomicU64::new(1);

/// Name of a frame, model, job or metrics object.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Key with an explicit name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Fresh key, unique within the process: `{prefix}_{n}`.
    pub fn make(prefix: &str) -> Self {
        let n = NEXT_KEY.fetch_add(1, Ordering::Relaxed);
        Self(format!("{prefix}_{n}"))
    }

    /// Key of the metrics produced by scoring `frame` with `model`.
    ///
    /// Deterministic, so scoring the same frame twice targets the same object.
    pub fn metrics_for(model: &Key, frame: &Key) -> Self {
        Self(format!("modelmetrics_{model}@{frame}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&Key> for Key {
    fn from(value: &Key) -> Self {
        value.clone()
    }
}

/// Identity of one materialized column.
///
/// Every [`Column`](crate::frame::Column) gets a fresh key on construction,
/// so two frames alias the same data exactly when they hold the same key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ColumnKey(u64);

impl ColumnKey {
    pub(crate) fn next() -> Self {
        Self(NEXT_COLUMN.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}
