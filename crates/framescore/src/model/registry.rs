//! Append-only registries.

use std::sync::{PoisonError, RwLock};

/// Growable list that only ever appends.
///
/// The owning job is the only writer; readers take cheap snapshots. Used for
/// a model's metric keys and warnings, the mutable tail of an otherwise
/// immutable output.
#[derive(Debug, Default)]
pub struct AppendLog<T> {
    items: RwLock<Vec<T>>,
}

impl<T: Clone> AppendLog<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }

    pub fn push(&self, item: T) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + PartialEq> AppendLog<T> {
    /// Append unless an equal item is already present. Returns whether the
    /// item was added.
    pub fn push_unique(&self, item: T) -> bool {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        if items.contains(&item) {
            return false;
        }
        items.push(item);
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(item)
    }
}
