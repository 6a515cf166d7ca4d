//! Named, ordered collections of columns.

use std::ops::Range;
use std::sync::Arc;

use super::column::Column;
use super::domain::Domain;
use crate::error::{Result, ScoreError};
use crate::store::{ColumnKey, Key};
use crate::utils::Fingerprint;

/// A named, ordered collection of equally long columns.
///
/// Cloning a frame is shallow: the clone holds the same `Arc<Column>`s, so
/// rebinding columns on a clone (with [`Frame::replace`], [`Frame::add`] or
/// [`Frame::restructure`]) never touches the original.
#[derive(Debug, Clone)]
pub struct Frame {
    key: Key,
    names: Vec<String>,
    columns: Vec<Arc<Column>>,
}

impl Frame {
    /// Create an empty frame.
    pub fn new(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            names: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Create a frame from named columns.
    ///
    /// # Errors
    ///
    /// Fails on duplicate names or columns of different lengths.
    pub fn from_columns(key: impl Into<Key>, columns: Vec<(String, Column)>) -> Result<Self> {
        let mut frame = Self::new(key);
        for (name, column) in columns {
            frame.add(name, Arc::new(column))?;
        }
        Ok(frame)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Rename the frame. Columns are shared with any previous clone.
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = key.into();
        self
    }

    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows (0 for a frame without columns).
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }

    #[inline]
    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    /// Index of a column by name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&Arc<Column>> {
        self.find(name).map(|i| &self.columns[i])
    }

    #[inline]
    pub fn column_at(&self, idx: usize) -> Option<&Arc<Column>> {
        self.columns.get(idx)
    }

    /// Per-column domains, `None` for numeric columns.
    pub fn domains(&self) -> Vec<Option<Domain>> {
        self.columns.iter().map(|c| c.domain().cloned()).collect()
    }

    /// Last column, which holds the response in a training layout.
    pub fn last(&self) -> Option<(&str, &Arc<Column>)> {
        let name = self.names.last()?;
        let column = self.columns.last()?;
        Some((name.as_str(), column))
    }

    /// Whether this frame holds the column with the given identity.
    pub fn contains_column(&self, key: ColumnKey) -> bool {
        self.columns.iter().any(|c| c.key() == key)
    }

    /// Contiguous row ranges of at most `chunk_rows` rows covering the frame.
    pub fn chunk_ranges(&self, chunk_rows: usize) -> Vec<Range<usize>> {
        let n_rows = self.n_rows();
        let step = chunk_rows.max(1);
        (0..n_rows)
            .step_by(step)
            .map(|start| start..(start + step).min(n_rows))
            .collect()
    }

    /// Content fingerprint over column names, values and domains.
    pub fn checksum(&self) -> u64 {
        let mut fp = Fingerprint::new();
        fp.write_u64(self.columns.len() as u64);
        for (name, column) in self.names.iter().zip(&self.columns) {
            fp.write_str(name);
            fp.write_u64(column.checksum());
        }
        fp.finish()
    }

    // =========================================================================
    // Structural changes
    // =========================================================================

    /// Append a column.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken or the length differs from existing columns.
    pub fn add(&mut self, name: impl Into<String>, column: Arc<Column>) -> Result<()> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(ScoreError::DuplicateColumn(name));
        }
        self.check_rows(&name, &column)?;
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Remove a column by name, returning it.
    pub fn remove(&mut self, name: &str) -> Option<Arc<Column>> {
        let idx = self.find(name)?;
        self.names.remove(idx);
        Some(self.columns.remove(idx))
    }

    /// Rebind the column at `idx`, returning the previous one.
    ///
    /// # Errors
    ///
    /// Fails if the length differs from the other columns.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    pub fn replace(&mut self, idx: usize, column: Arc<Column>) -> Result<Arc<Column>> {
        let name = self.names[idx].clone();
        if self.columns.len() > 1 && self.n_rows() != column.len() {
            return Err(ScoreError::InconsistentRows {
                column: name,
                expected: self.n_rows(),
                got: column.len(),
            });
        }
        Ok(std::mem::replace(&mut self.columns[idx], column))
    }

    /// Replace the whole column list.
    ///
    /// # Errors
    ///
    /// Fails on duplicate names or inconsistent lengths; the frame is left
    /// unchanged in that case.
    pub fn restructure(&mut self, names: Vec<String>, columns: Vec<Arc<Column>>) -> Result<()> {
        let mut rebuilt = Self::new(self.key.clone());
        for (name, column) in names.into_iter().zip(columns) {
            rebuilt.add(name, column)?;
        }
        *self = rebuilt;
        Ok(())
    }

    fn check_rows(&self, name: &str, column: &Column) -> Result<()> {
        if let Some(first) = self.columns.first() {
            if first.len() != column.len() {
                return Err(ScoreError::InconsistentRows {
                    column: name.to_string(),
                    expected: first.len(),
                    got: column.len(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::from_columns(
            "sample",
            vec![
                ("a".into(), Column::numeric(vec![1.0, 2.0, 3.0, 4.0, 5.0])),
                (
                    "b".into(),
                    Column::from_levels(&[Some("x"), Some("y"), None, Some("x"), Some("y")]),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn lookup_by_name() {
        let frame = sample();
        assert_eq!(frame.find("b"), Some(1));
        assert!(frame.column("c").is_none());
        assert_eq!(frame.n_rows(), 5);
        assert_eq!(frame.last().map(|(n, _)| n), Some("b"));
        assert!(frame.domains()[0].is_none());
        assert!(frame.domains()[1].is_some());
    }

    #[test]
    fn rejects_duplicates_and_bad_lengths() {
        let mut frame = sample();
        let err = frame.add("a", Arc::new(Column::numeric(vec![0.0; 5]))).unwrap_err();
        assert!(matches!(err, ScoreError::DuplicateColumn(_)));
        let err = frame.add("c", Arc::new(Column::numeric(vec![0.0; 2]))).unwrap_err();
        assert!(matches!(err, ScoreError::InconsistentRows { expected: 5, got: 2, .. }));
    }

    #[test]
    fn chunk_ranges_cover_all_rows() {
        let frame = sample();
        assert_eq!(frame.chunk_ranges(2), vec![0..2, 2..4, 4..5]);
        assert_eq!(frame.chunk_ranges(10), vec![0..5]);
        assert!(Frame::new("empty").chunk_ranges(4).is_empty());
    }

    #[test]
    fn clones_share_columns_until_rebound() {
        let original = sample();
        let mut copy = original.clone();
        let a_key = original.columns()[0].key();
        assert!(copy.contains_column(a_key));

        copy.replace(0, Arc::new(Column::numeric(vec![0.0; 5]))).unwrap();
        assert!(!copy.contains_column(a_key));
        assert!(original.contains_column(a_key));
    }

    #[test]
    fn restructure_reorders_and_drops() {
        let mut frame = sample();
        let b = Arc::clone(frame.column("b").unwrap());
        frame.restructure(vec!["b".into()], vec![b]).unwrap();
        assert_eq!(frame.names(), ["b"]);
        assert_eq!(frame.n_cols(), 1);
    }

    #[test]
    fn checksum_depends_on_content() {
        let a = sample();
        let b = sample();
        assert_eq!(a.checksum(), b.checksum());

        let mut c = sample();
        c.remove("b");
        assert_ne!(a.checksum(), c.checksum());
    }
}
