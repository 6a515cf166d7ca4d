//! Immutable columns.

use ndarray::{Array1, ArrayView1};

use super::domain::Domain;
use crate::store::ColumnKey;
use crate::utils::Fingerprint;

/// One materialized column.
///
/// # Storage
///
/// Values are `f64` regardless of type. Numeric columns hold the value itself,
/// categorical columns hold the level code as a float, indexing into the
/// column's [`Domain`]. Missing values are `f64::NAN` in both cases.
///
/// Columns are never mutated after construction. Every constructor assigns a
/// fresh [`ColumnKey`], so a column is not `Clone`: share it through `Arc`.
#[derive(Debug)]
pub struct Column {
    key: ColumnKey,
    values: Array1<f64>,
    domain: Option<Domain>,
    checksum: u64,
}

impl Column {
    fn build(values: Array1<f64>, domain: Option<Domain>) -> Self {
        let mut fp = Fingerprint::new();
        fp.write_u64(values.len() as u64);
        for v in values.iter() {
            // All NaNs hash alike.
            let bits = if v.is_nan() { f64::NAN.to_bits() } else { v.to_bits() };
            fp.write_u64(bits);
        }
        match &domain {
            Some(d) => d.fingerprint(&mut fp),
            None => fp.write_u64(u64::MAX),
        }
        Self {
            key: ColumnKey::next(),
            values,
            domain,
            checksum: fp.finish(),
        }
    }

    /// Numeric column.
    pub fn numeric(values: impl Into<Array1<f64>>) -> Self {
        Self::build(values.into(), None)
    }

    /// Categorical column from level codes.
    ///
    /// Codes outside `0..domain.len()` are stored as missing.
    pub fn categorical(codes: impl Into<Array1<f64>>, domain: Domain) -> Self {
        let n_levels = domain.len() as f64;
        let codes = codes
            .into()
            .mapv_into(|c| if c >= 0.0 && c < n_levels && c.fract() == 0.0 { c } else { f64::NAN });
        Self::build(codes, Some(domain))
    }

    /// Categorical column from raw level strings. The domain is the sorted
    /// set of distinct levels, and `None` is missing.
    pub fn from_levels(levels: &[Option<&str>]) -> Self {
        let mut distinct: Vec<&str> = levels.iter().flatten().copied().collect();
        distinct.sort_unstable();
        distinct.dedup();
        let domain = Domain::new(distinct.iter().copied());
        let index = domain.index();
        let codes: Array1<f64> = levels
            .iter()
            .map(|l| match l.and_then(|l| index.get(l)) {
                Some(&code) => code as f64,
                None => f64::NAN,
            })
            .collect();
        Self::build(codes, Some(domain))
    }

    /// Column repeating one value, optionally tagged with a domain.
    pub fn constant(value: f64, n_rows: usize, domain: Option<Domain>) -> Self {
        Self::build(Array1::from_elem(n_rows, value), domain)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn key(&self) -> ColumnKey {
        self.key
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    #[inline]
    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    #[inline]
    pub fn is_categorical(&self) -> bool {
        self.domain.is_some()
    }

    /// Value at `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    #[inline]
    pub fn at(&self, row: usize) -> f64 {
        self.values[row]
    }

    /// Level at `row`, for categorical columns. `None` when missing.
    pub fn level_at(&self, row: usize) -> Option<&str> {
        let code = self.values[row];
        if code.is_nan() {
            return None;
        }
        self.domain.as_ref()?.get(code as usize)
    }

    /// Content fingerprint over values and domain.
    #[inline]
    pub fn checksum(&self) -> u64 {
        self.checksum
    }
}
