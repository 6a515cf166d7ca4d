//! Categorical domains.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::utils::Fingerprint;

/// Ordered list of levels that a categorical column's codes index into.
///
/// Cloning is cheap and shares the level storage, which lets callers test
/// for reference identity with [`Domain::ptr_eq`]. Equality (`==`) checks
/// reference identity first and falls back to deep comparison.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Domain(Arc<[String]>);

impl Domain {
    pub fn new<S: Into<String>>(levels: impl IntoIterator<Item = S>) -> Self {
        levels.into_iter().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn levels(&self) -> &[String] {
        &self.0
    }

    #[inline]
    pub fn get(&self, code: usize) -> Option<&str> {
        self.0.get(code).map(String::as_str)
    }

    /// Position of a level, by linear scan.
    pub fn index_of(&self, level: &str) -> Option<usize> {
        self.0.iter().position(|l| l == level)
    }

    /// Level → code lookup table.
    pub fn index(&self) -> HashMap<&str, usize> {
        self.0
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect()
    }

    /// Whether both domains share the same storage.
    #[inline]
    pub fn ptr_eq(&self, other: &Domain) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Whether `self` starts with every level of `prefix`, in order.
    pub fn starts_with(&self, prefix: &Domain) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub(crate) fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_u64(self.0.len() as u64);
        for level in self.0.iter() {
            fp.write_str(level);
        }
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl Eq for Domain {}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<S: Into<String>> FromIterator<S> for Domain {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let levels: Vec<String> = iter.into_iter().map(Into::into).collect();
        Self(levels.into())
    }
}

impl From<Vec<String>> for Domain {
    fn from(levels: Vec<String>) -> Self {
        Self(levels.into())
    }
}

impl From<Domain> for Vec<String> {
    fn from(domain: Domain) -> Self {
        domain.0.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_by_reference_or_content() {
        let a = Domain::new(["red", "green"]);
        let b = a.clone();
        let c = Domain::new(["red", "green"]);
        let d = Domain::new(["green", "red"]);

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn lookup_and_prefix() {
        let train = Domain::new(["a", "b"]);
        let union = Domain::new(["a", "b", "z"]);
        assert_eq!(union.index_of("z"), Some(2));
        assert_eq!(union.get(5), None);
        assert!(union.starts_with(&train));
        assert!(!train.starts_with(&union));
        assert_eq!(union.index().get("b"), Some(&1));
    }

    #[test]
    fn serializes_as_plain_list() {
        let domain = Domain::new(["yes", "no"]);
        let json = serde_json::to_string(&domain).unwrap();
        assert_eq!(json, r#"["yes","no"]"#);
        let back: Domain = serde_json::from_str(&json).unwrap();
        assert_eq!(back, domain);
    }
}
