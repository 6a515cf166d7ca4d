//! Columnar frames.
//!
//! A [`Frame`] is a named, ordered collection of immutable [`Column`]s. Values
//! are stored column-major as `f64`; categorical columns store level codes
//! that index into a shared [`Domain`].
//!
//! # Key Types
//!
//! - [`Frame`]: Named column collection with structural operations
//! - [`Column`]: One immutable column with a unique identity
//! - [`Domain`]: Ordered categorical levels

mod column;
mod domain;
mod table;

pub use column::Column;
pub use domain::Domain;
pub use table::Frame;
