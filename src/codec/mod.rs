//! Translators between the flattened parameter set and the two on-disk
//! formats.
//!
//! Both codecs operate on the store's flattened `(path, Variable)` entries in
//! traversal order. The [`container`] format keys one dataset per parameter
//! by its full path and carries an explicit write-order index; the [`proto`]
//! format is a flat sequence of records with a stable protobuf wire encoding.

pub mod container;
pub mod proto;
