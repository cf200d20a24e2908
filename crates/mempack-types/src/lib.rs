//! Foundation types for mempack.
//!
//! Every other mempack crate depends on `mempack-types`. The types here are
//! plain values with no storage or hashing logic attached.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (SHA-1 or SHA-256 digest)
//! - [`HashAlgorithm`] -- Digest family a store or pack is fixed to
//! - [`ObjectType`] -- Closed set of object types (commit, tree, blob, tag)

pub mod error;
pub mod kind;
pub mod object;

pub use error::TypeError;
pub use kind::ObjectType;
pub use object::{HashAlgorithm, ObjectId, MAX_RAW_LEN};
