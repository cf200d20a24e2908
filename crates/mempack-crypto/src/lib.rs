//! Digest computation for mempack.
//!
//! Object ids are computed the same way every git-compatible object database
//! computes them: the canonical `"<type> <size>\0"` header followed by the
//! payload, hashed with SHA-1 or SHA-256. Ids produced here are therefore
//! interchangeable with ids from any other compliant store.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;

pub use hasher::{ObjectHasher, StreamHasher};
