//! Freshness detection: content-hash (blake3) for sources, mtime for copies.

mod hash;
pub mod mtime;

pub use hash::{ContentHash, compute_bytes_hash};
pub use mtime::is_newer_than;
