//! Archive store
//!
//! The archive is an append-only, position-indexed copy of the state table
//! kept in a flat file, one JSON record per line.

pub mod atomic;
pub mod jsonl;

pub use jsonl::JsonlArchive;
