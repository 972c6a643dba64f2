//! # mycel-storage
//!
//! Storage layer for the Mycel chain.
//!
//! This crate provides:
//! - [`KvStore`] - the key-value abstraction every keeper and the upgrade
//!   store write through
//! - [`Database`] - RocksDB backend with column families
//! - [`MemoryDb`] - in-memory backend with identical semantics
//! - [`CacheStore`] - a write-buffering branch committed as one atomic batch
//! - [`namespace`] - per-module key namespaces and the structural operations
//!   applied at upgrade boundaries

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cache;
mod db;
mod error;
mod memory;
pub mod namespace;
mod traits;

pub use cache::CacheStore;
pub use db::{cf, Database, DbConfig, ALL_CFS};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryDb;
pub use namespace::ModuleStore;
pub use traits::{BatchOp, KvPairs, KvStore, WriteBatch};
