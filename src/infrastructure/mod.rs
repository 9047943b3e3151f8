//! Port implementations: in-memory stores and fakes, event sinks, and the
//! optional RocksDB store.

pub mod events;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
