//! Application layer: the order and wallet ledgers.
//!
//! Both ledgers own their read-modify-write cycles. Work on one account or
//! one order is serialized through [`locks::KeyedLocks`]; the stores add a
//! version compare-and-swap so nothing commits over a concurrent writer.

pub mod locks;
pub mod orders;
pub mod wallet;
