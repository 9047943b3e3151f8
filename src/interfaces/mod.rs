//! Batch interfaces driving the wallet ledger from files.

pub mod csv;
