//! Domain model: accounts, orders, wallet entries, and the ports the
//! application layer talks to.

pub mod account;
pub mod events;
pub mod ids;
pub mod money;
pub mod order;
pub mod ports;
pub mod transaction;
