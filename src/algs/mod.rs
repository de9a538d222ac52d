//! Communication and distributed-mesh algorithms.

pub mod collective;
pub mod communicator;
pub mod halo_exchange;
pub mod load_balance;
pub mod meshgen;

pub use collective::{all_gather, all_reduce_max, all_reduce_min, all_reduce_sum};
pub use halo_exchange::{ExchangeStats, HaloExchange};
pub use load_balance::LoadBalanceReport;
