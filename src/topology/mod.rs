//! Identity and ownership of distributed mesh entities.
//!
//! Every node and edge carries a [`GlobalId`] that is the same on all
//! partitions, and an [`Ownership`] entry naming the rank that owns it.
//! Entities owned elsewhere are ghosts whose values arrive by halo exchange.

pub mod global_id;
pub mod ownership;

pub use global_id::GlobalId;
pub use ownership::{Ownership, OwnershipEntry};
